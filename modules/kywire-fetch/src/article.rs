//! Readable-body extraction from article HTML.

use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};

/// Extracted readable text plus its word count.
#[derive(Debug, Clone)]
pub struct ArticleBody {
    pub text: String,
    pub word_count: usize,
}

/// Run Readability-style main-content extraction over raw article HTML.
pub fn extract_article_body(html: &str, article_url: &str) -> ArticleBody {
    let parsed_url = url::Url::parse(article_url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    let text = transform_content_input(input, &config);
    let text = text.trim().to_string();
    let word_count = count_words(&text);
    ArticleBody { text, word_count }
}

/// Whitespace-separated word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
