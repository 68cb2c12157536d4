/// How much article body goes into a prompt. Workers AI context windows
/// are small; the lede carries the story.
const BODY_PROMPT_CHARS: usize = 6000;

pub(crate) fn summary_prompt(title: &str, body: &str) -> String {
    let body: String = body.chars().take(BODY_PROMPT_CHARS).collect();
    format!(
        "Summarize this Kentucky news article in two to three plain sentences. \
         State only what the article reports. No preamble, no opinions.\n\n\
         Title: {title}\n\nArticle:\n{body}"
    )
}

pub(crate) fn meta_description_prompt(title: &str, body: &str) -> String {
    let body: String = body.chars().take(BODY_PROMPT_CHARS).collect();
    format!(
        "Write one sentence of at most 155 characters describing this news \
         article for a search result. No quotes, no preamble.\n\n\
         Title: {title}\n\nArticle:\n{body}"
    )
}
