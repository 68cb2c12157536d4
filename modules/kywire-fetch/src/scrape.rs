//! HTML-scrape fallback for sources without a working feed.
//!
//! Each scrape-mode source names a `scraper_id` that selects a selector
//! rule: container, title, link, and optional summary/image selectors.
//! Facebook pages run through the same machinery with their own rule and
//! no relevance gating downstream.

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use crate::error::FetchError;
use crate::feed::{strip_tags, RawFeedItem};

/// Selector rule for one scraped site layout.
#[derive(Debug, Clone)]
pub struct ScrapeRule {
    pub container: &'static str,
    pub title: &'static str,
    pub link: &'static str,
    pub summary: Option<&'static str>,
    pub image: Option<&'static str>,
}

/// Built-in rules keyed by `scraper_id`.
const SCRAPE_RULES: &[(&str, ScrapeRule)] = &[
    (
        "generic-article-list",
        ScrapeRule {
            container: "article",
            title: "h1 a, h2 a, h3 a",
            link: "h1 a, h2 a, h3 a",
            summary: Some("p"),
            image: Some("img"),
        },
    ),
    (
        "headline-list",
        ScrapeRule {
            container: "ul.headlines li, div.headline-list .headline",
            title: "a",
            link: "a",
            summary: None,
            image: None,
        },
    ),
    (
        "card-grid",
        ScrapeRule {
            container: "div.card, li.card",
            title: ".card-title a, .card-title",
            link: "a",
            summary: Some(".card-summary, .card-body p"),
            image: Some("img"),
        },
    ),
    (
        "facebook-page",
        ScrapeRule {
            container: "div[role='article']",
            title: "div[data-ad-preview='message'], div[dir='auto']",
            link: "a[href*='/posts/'], a[href*='story_fbid']",
            summary: None,
            image: None,
        },
    ),
];

/// Look up a scrape rule; unknown ids fall back to the generic list rule.
pub fn rule_for(scraper_id: Option<&str>) -> &'static ScrapeRule {
    let id = scraper_id.unwrap_or("generic-article-list");
    SCRAPE_RULES
        .iter()
        .find(|(key, _)| *key == id)
        .or_else(|| {
            warn!(scraper_id = id, "Unknown scraper id, using generic rule");
            SCRAPE_RULES.first()
        })
        .map(|(_, rule)| rule)
        .expect("scrape rule table is non-empty")
}

/// Scrape a listing page into feed-item records. Relative links resolve
/// against `base_url`; entries without a title and link are dropped.
pub fn parse_scraped(
    html: &str,
    rule: &ScrapeRule,
    base_url: &str,
) -> Result<Vec<RawFeedItem>, FetchError> {
    let base = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
    let document = Html::parse_document(html);

    let container = parse_selector(rule.container)?;
    let title_sel = parse_selector(rule.title)?;
    let link_sel = parse_selector(rule.link)?;
    let summary_sel = rule.summary.map(parse_selector).transpose()?;
    let image_sel = rule.image.map(parse_selector).transpose()?;

    let mut items = Vec::new();
    for element in document.select(&container) {
        let title = element
            .select(&title_sel)
            .next()
            .map(|t| strip_tags(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let link = element
            .select(&link_sel)
            .next()
            .and_then(|l| l.value().attr("href"))
            .and_then(|href| base.join(href.trim()).ok())
            .map(|u| u.to_string());

        let (Some(title), Some(link)) = (title, link) else {
            continue;
        };

        let summary = summary_sel.as_ref().and_then(|sel| {
            element
                .select(sel)
                .next()
                .map(|s| strip_tags(&s.text().collect::<String>()))
                .filter(|s| !s.is_empty())
        });

        let image_url = image_sel.as_ref().and_then(|sel| {
            element
                .select(sel)
                .next()
                .and_then(|img| img.value().attr("src"))
                .and_then(|src| base.join(src).ok())
                .map(|u| u.to_string())
        });

        items.push(RawFeedItem {
            title,
            link,
            guid: None,
            published_at: None,
            author: None,
            summary,
            content: None,
            image_url,
        });
    }

    Ok(items)
}

fn parse_selector(raw: &str) -> Result<Selector, FetchError> {
    Selector::parse(raw).map_err(|e| FetchError::Parse(format!("bad selector {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
    <html><body>
      <article>
        <h2><a href="/news/story-one">County approves budget</a></h2>
        <p>The fiscal court passed the budget on second reading.</p>
        <img src="/img/budget.jpg">
      </article>
      <article>
        <h2><a href="https://other.example.com/story-two">Bridge reopens</a></h2>
        <p>Traffic resumed Friday.</p>
      </article>
      <article>
        <h2>No link here</h2>
      </article>
    </body></html>"#;

    #[test]
    fn scrapes_listing_with_generic_rule() {
        let rule = rule_for(Some("generic-article-list"));
        let items = parse_scraped(LISTING, rule, "https://paper.example.com").unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "County approves budget");
        assert_eq!(items[0].link, "https://paper.example.com/news/story-one");
        assert_eq!(
            items[0].summary.as_deref(),
            Some("The fiscal court passed the budget on second reading.")
        );
        assert_eq!(
            items[0].image_url.as_deref(),
            Some("https://paper.example.com/img/budget.jpg")
        );

        assert_eq!(items[1].link, "https://other.example.com/story-two");
    }

    #[test]
    fn unknown_scraper_id_falls_back_to_generic() {
        let rule = rule_for(Some("does-not-exist"));
        assert_eq!(rule.container, "article");
    }

    #[test]
    fn missing_scraper_id_uses_generic() {
        let rule = rule_for(None);
        assert_eq!(rule.container, "article");
    }

    #[test]
    fn bad_base_url_errors() {
        let rule = rule_for(None);
        assert!(matches!(
            parse_scraped(LISTING, rule, "not a base"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn empty_page_scrapes_to_nothing() {
        let rule = rule_for(None);
        let items = parse_scraped("<html><body></body></html>", rule, "https://x.example.com").unwrap();
        assert!(items.is_empty());
    }
}
