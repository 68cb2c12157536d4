//! Weekly RSS discovery: scrape-mode feeds get their homepage probed for
//! `<link rel="alternate">` feed advertisements; a candidate that parses
//! as a non-empty feed promotes the source to RSS mode.

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

use kywire_common::FetchMode;
use kywire_fetch::fetcher::FEED_TIMEOUT;
use kywire_fetch::{parse_feed, Accept, FetchOptions, HttpFetcher};
use kywire_store::Store;

fn link_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<link[^>]+type\s*=\s*["']application/(rss\+xml|atom\+xml)["'][^>]*>"#)
            .expect("RSS link regex compiles")
    })
}

fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("href regex compiles"))
}

/// Probe every enabled scrape feed once. Returns how many were promoted.
pub async fn discover_rss_feeds(store: &Store, fetcher: &HttpFetcher) -> Result<usize> {
    let scrape_feeds = store.feeds_in_mode(FetchMode::Scrape).await?;
    info!(feeds = scrape_feeds.len(), "RSS discovery starting");

    let mut promoted = 0;
    for feed in &scrape_feeds {
        let options = FetchOptions {
            accept: Some(Accept::Html),
            timeout: Some(FEED_TIMEOUT),
            ..Default::default()
        };
        let html = match fetcher.fetch(&feed.url, &options).await {
            Ok(response) => response.body.unwrap_or_default(),
            Err(e) => {
                warn!(feed = %feed.id, error = %e, "Discovery homepage fetch failed");
                continue;
            }
        };

        for candidate in discover_feed_urls(&html, &feed.url) {
            if try_candidate(fetcher, &candidate).await {
                store.promote_feed_to_rss(&feed.id, &candidate).await?;
                info!(feed = %feed.id, url = %candidate, "Feed promoted to RSS");
                promoted += 1;
                break;
            }
        }
    }

    info!(promoted, "RSS discovery complete");
    Ok(promoted)
}

async fn try_candidate(fetcher: &HttpFetcher, candidate: &str) -> bool {
    let options = FetchOptions {
        accept: Some(Accept::Feed),
        timeout: Some(FEED_TIMEOUT),
        ..Default::default()
    };
    match fetcher.fetch(candidate, &options).await {
        Ok(response) => response
            .body
            .as_deref()
            .and_then(|body| parse_feed(body).ok())
            .is_some_and(|items| !items.is_empty()),
        Err(_) => false,
    }
}

/// Find advertised feed URLs in a page's `<link>` tags; relative hrefs
/// resolve against the page URL.
pub(crate) fn discover_feed_urls(html: &str, base_url: &str) -> Vec<String> {
    let mut feeds = Vec::new();
    for cap in link_tag_regex().captures_iter(html) {
        let tag = cap.get(0).map(|m| m.as_str()).unwrap_or("");
        let Some(href_cap) = href_regex().captures(tag) else {
            continue;
        };
        let Some(href) = href_cap.get(1) else { continue };
        let href = href.as_str();

        let full_url = if href.starts_with("http") {
            href.to_string()
        } else if let Ok(base) = url::Url::parse(base_url) {
            match base.join(href) {
                Ok(joined) => joined.to_string(),
                Err(_) => continue,
            }
        } else {
            continue;
        };
        feeds.push(full_url);
    }
    feeds
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOMEPAGE: &str = r#"
    <html><head>
      <link rel="alternate" type="application/rss+xml" title="RSS" href="/feed/">
      <link rel="alternate" type="application/atom+xml" href="https://cdn.example.com/atom.xml">
      <link rel="stylesheet" type="text/css" href="/style.css">
    </head><body></body></html>"#;

    #[test]
    fn finds_rss_and_atom_links() {
        let feeds = discover_feed_urls(HOMEPAGE, "https://paper.example.com/");
        assert_eq!(
            feeds,
            vec![
                "https://paper.example.com/feed/",
                "https://cdn.example.com/atom.xml",
            ]
        );
    }

    #[test]
    fn stylesheet_links_ignored() {
        let feeds = discover_feed_urls(
            r#"<link rel="stylesheet" type="text/css" href="/style.css">"#,
            "https://paper.example.com/",
        );
        assert!(feeds.is_empty());
    }

    #[test]
    fn page_without_links_yields_nothing() {
        assert!(discover_feed_urls("<html></html>", "https://x.example.com").is_empty());
    }
}
