//! RSS/Atom parsing into normalized item records.

use chrono::{DateTime, Utc};

use crate::error::FetchError;

/// A feed entry normalized across RSS 2.0, Atom, and scrape sources.
#[derive(Debug, Clone, Default)]
pub struct RawFeedItem {
    pub title: String,
    pub link: String,
    pub guid: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    /// Entity-decoded, tag-stripped summary text.
    pub summary: Option<String>,
    /// Full content block when the feed carries one.
    pub content: Option<String>,
    pub image_url: Option<String>,
}

/// Parse raw feed XML into normalized items, document order preserved.
/// Entries without a resolvable link are dropped.
pub fn parse_feed(raw_xml: &str) -> Result<Vec<RawFeedItem>, FetchError> {
    let feed = feed_rs::parser::parse(raw_xml.as_bytes())
        .map_err(|e| FetchError::Parse(format!("feed parse failed: {e}")))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));

            let summary = entry
                .summary
                .map(|t| strip_tags(&t.content))
                .filter(|s| !s.is_empty());

            let content = entry
                .content
                .and_then(|c| c.body)
                .filter(|b| !b.is_empty());

            let image_url = entry
                .media
                .iter()
                .flat_map(|m| m.content.iter())
                .find_map(|c| c.url.as_ref().map(|u| u.to_string()));

            let author = entry
                .authors
                .first()
                .map(|a| a.name.clone())
                .filter(|n| !n.is_empty());

            Some(RawFeedItem {
                title: entry
                    .title
                    .map(|t| strip_tags(&t.content))
                    .unwrap_or_default(),
                link,
                guid: (!entry.id.is_empty()).then_some(entry.id),
                published_at,
                author,
                summary,
                content,
                image_url,
            })
        })
        .collect();

    Ok(items)
}

/// Drop HTML tags, decode the common entities, and collapse whitespace.
/// Feeds that embed HTML in descriptions leave a layer of entities after
/// the XML decode.
pub(crate) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#8217;", "\u{2019}");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example KY News</title>
    <item>
      <title>House passes HB 200</title>
      <link>https://example.com/hb200</link>
      <guid>hb200-guid</guid>
      <pubDate>Mon, 02 Jun 2025 14:30:00 GMT</pubDate>
      <description>&lt;p&gt;The measure &amp;amp; its amendments advanced.&lt;/p&gt;</description>
    </item>
    <item>
      <title>No link entry</title>
      <description>This entry has no usable link.</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <id>urn:example:feed</id>
  <updated>2025-06-02T10:00:00Z</updated>
  <entry>
    <title>School board meets</title>
    <id>urn:example:entry-1</id>
    <link href="https://example.com/board"/>
    <updated>2025-06-02T10:00:00Z</updated>
    <summary>Agenda posted.</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_and_drops_linkless_entries() {
        let items = parse_feed(RSS_SAMPLE).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.title, "House passes HB 200");
        assert_eq!(item.link, "https://example.com/hb200");
        assert_eq!(item.guid.as_deref(), Some("hb200-guid"));
        assert!(item.published_at.is_some());
    }

    #[test]
    fn summary_is_tag_stripped_and_decoded() {
        let items = parse_feed(RSS_SAMPLE).unwrap();
        assert_eq!(
            items[0].summary.as_deref(),
            Some("The measure & its amendments advanced.")
        );
    }

    #[test]
    fn parses_atom() {
        let items = parse_feed(ATOM_SAMPLE).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "School board meets");
        assert_eq!(items[0].link, "https://example.com/board");
        assert!(items[0].published_at.is_some(), "updated fills in for published");
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        assert!(matches!(
            parse_feed("this is not xml at all"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn strip_tags_collapses_whitespace() {
        assert_eq!(strip_tags("<p>Hello  <b>world</b></p>\n  <br/>again"), "Hello world again");
    }
}
