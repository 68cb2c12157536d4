use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, IF_MODIFIED_SINCE, IF_NONE_MATCH, USER_AGENT};
use tracing::debug;

use crate::error::FetchError;

/// Default per-call deadline for feed fetches.
pub const FEED_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-call deadline for article fetches.
pub const ARTICLE_TIMEOUT: Duration = Duration::from_secs(20);

/// Per-call deadline for ICS calendars.
pub const ICS_TIMEOUT: Duration = Duration::from_secs(10);

/// Body cap for HTML article fetches (~1.5 MB). Feeds are uncapped.
pub const HTML_BODY_CAP: usize = 1_500_000;

const SNIPPET_LEN: usize = 200;

/// What the request declares it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Feed,
    Html,
    Calendar,
}

impl Accept {
    fn header_value(&self) -> &'static str {
        match self {
            Accept::Feed => {
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8"
            }
            Accept::Html => "text/html, application/xhtml+xml, */*;q=0.8",
            Accept::Calendar => "text/calendar, */*",
        }
    }

    /// Articles get the body cap; feeds and calendars read to the end.
    fn body_cap(&self) -> Option<usize> {
        match self {
            Accept::Html => Some(HTML_BODY_CAP),
            Accept::Feed | Accept::Calendar => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// Skip conditional headers, forcing a full response.
    pub force: bool,
    pub accept: Option<Accept>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// `None` on 304.
    pub body: Option<String>,
}

impl FetchResponse {
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

/// Conditional-GET HTTP client. Follows redirects and enforces per-call
/// deadlines. Never retries; callers own retry policy.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("Failed to build HTTP fetcher client");
        Self {
            client,
            user_agent: user_agent.to_string(),
        }
    }

    /// Fetch a URL. 304 yields an empty body; 2xx yields the body and any
    /// new validators; anything else is `UpstreamHttp`.
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let accept = options.accept.unwrap_or(Accept::Feed);
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("kywire/0.1")),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(accept.header_value()));

        if !options.force {
            if let Some(etag) = options.etag.as_deref() {
                if let Ok(value) = HeaderValue::from_str(etag) {
                    headers.insert(IF_NONE_MATCH, value);
                }
            }
            if let Some(last_modified) = options.last_modified.as_deref() {
                if let Ok(value) = HeaderValue::from_str(last_modified) {
                    headers.insert(IF_MODIFIED_SINCE, value);
                }
            }
        }

        debug!(url, "HTTP fetch");

        let response = self
            .client
            .get(parsed)
            .headers(headers)
            .timeout(options.timeout.unwrap_or(FEED_TIMEOUT))
            .send()
            .await?;

        let status = response.status().as_u16();
        let etag = header_string(response.headers(), "etag");
        let last_modified = header_string(response.headers(), "last-modified");

        if status == 304 {
            return Ok(FetchResponse {
                status,
                etag,
                last_modified,
                body: None,
            });
        }

        if !response.status().is_success() {
            let snippet: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(SNIPPET_LEN)
                .collect();
            return Err(FetchError::UpstreamHttp { status, snippet });
        }

        let body = read_body(response, accept.body_cap()).await?;
        Ok(FetchResponse {
            status,
            etag,
            last_modified,
            body: Some(body),
        })
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Streaming read with an optional byte cap. Capped reads stop early
/// instead of failing; a truncated HTML page still scores and classifies.
async fn read_body(
    mut response: reqwest::Response,
    cap: Option<usize>,
) -> Result<String, FetchError> {
    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        buffer.extend_from_slice(&chunk);
        if let Some(max) = cap {
            if buffer.len() >= max {
                buffer.truncate(max);
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_header_values() {
        assert!(Accept::Feed.header_value().contains("application/rss+xml"));
        assert!(Accept::Calendar.header_value().starts_with("text/calendar"));
    }

    #[test]
    fn only_html_is_capped() {
        assert_eq!(Accept::Html.body_cap(), Some(HTML_BODY_CAP));
        assert_eq!(Accept::Feed.body_cap(), None);
        assert_eq!(Accept::Calendar.body_cap(), None);
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let fetcher = HttpFetcher::new("test/1.0");
        let err = fetcher
            .fetch("ftp://example.com/feed", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn rejects_unparseable_urls() {
        let fetcher = HttpFetcher::new("test/1.0");
        let err = fetcher
            .fetch("not a url", &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
