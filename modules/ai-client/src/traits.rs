use anyhow::Result;
use async_trait::async_trait;

/// Output of a summarization pass over one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSummary {
    /// Two-to-three sentence reader-facing summary.
    pub summary: String,
    /// Single-sentence meta description for page heads.
    pub meta_description: String,
}

/// Seam between the enrichment worker and the AI backend.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize an article. `body` is the extracted readable text,
    /// already trimmed to a model-friendly length by the caller.
    async fn summarize(&self, title: &str, body: &str) -> Result<ArticleSummary>;

    /// False when the backend has no credentials; callers skip the call
    /// and mark the queue row done with the feed-provided summary.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Summarizer that does nothing. Used when Cloudflare credentials are
/// absent and as a test stand-in.
pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    async fn summarize(&self, _title: &str, _body: &str) -> Result<ArticleSummary> {
        anyhow::bail!("summarizer is not configured")
    }

    fn is_configured(&self) -> bool {
        false
    }
}
