//! Pluggable article summarization.
//!
//! The pipeline depends on the `Summarizer` trait; the concrete backend
//! is Cloudflare Workers AI. `NoopSummarizer` stands in when credentials
//! are absent and in tests.

pub mod cloudflare;
pub mod traits;

pub use cloudflare::CloudflareAi;
pub use traits::{ArticleSummary, NoopSummarizer, Summarizer};
