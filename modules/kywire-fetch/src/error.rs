use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("upstream HTTP error ({status}): {snippet}")]
    UpstreamHttp { status: u16, snippet: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}
