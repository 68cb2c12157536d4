//! Outbound HTTP: conditional feed fetching, article retrieval, feed and
//! scrape parsing, readable-body extraction, and ICS calendars.

pub mod article;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod ics;
pub mod scrape;

pub use error::FetchError;
pub use feed::{parse_feed, RawFeedItem};
pub use fetcher::{Accept, FetchOptions, FetchResponse, HttpFetcher};
