pub mod config;
pub mod hash;
pub mod types;
pub mod urlnorm;

pub use config::Config;
pub use hash::{content_fingerprint, fnv1a64, stable_item_id};
pub use types::{
    AlertLevel, CountyTag, FetchMode, QueueStatus, RegionScope, RunStatus, Sentiment,
};
pub use urlnorm::canonicalize_url;
