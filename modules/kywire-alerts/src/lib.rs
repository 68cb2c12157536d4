//! Operational alerting: coverage gaps, failing feeds, breaking news.
//!
//! Every alert type shares the same shape: build a deterministic key,
//! check the ledger cooldown, insert the ledger row, deliver over every
//! configured channel best-effort in parallel.

pub mod channels;
pub mod detector;

pub use channels::{channels_from_config, AlertChannel, AlertMessage};
pub use detector::Alerter;
