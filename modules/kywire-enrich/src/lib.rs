//! Content enrichment: everything that turns a raw article into a
//! classified one. All functions here are pure; the store round-trips
//! (dedup window scan, bill FK checks) live with the callers.

pub mod bills;
pub mod breaking;
pub mod gazetteer;
pub mod location;
pub mod minhash;
pub mod paywall;

pub use bills::extract_bill_numbers;
pub use breaking::{classify_breaking, BreakingClassification};
pub use location::{tag_locations, LocationInput};
pub use minhash::{decode_signature, encode_signature, jaccard_estimate, minhash_signature};
pub use paywall::{score_paywall, PaywallSignal, PaywallVerdict};
