//! Kentucky-relevance gating for stage-1 ingestion.
//!
//! Tiers: a strong signal in the title passes outright; then the
//! feed-provided summary/content; then (caller-driven) the fetched
//! article body. A feed pre-scoped to a county skips the gate entirely.

use kywire_enrich::gazetteer::{CITY_TO_COUNTY, KY_COUNTIES};

/// Outcome of the cheap text tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceTier {
    /// Strong signal found; keep the item.
    Pass,
    /// Feed text was inconclusive; fetch the article body and re-check.
    NeedsBody,
}

/// Check the feed-provided text tiers.
pub fn check_feed_text(title: &str, feed_text: Option<&str>) -> RelevanceTier {
    if has_ky_signal(title) {
        return RelevanceTier::Pass;
    }
    if feed_text.is_some_and(has_ky_signal) {
        return RelevanceTier::Pass;
    }
    RelevanceTier::NeedsBody
}

/// Final tier: the readable article body.
pub fn check_article_body(body: &str) -> bool {
    has_ky_signal(body)
}

/// A strong Kentucky signal: the state name, the `KY` word, an explicit
/// county name, or a known city.
pub fn has_ky_signal(text: &str) -> bool {
    let normalized = normalize(text);
    let padded = format!(" {normalized} ");

    if padded.contains(" kentucky ") || padded.contains(" ky ") {
        return true;
    }

    if KY_COUNTIES.iter().any(|county| {
        let phrase = format!(" {} county ", county.to_lowercase());
        padded.contains(&phrase)
    }) {
        return true;
    }

    CITY_TO_COUNTY
        .iter()
        .any(|(city, _)| padded.contains(&format!(" {city} ")))
}

fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out
}
