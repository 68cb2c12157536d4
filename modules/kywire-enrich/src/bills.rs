//! Kentucky legislature bill-number extraction.
//!
//! Matches `HB 1`, `S.B. 200`, `hcr 45`, `SJR12`, … and normalizes to the
//! canonical `HB 123` form. The FK gate against the bill registry happens
//! at the caller; extraction alone never links.

use regex::Regex;
use std::sync::OnceLock;

fn bill_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(H|S)\.?\s*(B|R|CR|JR)\.?\s*(\d{1,4})\b").expect("bill regex compiles")
    })
}

/// Extract canonical bill numbers from free text, unique, in order of
/// first appearance.
pub fn extract_bill_numbers(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut found = Vec::new();
    for caps in bill_regex().captures_iter(text) {
        let chamber = caps[1].to_uppercase();
        let kind = caps[2].to_uppercase();
        let number = &caps[3];
        let canonical = format!("{chamber}{kind} {number}");
        if seen.insert(canonical.clone()) {
            found.push(canonical);
        }
    }
    found
}
