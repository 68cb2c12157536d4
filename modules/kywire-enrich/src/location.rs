//! County inference from free text.
//!
//! Detection ladder:
//! 1. "X County" in the title is trusted unconditionally.
//! 2. Body counties need ≥2 explicit "X County" mentions, or a KY-context
//!    signal plus a known city name.
//! 3. A competing state name in the title or leading body with no KY
//!    signal suppresses inference entirely.
//! 4. A feed-level `default_county` is authoritative and always attached.
//! 5. Facebook posts skip body analysis: title + default only.

use std::collections::BTreeSet;

use kywire_common::{CountyTag, RegionScope};

use crate::gazetteer::{CITY_TO_COUNTY, KY_COUNTIES, OTHER_STATE_NAMES};

/// Body text is normalized then truncated to this many characters before
/// scanning; county mentions past this point don't change the story's focus.
const BODY_SCAN_LIMIT: usize = 3500;

/// Portion of the body considered "leading" for the other-state gate.
const LEAD_LIMIT: usize = 300;

/// Minimum explicit "X County" mentions for a body-only county tag.
const BODY_MENTION_THRESHOLD: usize = 2;

#[derive(Debug, Clone)]
pub struct LocationInput<'a> {
    pub title: &'a str,
    pub body: Option<&'a str>,
    pub region_scope: RegionScope,
    pub default_county: Option<&'a str>,
    pub is_facebook: bool,
}

/// Infer the set of `(state_code, county)` tags for an article.
///
/// National-scope items never get tags. KY-scope items that pass the gate
/// get a statewide `(KY, "")` tag plus one tag per inferred county.
pub fn tag_locations(input: &LocationInput) -> Vec<CountyTag> {
    if input.region_scope == RegionScope::National {
        return Vec::new();
    }

    let norm_title = normalize(input.title);
    let title_tokens: Vec<&str> = norm_title.split_whitespace().collect();

    let mut counties: BTreeSet<String> = BTreeSet::new();
    if let Some(default) = input.default_county {
        if !default.is_empty() {
            counties.insert(default.to_string());
        }
    }

    for county in title_counties(&title_tokens) {
        counties.insert(county);
    }

    if input.is_facebook {
        return finish(counties);
    }

    let norm_body = input
        .body
        .map(|b| {
            let mut n = normalize(b);
            n.truncate(BODY_SCAN_LIMIT);
            n
        })
        .unwrap_or_default();
    let body_tokens: Vec<&str> = norm_body.split_whitespace().collect();

    let ky_signal = has_ky_signal(&title_tokens) || has_ky_signal(&body_tokens);

    // Gate: a competing state in the title or leading body, with no KY
    // signal and no trusted title county, means this isn't our story.
    if counties.is_empty()
        && !ky_signal
        && (has_other_state(&title_tokens) || has_other_state_in_lead(&norm_body))
    {
        return Vec::new();
    }

    for county in body_counties(&body_tokens, ky_signal, &title_tokens) {
        counties.insert(county);
    }

    finish(counties)
}

fn finish(counties: BTreeSet<String>) -> Vec<CountyTag> {
    let mut tags = vec![CountyTag::ky_statewide()];
    tags.extend(counties.into_iter().map(|c| CountyTag::ky(&c)));
    tags
}

/// Lowercase, strip punctuation to spaces, collapse whitespace.
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
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Counties with at least one explicit "X County" mention in the tokens.
fn title_counties(tokens: &[&str]) -> Vec<String> {
    KY_COUNTIES
        .iter()
        .filter(|county| count_county_mentions(tokens, county) >= 1)
        .map(|c| c.to_string())
        .collect()
}

/// Body counties: ≥2 explicit mentions, or (under a KY signal) a city hit.
fn body_counties(tokens: &[&str], ky_signal: bool, title_tokens: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for county in KY_COUNTIES {
        if count_county_mentions(tokens, county) >= BODY_MENTION_THRESHOLD {
            found.push(county.to_string());
        }
    }
    if ky_signal {
        for (city, county) in CITY_TO_COUNTY {
            let city_tokens: Vec<&str> = city.split(' ').collect();
            if count_phrase(tokens, &city_tokens, Some("county")) > 0
                || count_phrase(title_tokens, &city_tokens, Some("county")) > 0
            {
                found.push(county.to_string());
            }
        }
    }
    found
}

/// Occurrences of "{county} county" in the token stream.
fn count_county_mentions(tokens: &[&str], county: &str) -> usize {
    let lowered = county.to_lowercase();
    let phrase = [lowered.as_str(), "county"];
    count_phrase(tokens, &phrase, None)
}

/// Count occurrences of a token sequence, optionally excluding matches
/// immediately followed by `excluded_next` (a bare "grayson" shouldn't
/// count when the text actually says "grayson county").
fn count_phrase(tokens: &[&str], phrase: &[&str], excluded_next: Option<&str>) -> usize {
    if phrase.is_empty() || tokens.len() < phrase.len() {
        return 0;
    }
    let mut count = 0;
    for i in 0..=(tokens.len() - phrase.len()) {
        if tokens[i..i + phrase.len()] == *phrase {
            if let Some(next) = excluded_next {
                if tokens.get(i + phrase.len()) == Some(&next) {
                    continue;
                }
            }
            count += 1;
        }
    }
    count
}

/// `kentucky` or `ky` as a word anywhere in the tokens.
fn has_ky_signal(tokens: &[&str]) -> bool {
    tokens.iter().any(|t| *t == "kentucky" || *t == "ky")
}

/// A competing state name, not immediately followed by "county"
/// (Ohio County, KY is ours).
fn has_other_state(tokens: &[&str]) -> bool {
    OTHER_STATE_NAMES.iter().any(|state| {
        let state_tokens: Vec<&str> = state.split(' ').collect();
        count_phrase(tokens, &state_tokens, Some("county")) > 0
    })
}

fn has_other_state_in_lead(norm_body: &str) -> bool {
    let lead: String = norm_body.chars().take(LEAD_LIMIT).collect();
    let tokens: Vec<&str> = lead.split_whitespace().collect();
    has_other_state(&tokens)
}
