//! Multi-signal paywall scoring.
//!
//! Signals accumulate into a 0–100 confidence; the decision threshold is
//! 60. Known-free domains short-circuit to zero. The signal list is kept
//! for audit and serialized into the item row.

use serde::{Deserialize, Serialize};
use url::Url;

/// Confidence at or above this marks the item paywalled.
pub const PAYWALL_THRESHOLD: u32 = 60;

/// Body word counts in (0, 80) look like a teaser truncation.
const TRUNCATION_WORDS: usize = 80;

const DOMAIN_SCORE: u32 = 40;
const JSON_LD_SCORE: u32 = 35;
const CSS_TOKEN_SCORE: u32 = 10;
const CSS_TOKEN_CAP: u32 = 30;
const PHRASE_SCORE: u32 = 15;
const PHRASE_CAP: u32 = 40;
const TRUNCATION_SCORE: u32 = 15;

/// Domains that never paywall: state government and the free TV stations.
const KNOWN_FREE_DOMAINS: &[&str] = &[
    "kentucky.gov",
    "legislature.ky.gov",
    "wkyt.com",
    "lex18.com",
    "wlky.com",
    "wdrb.com",
    "whas11.com",
    "wave3.com",
    "wymt.com",
    "wbko.com",
    "wpsd6.com",
    "wtvq.com",
    "wnky.com",
    "kentuckylantern.com",
    "wuky.org",
    "wfpl.org",
    "weku.org",
];

/// Subscription dailies (Gannett, McClatchy, CNHI, Paxton).
const KNOWN_PAYWALL_DOMAINS: &[&str] = &[
    "kentucky.com",
    "courier-journal.com",
    "messenger-inquirer.com",
    "kentuckynewera.com",
    "bgdailynews.com",
    "thenewsenterprise.com",
    "paducahsun.com",
    "richmondregister.com",
    "thetimestribune.com",
    "dailyindependent.com",
    "news-expressky.com",
    "harlanenterprise.net",
    "middlesboronews.com",
    "winchestersun.com",
    "amnews.com",
    "interiorjournal.com",
    "jessaminejournal.com",
    "centralkynews.com",
    "state-journal.com",
];

/// CSS class/id fragments that metering frameworks inject.
const CSS_TOKENS: &[&str] = &[
    "paywall",
    "piano-",
    "tp-modal",
    "meteredcontent",
    "subscriber-only",
    "regwall",
    "pico-signup",
    "leaky-paywall",
    "wall-overlay",
];

/// Visible-text fragments shown at the metering cutoff.
const PAYWALL_PHRASES: &[&str] = &[
    "subscribe to continue",
    "subscribers only",
    "to continue reading",
    "already a subscriber",
    "this content is for subscribers",
    "log in to keep reading",
    "become a member to read",
    "your free articles",
    "remaining free articles",
];

/// One scoring signal. Serialized (snake_case tags) into the
/// `paywall_signals` column for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaywallSignal {
    KnownPaywallDomain { domain: String },
    JsonLdNotFree,
    CssToken { token: String },
    Phrase { phrase: String },
    ShortBody { word_count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaywallVerdict {
    pub paywalled: bool,
    pub confidence: u32,
    pub signals: Vec<PaywallSignal>,
}

impl PaywallVerdict {
    fn free() -> Self {
        Self {
            paywalled: false,
            confidence: 0,
            signals: Vec::new(),
        }
    }

    pub fn signals_json(&self) -> String {
        serde_json::to_string(&self.signals).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Score an article for paywalling.
///
/// `raw_html` is the fetched page (may be absent for feed-only items);
/// `body_text` is the extracted readable text; `word_count` is the
/// extracted body length in words.
pub fn score_paywall(
    article_url: &str,
    raw_html: Option<&str>,
    body_text: Option<&str>,
    word_count: Option<usize>,
) -> PaywallVerdict {
    let domain = registered_domain(article_url);

    if let Some(d) = domain.as_deref() {
        if KNOWN_FREE_DOMAINS.iter().any(|free| domain_matches(d, free)) {
            return PaywallVerdict::free();
        }
    }

    let mut confidence: u32 = 0;
    let mut signals = Vec::new();

    if let Some(d) = domain.as_deref() {
        if let Some(hit) = KNOWN_PAYWALL_DOMAINS.iter().find(|p| domain_matches(d, p)) {
            confidence += DOMAIN_SCORE;
            signals.push(PaywallSignal::KnownPaywallDomain {
                domain: hit.to_string(),
            });
        }
    }

    let html_lower = raw_html.map(str::to_lowercase);
    if let Some(html) = html_lower.as_deref() {
        if json_ld_not_free(html) {
            confidence += JSON_LD_SCORE;
            signals.push(PaywallSignal::JsonLdNotFree);
        }

        let mut css_score = 0;
        for token in CSS_TOKENS {
            if css_score >= CSS_TOKEN_CAP {
                break;
            }
            if html.contains(token) {
                css_score += CSS_TOKEN_SCORE;
                signals.push(PaywallSignal::CssToken {
                    token: token.to_string(),
                });
            }
        }
        confidence += css_score.min(CSS_TOKEN_CAP);
    }

    let body_lower = body_text.map(str::to_lowercase);
    let mut phrase_score = 0;
    for phrase in PAYWALL_PHRASES {
        if phrase_score >= PHRASE_CAP {
            break;
        }
        let in_body = body_lower.as_deref().is_some_and(|b| b.contains(phrase));
        let in_html = html_lower.as_deref().is_some_and(|h| h.contains(phrase));
        if in_body || in_html {
            phrase_score += PHRASE_SCORE;
            signals.push(PaywallSignal::Phrase {
                phrase: phrase.to_string(),
            });
        }
    }
    confidence += phrase_score.min(PHRASE_CAP);

    if let Some(words) = word_count {
        if words > 0 && words < TRUNCATION_WORDS {
            confidence += TRUNCATION_SCORE;
            signals.push(PaywallSignal::ShortBody { word_count: words });
        }
    }

    let confidence = confidence.min(100);
    PaywallVerdict {
        paywalled: confidence >= PAYWALL_THRESHOLD,
        confidence,
        signals,
    }
}

/// Host with any `www.` prefix dropped.
fn registered_domain(article_url: &str) -> Option<String> {
    let parsed = Url::parse(article_url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Exact domain or subdomain match.
fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// The three literal JSON-LD forms publishers emit (`false`, `"false"`,
/// `"False"`) all reduce to two checks once lowercased and de-spaced.
fn json_ld_not_free(html_lower: &str) -> bool {
    let compact: String = html_lower.split_whitespace().collect();
    compact.contains(r#""isaccessibleforfree":false"#)
        || compact.contains(r#""isaccessibleforfree":"false""#)
}
