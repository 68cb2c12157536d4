//! Breaking-news classification.
//!
//! Priority ladder, first match wins:
//! 1. emergency patterns in title + leading body
//! 2. breaking patterns in the title only (body "breaking" is noise)
//! 3. official-source phrases anywhere → developing, boosted
//! 4. developing patterns anywhere → developing, not boosted
//!
//! Emergency, breaking, and official-source developing set `is_breaking`
//! and a 4-hour expiry; plain developing does not.

use chrono::{DateTime, Duration, Utc};
use regex::RegexSet;
use std::sync::OnceLock;

use kywire_common::{AlertLevel, Sentiment};

/// How much of the body joins the title for pattern scanning.
const BODY_SCAN_CHARS: usize = 500;

/// Hours until a breaking item stops boosting ranking.
pub const BREAKING_EXPIRY_HOURS: i64 = 4;

const EMERGENCY_PATTERNS: &[&str] = &[
    r"(?i)\btornado emergency\b",
    r"(?i)\bflash flood emergency\b",
    r"(?i)\bevacuat(?:e|ed|ion|ions)\b",
    r"(?i)\bshelter[ -]in[ -]place\b",
    r"(?i)\bactive shooter\b",
    r"(?i)\bamber alert\b",
    r"(?i)\bstate of emergency\b",
    r"(?i)\bmass casualty\b",
    r"(?i)\bboil water advisory\b",
];

const BREAKING_PATTERNS: &[&str] = &[
    r"(?i)^breaking\b",
    r"(?i)\bbreaking:\s",
    r"(?i)\bjust in:?\s",
    r"(?i)\burgent:\s",
];

const OFFICIAL_SOURCE_PHRASES: &[&str] = &[
    "national weather service",
    "kyem",
    "kentucky emergency management",
    "fema",
    "kentucky state police",
    "health department",
    "centers for disease control",
];

const DEVELOPING_PATTERNS: &[&str] = &[
    r"(?i)\bdeveloping story\b",
    r"(?i)\bthis is a developing\b",
    r"(?i)\bdeveloping:\s",
    r"(?i)\bmore details to come\b",
    r"(?i)\bupdates to follow\b",
    r"(?i)\bstory will be updated\b",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "killed", "dies", "died", "death", "dead", "fatal", "crash", "wreck",
    "fire", "shooting", "shot", "arrested", "charged", "indicted", "lawsuit",
    "fraud", "storm", "damage", "outage", "flood", "flooding", "injured",
    "victim", "victims", "threat", "closure", "layoffs", "overdose",
    "missing", "tornado", "drought", "scam",
];

const POSITIVE_KEYWORDS: &[&str] = &[
    "wins", "won", "award", "awarded", "celebrates", "celebration", "opens",
    "opening", "champion", "champions", "success", "graduates", "honored",
    "honors", "donation", "donates", "scholarship", "ribbon", "festival",
    "expansion", "grant", "reopens", "record", "milestone", "anniversary",
];

fn emergency_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(EMERGENCY_PATTERNS).expect("emergency patterns compile"))
}

fn breaking_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(BREAKING_PATTERNS).expect("breaking patterns compile"))
}

fn developing_set() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(DEVELOPING_PATTERNS).expect("developing patterns compile"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakingClassification {
    pub alert_level: Option<AlertLevel>,
    pub is_breaking: bool,
    pub sentiment: Sentiment,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Classify an article's urgency and sentiment.
pub fn classify_breaking(
    title: &str,
    body: Option<&str>,
    now: DateTime<Utc>,
) -> BreakingClassification {
    let lead: String = body
        .unwrap_or_default()
        .chars()
        .take(BODY_SCAN_CHARS)
        .collect();
    let combined = format!("{title}\n{lead}");
    let combined_lower = combined.to_lowercase();

    let (alert_level, is_breaking) = if emergency_set().is_match(&combined) {
        (Some(AlertLevel::Emergency), true)
    } else if breaking_set().is_match(title) {
        (Some(AlertLevel::Breaking), true)
    } else if OFFICIAL_SOURCE_PHRASES.iter().any(|p| combined_lower.contains(p)) {
        (Some(AlertLevel::Developing), true)
    } else if developing_set().is_match(&combined) {
        (Some(AlertLevel::Developing), false)
    } else {
        (None, false)
    };

    BreakingClassification {
        alert_level,
        is_breaking,
        sentiment: score_sentiment(&combined_lower),
        expires_at: is_breaking.then(|| now + Duration::hours(BREAKING_EXPIRY_HOURS)),
    }
}

/// Keyword-count polarity: `|neg − pos| > 1` decides, else neutral.
fn score_sentiment(text_lower: &str) -> Sentiment {
    let tokens: Vec<&str> = text_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let neg = tokens
        .iter()
        .filter(|t| NEGATIVE_KEYWORDS.contains(*t))
        .count() as i64;
    let pos = tokens
        .iter()
        .filter(|t| POSITIVE_KEYWORDS.contains(*t))
        .count() as i64;

    if (neg - pos) > 1 {
        Sentiment::Negative
    } else if (pos - neg) > 1 {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn emergency_beats_breaking_prefix() {
        let c = classify_breaking("BREAKING: active shooter reported downtown", None, at());
        assert_eq!(c.alert_level, Some(AlertLevel::Emergency));
        assert!(c.is_breaking);
    }

    #[test]
    fn emergency_matches_in_body_lead() {
        let c = classify_breaking(
            "Police respond to courthouse",
            Some("Officials ordered residents to evacuate the block."),
            at(),
        );
        assert_eq!(c.alert_level, Some(AlertLevel::Emergency));
    }

    #[test]
    fn breaking_prefix_in_title() {
        let c = classify_breaking("BREAKING: tornado warning for Fayette County", None, at());
        assert_eq!(c.alert_level, Some(AlertLevel::Breaking));
        assert!(c.is_breaking);
        assert_eq!(c.expires_at, Some(at() + Duration::hours(4)));
    }

    #[test]
    fn body_breaking_is_noise() {
        let c = classify_breaking(
            "Council passes budget",
            Some("In breaking with tradition, the vote was unanimous."),
            at(),
        );
        assert_eq!(c.alert_level, None);
        assert!(!c.is_breaking);
    }

    #[test]
    fn official_source_is_developing_and_boosted() {
        let c = classify_breaking(
            "Flood watch issued for eastern counties",
            Some("The National Weather Service issued the watch through Friday."),
            at(),
        );
        assert_eq!(c.alert_level, Some(AlertLevel::Developing));
        assert!(c.is_breaking, "official-source developing is boosted");
        assert!(c.expires_at.is_some());
    }

    #[test]
    fn plain_developing_is_not_boosted() {
        let c = classify_breaking(
            "Crash closes interstate ramp",
            Some("This is a developing story and will be updated."),
            at(),
        );
        assert_eq!(c.alert_level, Some(AlertLevel::Developing));
        assert!(!c.is_breaking);
        assert!(c.expires_at.is_none());
    }

    #[test]
    fn quiet_story_classifies_nothing() {
        let c = classify_breaking(
            "Library announces summer reading program",
            Some("Registration opens Monday at all branches."),
            at(),
        );
        assert_eq!(c.alert_level, None);
        assert!(!c.is_breaking);
        assert!(c.expires_at.is_none());
    }

    #[test]
    fn pattern_scan_ignores_body_past_500_chars() {
        let padding = "a ".repeat(300); // 600 chars
        let body = format!("{padding} residents told to evacuate immediately");
        let c = classify_breaking("City meeting recap", Some(&body), at());
        assert_eq!(c.alert_level, None);
    }

    #[test]
    fn sentiment_negative() {
        assert_eq!(
            classify_breaking("Two killed in fatal crash, several injured", None, at()).sentiment,
            Sentiment::Negative
        );
    }

    #[test]
    fn sentiment_positive() {
        assert_eq!(
            classify_breaking("Team wins state title, community celebrates milestone", None, at())
                .sentiment,
            Sentiment::Positive
        );
    }

    #[test]
    fn sentiment_margin_of_one_is_neutral() {
        // one negative hit, zero positive: |1 - 0| = 1, not > 1
        assert_eq!(
            classify_breaking("Storm passes through region", None, at()).sentiment,
            Sentiment::Neutral
        );
    }

    #[test]
    fn sentiment_mixed_is_neutral() {
        // wins (+1) vs fire, crash (−2): margin 1, stays neutral
        assert_eq!(
            classify_breaking("Team wins home opener after fire, crash delays kickoff", None, at())
                .sentiment,
            Sentiment::Neutral
        );
    }
}
