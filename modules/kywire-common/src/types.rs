use serde::{Deserialize, Serialize};

/// How a feed's content is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    Rss,
    Scrape,
    FacebookPage,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::Rss => "rss",
            FetchMode::Scrape => "scrape",
            FetchMode::FacebookPage => "facebook-page",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rss" => Some(FetchMode::Rss),
            "scrape" => Some(FetchMode::Scrape),
            "facebook-page" => Some(FetchMode::FacebookPage),
            _ => None,
        }
    }
}

/// Whether a feed (and its items) is county-attachable Kentucky coverage
/// or national coverage that never gets county locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionScope {
    Ky,
    National,
}

impl RegionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionScope::Ky => "ky",
            RegionScope::National => "national",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ky" => Some(RegionScope::Ky),
            "national" => Some(RegionScope::National),
            _ => None,
        }
    }
}

/// Lifecycle of an item in the enrichment queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    BodyFetching,
    Summarizing,
    Done,
    Failed,
    RejectedShort,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::BodyFetching => "body_fetching",
            QueueStatus::Summarizing => "summarizing",
            QueueStatus::Done => "done",
            QueueStatus::Failed => "failed",
            QueueStatus::RejectedShort => "rejected_short",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "body_fetching" => Some(QueueStatus::BodyFetching),
            "summarizing" => Some(QueueStatus::Summarizing),
            "done" => Some(QueueStatus::Done),
            "failed" => Some(QueueStatus::Failed),
            "rejected_short" => Some(QueueStatus::RejectedShort),
            _ => None,
        }
    }

    /// Terminal states never revert.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Done | QueueStatus::Failed | QueueStatus::RejectedShort
        )
    }
}

/// Urgency tier assigned by the breaking classifier.
/// Ordering matters for the ticker: emergency sorts before breaking
/// sorts before developing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Emergency,
    Breaking,
    Developing,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Emergency => "emergency",
            AlertLevel::Breaking => "breaking",
            AlertLevel::Developing => "developing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "emergency" => Some(AlertLevel::Emergency),
            "breaking" => Some(AlertLevel::Breaking),
            "developing" => Some(AlertLevel::Developing),
            _ => None,
        }
    }

    /// Ticker sort rank: emergency first.
    pub fn rank(&self) -> i64 {
        match self {
            AlertLevel::Emergency => 0,
            AlertLevel::Breaking => 1,
            AlertLevel::Developing => 2,
        }
    }
}

/// Keyword-count sentiment polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

/// Outcome of a whole ingestion run or a single feed within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Error,
    NotModified,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Error => "error",
            RunStatus::NotModified => "not_modified",
            RunStatus::Failed => "failed",
        }
    }
}

/// A `(state_code, county)` location tag. `county = ""` means the tag is
/// state-level only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountyTag {
    pub state_code: String,
    pub county: String,
}

impl CountyTag {
    pub fn ky(county: &str) -> Self {
        Self {
            state_code: "KY".to_string(),
            county: county.to_string(),
        }
    }

    pub fn ky_statewide() -> Self {
        Self::ky("")
    }

    pub fn is_statewide(&self) -> bool {
        self.county.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_mode_round_trips() {
        for mode in [FetchMode::Rss, FetchMode::Scrape, FetchMode::FacebookPage] {
            assert_eq!(FetchMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(FetchMode::parse("carrier-pigeon"), None);
    }

    #[test]
    fn queue_status_round_trips() {
        for status in [
            QueueStatus::Pending,
            QueueStatus::BodyFetching,
            QueueStatus::Summarizing,
            QueueStatus::Done,
            QueueStatus::Failed,
            QueueStatus::RejectedShort,
        ] {
            assert_eq!(QueueStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(QueueStatus::Done.is_terminal());
        assert!(QueueStatus::Failed.is_terminal());
        assert!(QueueStatus::RejectedShort.is_terminal());
        assert!(!QueueStatus::Pending.is_terminal());
        assert!(!QueueStatus::BodyFetching.is_terminal());
        assert!(!QueueStatus::Summarizing.is_terminal());
    }

    #[test]
    fn alert_level_rank_orders_ticker() {
        assert!(AlertLevel::Emergency.rank() < AlertLevel::Breaking.rank());
        assert!(AlertLevel::Breaking.rank() < AlertLevel::Developing.rank());
    }

    #[test]
    fn county_tag_statewide() {
        assert!(CountyTag::ky_statewide().is_statewide());
        assert!(!CountyTag::ky("Fayette").is_statewide());
    }
}
