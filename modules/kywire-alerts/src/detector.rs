//! Alert detectors and the cooldown-gated dispatcher.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use kywire_enrich::gazetteer::KY_COUNTIES;
use kywire_store::{Item, Store};

use crate::channels::{AlertChannel, AlertMessage};

/// Feeds with this many errors in the window trip the feed-failure alert.
const FEED_FAILURE_THRESHOLD: i64 = 3;
const FEED_FAILURE_WINDOW_HOURS: i64 = 3;

/// Coverage window: counties with zero items in this span are gaps.
const COVERAGE_WINDOW_HOURS: i64 = 48;

/// How many gap counties go into the alert key.
const KEY_COUNTY_CAP: usize = 5;

pub struct Alerter {
    store: Store,
    channels: Vec<Box<dyn AlertChannel>>,
    cooldown_hours: i64,
}

impl Alerter {
    pub fn new(store: Store, channels: Vec<Box<dyn AlertChannel>>, cooldown_hours: i64) -> Self {
        Self {
            store,
            channels,
            cooldown_hours,
        }
    }

    /// Coverage-gap check: counties with zero items in the last 48h.
    /// Returns whether an alert fired.
    pub async fn check_coverage_gaps(&self, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let covered = self
            .store
            .counties_with_items_since(COVERAGE_WINDOW_HOURS, now)
            .await?;
        let gaps: Vec<&str> = KY_COUNTIES
            .iter()
            .copied()
            .filter(|county| !covered.iter().any(|c| c == county))
            .collect();

        if gaps.is_empty() {
            info!("Coverage check: all counties have items");
            return Ok(false);
        }

        let key = coverage_gap_key(&gaps);
        let message = AlertMessage {
            subject: format!("Coverage gap: {} counties silent for 48h", gaps.len()),
            body: format!(
                "No items in the last {COVERAGE_WINDOW_HOURS}h for: {}",
                gaps.join(", ")
            ),
        };
        self.fire_with_cooldown(&key, message, now).await
    }

    /// Feed-failure check: feeds with ≥3 errors in the last 3h.
    pub async fn check_feed_failures(&self, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let failing = self
            .store
            .failing_feeds(FEED_FAILURE_THRESHOLD, FEED_FAILURE_WINDOW_HOURS, now)
            .await?;

        if failing.is_empty() {
            return Ok(false);
        }

        let key = format!("feed-failures-{}", failing.join("-"));
        let message = AlertMessage {
            subject: format!("{} feeds failing repeatedly", failing.len()),
            body: format!(
                "Feeds with ≥{FEED_FAILURE_THRESHOLD} errors in the last \
                 {FEED_FAILURE_WINDOW_HOURS}h: {}",
                failing.join(", ")
            ),
        };
        self.fire_with_cooldown(&key, message, now).await
    }

    /// Breaking-news alert: fires once per item. Counties come from the
    /// item's location rows at alert time.
    pub async fn fire_breaking(&self, item: &Item, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let key = format!("breaking-{}", item.id);

        let counties: Vec<String> = self
            .store
            .item_locations(&item.id)
            .await?
            .into_iter()
            .filter(|t| !t.is_statewide())
            .map(|t| t.county)
            .collect();
        let where_line = if counties.is_empty() {
            "Statewide".to_string()
        } else {
            counties.join(", ")
        };

        let level = item.alert_level.as_deref().unwrap_or("breaking");
        let message = AlertMessage {
            subject: format!("[{}] {}", level.to_uppercase(), item.title),
            body: format!("{}\nCounties: {}\n{}", item.title, where_line, item.url),
        };
        self.fire_with_cooldown(&key, message, now).await
    }

    /// Ledger-gated dispatch: skip inside the cooldown window, otherwise
    /// insert the ledger row and deliver everywhere.
    async fn fire_with_cooldown(
        &self,
        key: &str,
        message: AlertMessage,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        if self
            .store
            .alert_in_cooldown(key, self.cooldown_hours, now)
            .await?
        {
            info!(key, "Alert suppressed by cooldown");
            return Ok(false);
        }

        self.store.record_alert(key, now).await?;
        self.deliver_all(&message).await;
        info!(key, channels = self.channels.len(), "Alert fired");
        Ok(true)
    }

    /// Best-effort parallel delivery; channel failures log and are done.
    async fn deliver_all(&self, message: &AlertMessage) {
        let deliveries = self.channels.iter().map(|channel| async move {
            if let Err(e) = channel.deliver(message).await {
                warn!(channel = channel.name(), error = %e, "Alert delivery failed");
            }
        });
        join_all(deliveries).await;
    }
}

/// `coverage-gap-<sorted-top-5>`: deterministic key over the first five
/// gap counties, lowercased.
fn coverage_gap_key(gaps: &[&str]) -> String {
    let mut sorted: Vec<String> = gaps.iter().map(|g| g.to_lowercase()).collect();
    sorted.sort();
    sorted.truncate(KEY_COUNTY_CAP);
    format!("coverage-gap-{}", sorted.join("-"))
}
