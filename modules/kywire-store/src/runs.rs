//! Run metrics and the fetch-error ledger. Metric writes warn rather than
//! propagate: a failed bookkeeping row must never abort an ingestion run.

use chrono::{DateTime, Duration, Utc};
use kywire_common::RunStatus;
use tracing::warn;
use uuid::Uuid;

use crate::Store;

/// Per-feed outcome inside one ingestion run.
#[derive(Debug, Clone)]
pub struct FeedRunMetric {
    pub feed_id: String,
    pub status: RunStatus,
    pub http_status: Option<u16>,
    pub duration_ms: i64,
    pub items_seen: i64,
    pub items_upserted: i64,
    pub error_message: Option<String>,
}

impl Store {
    /// Open a run header row; returns the run id.
    pub async fn begin_fetch_run(&self, source: &str, started_at: DateTime<Utc>) -> Option<String> {
        let run_id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO fetch_runs (id, started_at, status, source)
            VALUES (?1, ?2, 'running', ?3)
            "#,
        )
        .bind(&run_id)
        .bind(started_at)
        .bind(source)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Some(run_id),
            Err(e) => {
                warn!(source, error = %e, "Failed to open fetch run row");
                None
            }
        }
    }

    /// Close a run header row with its final status and details.
    pub async fn finish_fetch_run(
        &self,
        run_id: &str,
        status: RunStatus,
        finished_at: DateTime<Utc>,
        details: &serde_json::Value,
    ) {
        let result = sqlx::query(
            r#"
            UPDATE fetch_runs
            SET finished_at = ?2, status = ?3, details_json = ?4
            WHERE id = ?1
            "#,
        )
        .bind(run_id)
        .bind(finished_at)
        .bind(status.as_str())
        .bind(details.to_string())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(run_id, error = %e, "Failed to close fetch run row");
        }
    }

    /// Record one feed's outcome within a run.
    pub async fn record_feed_run_metric(&self, run_id: &str, metric: &FeedRunMetric) {
        let result = sqlx::query(
            r#"
            INSERT INTO feed_run_metrics
                (run_id, feed_id, status, http_status, duration_ms,
                 items_seen, items_upserted, error_message)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(run_id)
        .bind(&metric.feed_id)
        .bind(metric.status.as_str())
        .bind(metric.http_status.map(|s| s as i64))
        .bind(metric.duration_ms)
        .bind(metric.items_seen)
        .bind(metric.items_upserted)
        .bind(&metric.error_message)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(feed_id = %metric.feed_id, error = %e, "Failed to record feed run metric");
        }
    }

    /// Append to the fetch-error ledger.
    pub async fn record_fetch_error(&self, feed_id: Option<&str>, error: &str, at: DateTime<Utc>) {
        let truncated: String = error.chars().take(1000).collect();
        let result = sqlx::query("INSERT INTO fetch_errors (feed_id, at, error) VALUES (?1, ?2, ?3)")
            .bind(feed_id)
            .bind(at)
            .bind(truncated)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            warn!(error = %e, "Failed to record fetch error");
        }
    }

    /// Feeds with at least `min_errors` ledger entries in the trailing
    /// `window_hours`, sorted by id. Input for the feed-failure alert.
    pub async fn failing_feeds(
        &self,
        min_errors: i64,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, sqlx::Error> {
        let cutoff = now - Duration::hours(window_hours);
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT feed_id FROM fetch_errors
            WHERE feed_id IS NOT NULL AND at >= ?1
            GROUP BY feed_id
            HAVING COUNT(*) >= ?2
            ORDER BY feed_id
            "#,
        )
        .bind(cutoff)
        .bind(min_errors)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::mem_store;

    #[tokio::test]
    async fn run_lifecycle() {
        let store = mem_store().await;
        let started = Utc::now();
        let run_id = store.begin_fetch_run("feed-ingestion", started).await.unwrap();

        store
            .record_feed_run_metric(
                &run_id,
                &FeedRunMetric {
                    feed_id: "f1".to_string(),
                    status: RunStatus::NotModified,
                    http_status: Some(304),
                    duration_ms: 42,
                    items_seen: 0,
                    items_upserted: 0,
                    error_message: None,
                },
            )
            .await;

        store
            .finish_fetch_run(
                &run_id,
                RunStatus::Ok,
                Utc::now(),
                &serde_json::json!({"feeds": 1}),
            )
            .await;

        let status: String = sqlx::query_scalar("SELECT status FROM fetch_runs WHERE id = ?1")
            .bind(&run_id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(status, "ok");
    }

    #[tokio::test]
    async fn failing_feeds_thresholds() {
        let store = mem_store().await;
        let now = Utc::now();

        for _ in 0..3 {
            store.record_fetch_error(Some("flaky"), "timeout", now).await;
        }
        store.record_fetch_error(Some("once"), "timeout", now).await;
        // Old errors fall outside the window
        for _ in 0..3 {
            store
                .record_fetch_error(Some("recovered"), "timeout", now - Duration::hours(4))
                .await;
        }

        let failing = store.failing_feeds(3, 3, now).await.unwrap();
        assert_eq!(failing, vec!["flaky"]);
    }
}
