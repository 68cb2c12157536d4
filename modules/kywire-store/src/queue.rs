use chrono::{DateTime, Duration, Utc};
use kywire_common::QueueStatus;

use crate::Store;

/// Attempts after which a stuck row becomes permanently failed.
pub const MAX_ATTEMPTS: i64 = 3;

/// Rows in a working status older than this are considered stuck.
pub const STUCK_AFTER_MINUTES: i64 = 10;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueRow {
    pub item_id: String,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueRow {
    pub fn status(&self) -> QueueStatus {
        QueueStatus::parse(&self.status).unwrap_or(QueueStatus::Pending)
    }
}

impl Store {
    /// Queue an item for enrichment. Already-queued items (any status)
    /// are left alone.
    pub async fn enqueue_item(&self, item_id: &str, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO ingestion_queue (item_id, status, attempts, created_at, updated_at)
            VALUES (?1, 'pending', 0, ?2, ?2)
            "#,
        )
        .bind(item_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn queue_row(&self, item_id: &str) -> Result<Option<QueueRow>, sqlx::Error> {
        sqlx::query_as::<_, QueueRow>("SELECT * FROM ingestion_queue WHERE item_id = ?1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Oldest pending rows, up to `batch`.
    pub async fn pending_queue_rows(&self, batch: usize) -> Result<Vec<QueueRow>, sqlx::Error> {
        sqlx::query_as::<_, QueueRow>(
            r#"
            SELECT * FROM ingestion_queue
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(batch as i64)
        .fetch_all(&self.pool)
        .await
    }

    /// Claim a row for processing: transition to `body_fetching` and
    /// increment attempts. Returns the new attempt count.
    pub async fn begin_queue_processing(
        &self,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE ingestion_queue
            SET status = 'body_fetching', attempts = attempts + 1, updated_at = ?2
            WHERE item_id = ?1
            "#,
        )
        .bind(item_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        sqlx::query_scalar("SELECT attempts FROM ingestion_queue WHERE item_id = ?1")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await
    }

    /// Move a row to a new status, recording an error message if given
    /// (truncated; queue rows are not log files).
    pub async fn transition_queue_row(
        &self,
        item_id: &str,
        status: QueueStatus,
        error: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let truncated: Option<String> = error.map(|e| e.chars().take(500).collect());
        sqlx::query(
            r#"
            UPDATE ingestion_queue
            SET status = ?2, last_error = COALESCE(?3, last_error), updated_at = ?4
            WHERE item_id = ?1
            "#,
        )
        .bind(item_id)
        .bind(status.as_str())
        .bind(truncated)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Recovery sweep: stuck working rows revert to pending while they
    /// have attempts left, otherwise become failed. Returns
    /// (reverted, failed) counts.
    pub async fn recover_stuck_queue_rows(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(u64, u64), sqlx::Error> {
        let cutoff = now - Duration::minutes(STUCK_AFTER_MINUTES);

        let reverted = sqlx::query(
            r#"
            UPDATE ingestion_queue
            SET status = 'pending', updated_at = ?1
            WHERE status IN ('body_fetching', 'summarizing')
              AND updated_at < ?2
              AND attempts < ?3
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .bind(MAX_ATTEMPTS)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let failed = sqlx::query(
            r#"
            UPDATE ingestion_queue
            SET status = 'failed', last_error = COALESCE(last_error, 'retries exhausted'), updated_at = ?1
            WHERE status IN ('body_fetching', 'summarizing')
              AND updated_at < ?2
              AND attempts >= ?3
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .bind(MAX_ATTEMPTS)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok((reverted, failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::NewFeed;
    use crate::items::ItemDraft;
    use crate::testutil::mem_store;
    use kywire_common::{FetchMode, RegionScope};

    async fn seed_item(store: &Store, id: &str) {
        store
            .upsert_feed(&NewFeed {
                id: "f".to_string(),
                name: "f".to_string(),
                url: "https://example.com/f".to_string(),
                category: "news".to_string(),
                state_code: "KY".to_string(),
                region_scope: RegionScope::Ky,
                fetch_mode: FetchMode::Rss,
                scraper_id: None,
                default_county: None,
                enabled: true,
                is_bing_fallback: false,
            })
            .await
            .ok();
        store
            .upsert_item(
                &ItemDraft {
                    id: id.to_string(),
                    title: format!("Item {id}"),
                    url: format!("https://example.com/{id}"),
                    guid: None,
                    author: None,
                    region_scope: RegionScope::Ky,
                    published_at: None,
                    fetched_at: Utc::now(),
                    summary: None,
                    content: None,
                    image_url: None,
                    hash: format!("h-{id}"),
                    is_facebook: false,
                },
                "f",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn enqueue_is_idempotent() {
        let store = mem_store().await;
        seed_item(&store, "i1").await;
        let now = Utc::now();

        store.enqueue_item("i1", now).await.unwrap();
        store
            .transition_queue_row("i1", QueueStatus::Done, None, now)
            .await
            .unwrap();
        store.enqueue_item("i1", now).await.unwrap();

        let row = store.queue_row("i1").await.unwrap().unwrap();
        assert_eq!(row.status(), QueueStatus::Done, "re-enqueue must not reset a done row");
    }

    #[tokio::test]
    async fn begin_processing_increments_attempts() {
        let store = mem_store().await;
        seed_item(&store, "i1").await;
        let now = Utc::now();
        store.enqueue_item("i1", now).await.unwrap();

        assert_eq!(store.begin_queue_processing("i1", now).await.unwrap(), 1);
        assert_eq!(store.begin_queue_processing("i1", now).await.unwrap(), 2);
        let row = store.queue_row("i1").await.unwrap().unwrap();
        assert_eq!(row.status(), QueueStatus::BodyFetching);
    }

    #[tokio::test]
    async fn recovery_reverts_stuck_rows_with_attempts_left() {
        let store = mem_store().await;
        seed_item(&store, "i1").await;
        let stuck_at = Utc::now() - Duration::minutes(11);
        store.enqueue_item("i1", stuck_at).await.unwrap();
        store.begin_queue_processing("i1", stuck_at).await.unwrap();

        let (reverted, failed) = store.recover_stuck_queue_rows(Utc::now()).await.unwrap();
        assert_eq!((reverted, failed), (1, 0));
        let row = store.queue_row("i1").await.unwrap().unwrap();
        assert_eq!(row.status(), QueueStatus::Pending);
    }

    #[tokio::test]
    async fn recovery_fails_exhausted_rows() {
        let store = mem_store().await;
        seed_item(&store, "i1").await;
        let stuck_at = Utc::now() - Duration::minutes(11);
        store.enqueue_item("i1", stuck_at).await.unwrap();
        for _ in 0..3 {
            store.begin_queue_processing("i1", stuck_at).await.unwrap();
        }

        let (reverted, failed) = store.recover_stuck_queue_rows(Utc::now()).await.unwrap();
        assert_eq!((reverted, failed), (0, 1));
        let row = store.queue_row("i1").await.unwrap().unwrap();
        assert_eq!(row.status(), QueueStatus::Failed);
    }

    #[tokio::test]
    async fn recovery_leaves_fresh_rows_alone() {
        let store = mem_store().await;
        seed_item(&store, "i1").await;
        let now = Utc::now();
        store.enqueue_item("i1", now).await.unwrap();
        store.begin_queue_processing("i1", now).await.unwrap();

        let (reverted, failed) = store.recover_stuck_queue_rows(now).await.unwrap();
        assert_eq!((reverted, failed), (0, 0));
    }

    #[tokio::test]
    async fn transition_truncates_long_errors() {
        let store = mem_store().await;
        seed_item(&store, "i1").await;
        let now = Utc::now();
        store.enqueue_item("i1", now).await.unwrap();

        let long_error = "x".repeat(2000);
        store
            .transition_queue_row("i1", QueueStatus::Failed, Some(&long_error), now)
            .await
            .unwrap();
        let row = store.queue_row("i1").await.unwrap().unwrap();
        assert_eq!(row.last_error.unwrap().len(), 500);
    }
}
