//! Append-only alert ledger used for cooldown checks.
//!
//! `read then insert`. The acceptable race (two concurrent checks for
//! the same key both firing) is prevented by running alerting as a
//! singleton scheduled task.

use chrono::{DateTime, Duration, Utc};

use crate::Store;

impl Store {
    /// True if an alert with this key fired within the last
    /// `cooldown_hours`. An alert at exactly the cooldown boundary is
    /// allowed to fire again.
    pub async fn alert_in_cooldown(
        &self,
        alert_key: &str,
        cooldown_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let cutoff = now - Duration::hours(cooldown_hours);
        let recent: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT fired_at FROM alert_log
            WHERE alert_key = ?1
            ORDER BY fired_at DESC
            LIMIT 1
            "#,
        )
        .bind(alert_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(recent.is_some_and(|fired| fired > cutoff))
    }

    /// Append a ledger row for a fired alert.
    pub async fn record_alert(&self, alert_key: &str, fired_at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO alert_log (alert_key, fired_at) VALUES (?1, ?2)")
            .bind(alert_key)
            .bind(fired_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::mem_store;

    #[tokio::test]
    async fn never_fired_is_not_in_cooldown() {
        let store = mem_store().await;
        assert!(!store.alert_in_cooldown("coverage-gap-x", 6, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn recent_fire_blocks() {
        let store = mem_store().await;
        let now = Utc::now();
        store.record_alert("k", now - Duration::hours(2)).await.unwrap();
        assert!(store.alert_in_cooldown("k", 6, now).await.unwrap());
    }

    #[tokio::test]
    async fn exact_cooldown_boundary_allows_refire() {
        let store = mem_store().await;
        let now = Utc::now();
        store.record_alert("k", now - Duration::hours(6)).await.unwrap();
        assert!(!store.alert_in_cooldown("k", 6, now).await.unwrap());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = mem_store().await;
        let now = Utc::now();
        store.record_alert("coverage-gap-a", now).await.unwrap();
        assert!(store.alert_in_cooldown("coverage-gap-a", 6, now).await.unwrap());
        assert!(!store.alert_in_cooldown("coverage-gap-b", 6, now).await.unwrap());
    }
}
