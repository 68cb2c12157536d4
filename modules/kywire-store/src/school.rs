use chrono::{DateTime, Duration, Utc};

use crate::Store;

/// Calendar events older than this are not worth storing.
pub const EVENT_MAX_AGE_DAYS: i64 = 90;

/// A school-district calendar event.
#[derive(Debug, Clone)]
pub struct SchoolEvent {
    pub uid: String,
    pub county: String,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub url: Option<String>,
}

impl Store {
    /// Upsert a calendar event by uid. Events older than 90 days are
    /// skipped; returns whether a row was written.
    pub async fn upsert_school_event(
        &self,
        event: &SchoolEvent,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        if event.start_at < now - Duration::days(EVENT_MAX_AGE_DAYS) {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO school_events (uid, county, title, start_at, end_at, location, url, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(uid) DO UPDATE SET
                county = excluded.county,
                title = excluded.title,
                start_at = excluded.start_at,
                end_at = excluded.end_at,
                location = excluded.location,
                url = excluded.url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&event.uid)
        .bind(&event.county)
        .bind(&event.title)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(&event.location)
        .bind(&event.url)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    pub async fn school_event_count(&self, county: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM school_events WHERE county = ?1")
            .bind(county)
            .fetch_one(&self.pool)
            .await
    }
}
