use chrono::{DateTime, Utc};
use kywire_common::{FetchMode, RegionScope};

use crate::Store;

/// A configured source row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: String,
    pub state_code: String,
    pub region_scope: String,
    pub fetch_mode: String,
    pub scraper_id: Option<String>,
    pub default_county: Option<String>,
    pub enabled: bool,
    pub is_bing_fallback: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Feed {
    pub fn fetch_mode(&self) -> FetchMode {
        FetchMode::parse(&self.fetch_mode).unwrap_or(FetchMode::Rss)
    }

    pub fn region_scope(&self) -> RegionScope {
        RegionScope::parse(&self.region_scope).unwrap_or(RegionScope::Ky)
    }

    pub fn is_facebook(&self) -> bool {
        self.fetch_mode() == FetchMode::FacebookPage
    }
}

/// Input for seeding or admin-creating a feed.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category: String,
    pub state_code: String,
    pub region_scope: RegionScope,
    pub fetch_mode: FetchMode,
    pub scraper_id: Option<String>,
    pub default_county: Option<String>,
    pub enabled: bool,
    pub is_bing_fallback: bool,
}

impl Store {
    /// Insert-or-update a feed by id. Conditional-fetch validators and
    /// `last_checked_at` are never clobbered by a reseed.
    pub async fn upsert_feed(&self, feed: &NewFeed) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO feeds
                (id, name, url, category, state_code, region_scope, fetch_mode,
                 scraper_id, default_county, enabled, is_bing_fallback)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                category = excluded.category,
                state_code = excluded.state_code,
                region_scope = excluded.region_scope,
                fetch_mode = excluded.fetch_mode,
                scraper_id = excluded.scraper_id,
                default_county = excluded.default_county,
                is_bing_fallback = excluded.is_bing_fallback
            "#,
        )
        .bind(&feed.id)
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(&feed.category)
        .bind(&feed.state_code)
        .bind(feed.region_scope.as_str())
        .bind(feed.fetch_mode.as_str())
        .bind(&feed.scraper_id)
        .bind(&feed.default_county)
        .bind(feed.enabled)
        .bind(feed.is_bing_fallback)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Enabled feeds due for a fetch, oldest `last_checked_at` first
    /// (never-checked feeds lead).
    pub async fn due_feeds(&self, limit: usize) -> Result<Vec<Feed>, sqlx::Error> {
        sqlx::query_as::<_, Feed>(
            r#"
            SELECT * FROM feeds
            WHERE enabled = 1
            ORDER BY last_checked_at IS NOT NULL, last_checked_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_feed(&self, id: &str) -> Result<Option<Feed>, sqlx::Error> {
        sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Enabled feeds in a given fetch mode (rss discovery scans scrape mode).
    pub async fn feeds_in_mode(&self, mode: FetchMode) -> Result<Vec<Feed>, sqlx::Error> {
        sqlx::query_as::<_, Feed>(
            "SELECT * FROM feeds WHERE enabled = 1 AND fetch_mode = ?1 ORDER BY id",
        )
        .bind(mode.as_str())
        .fetch_all(&self.pool)
        .await
    }

    /// Persist conditional-fetch validators and the check timestamp.
    /// Written by the orchestrator only.
    pub async fn update_feed_validators(
        &self,
        feed_id: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
        checked_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET etag = COALESCE(?2, etag),
                last_modified = COALESCE(?3, last_modified),
                last_checked_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(feed_id)
        .bind(etag)
        .bind(last_modified)
        .bind(checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Promote a scrape feed to RSS after discovery finds a working feed URL.
    pub async fn promote_feed_to_rss(&self, feed_id: &str, rss_url: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE feeds SET fetch_mode = 'rss', url = ?2, etag = NULL, last_modified = NULL WHERE id = ?1",
        )
        .bind(feed_id)
        .bind(rss_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Distinct counties that have at least one enabled non-Bing feed
    /// scoped to them. The Bing seeder fills the complement.
    pub async fn counties_with_real_feeds(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT default_county FROM feeds
            WHERE enabled = 1
              AND is_bing_fallback = 0
              AND default_county IS NOT NULL
              AND default_county != ''
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
