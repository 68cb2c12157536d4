//! Read-side query composer.
//!
//! Owns the ranked item query (category/county predicates plus the
//! six-key ordering), the breaking ticker, and the coverage report.
//! Ranking is pushed into SQL so the breaking/paywall indexes keep the
//! prefix selective and no result set is materialized in memory.

use chrono::{DateTime, Duration, Utc};
use sqlx::QueryBuilder;
use typed_builder::TypedBuilder;

use crate::items::Item;
use crate::Store;

/// A ranked query result is a full item row.
pub type RankedItem = Item;

/// Parameters for the ranked item query.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ItemQuery {
    /// Category predicate (`EXISTS` in item_categories); `None` = all.
    #[builder(default, setter(strip_option, into))]
    pub category: Option<String>,
    /// County filter. Empty = statewide view (predicate omitted).
    #[builder(default)]
    pub counties: Vec<String>,
    /// Omit the county predicate entirely (national pages).
    #[builder(default = false)]
    pub national: bool,
    #[builder(default = 50)]
    pub limit: i64,
    #[builder(default = 0)]
    pub offset: i64,
    /// Only items whose sort timestamp is at or after this instant.
    #[builder(default, setter(strip_option))]
    pub since: Option<DateTime<Utc>>,
    #[builder(default = false)]
    pub include_duplicates: bool,
    #[builder(default = false)]
    pub include_paywalled: bool,
    /// Resume below this `"<iso_sort_ts>|<item_id>"` cursor.
    #[builder(default, setter(strip_option, into))]
    pub cursor: Option<String>,
}

/// Seven-day per-county aggregate row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountyCoverage {
    pub county: String,
    pub item_count: i64,
    pub latest_at: Option<DateTime<Utc>>,
}

/// Encode the pagination cursor for a result row.
pub fn encode_cursor(item: &Item) -> String {
    let sort_ts = item.published_at.unwrap_or(item.fetched_at);
    format!("{}|{}", sort_ts.to_rfc3339(), item.id)
}

/// Parse a `"<iso_sort_ts>|<item_id>"` cursor.
pub fn parse_cursor(cursor: &str) -> Option<(DateTime<Utc>, String)> {
    let (ts, id) = cursor.split_once('|')?;
    let parsed = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    if id.is_empty() {
        return None;
    }
    Some((parsed, id.to_string()))
}

impl Store {
    /// The default read query: filtered, ranked, paginated.
    pub async fn ranked_items(
        &self,
        query: &ItemQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedItem>, sqlx::Error> {
        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("SELECT items.* FROM items WHERE 1=1");

        if let Some(category) = &query.category {
            qb.push(
                " AND EXISTS (SELECT 1 FROM item_categories ic WHERE ic.item_id = items.id AND ic.category = ",
            );
            qb.push_bind(category.clone());
            qb.push(")");
        }

        if !query.national && !query.counties.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM item_locations il WHERE il.item_id = items.id AND il.state_code = 'KY' AND il.county IN (",
            );
            let mut separated = qb.separated(", ");
            for county in &query.counties {
                separated.push_bind(county.clone());
            }
            qb.push("))");
        }

        // Quality gate: rejected-short items are retained but never served.
        qb.push(
            " AND NOT EXISTS (SELECT 1 FROM ingestion_queue q WHERE q.item_id = items.id AND q.status = 'rejected_short')",
        );

        if !query.include_duplicates {
            qb.push(" AND items.is_duplicate = 0");
        }
        if !query.include_paywalled {
            qb.push(" AND items.is_paywalled = 0");
        }

        if let Some(since) = query.since {
            qb.push(" AND COALESCE(items.published_at, items.fetched_at) >= ");
            qb.push_bind(since);
        }

        if let Some(cursor) = query.cursor.as_deref().and_then(parse_cursor) {
            let (ts, id) = cursor;
            qb.push(" AND (COALESCE(items.published_at, items.fetched_at) < ");
            qb.push_bind(ts);
            qb.push(" OR (COALESCE(items.published_at, items.fetched_at) = ");
            qb.push_bind(ts);
            qb.push(" AND items.id < ");
            qb.push_bind(id);
            qb.push("))");
        }

        // The six-key ranking tuple, ASC-lexicographic.
        qb.push(" ORDER BY");
        qb.push(" CASE WHEN items.is_breaking = 1 AND items.breaking_expires_at > ");
        qb.push_bind(now);
        qb.push(" THEN 0 ELSE 1 END,");
        qb.push(
            " CASE WHEN items.paywall_deprioritized = 1 THEN 2 WHEN items.is_paywalled = 1 THEN 1 ELSE 0 END,",
        );
        qb.push(
            " CASE WHEN EXISTS (SELECT 1 FROM feed_items fi JOIN feeds f ON f.id = fi.feed_id WHERE fi.item_id = items.id AND f.is_bing_fallback = 0) THEN 0 ELSE 1 END,",
        );
        qb.push(" CASE WHEN items.published_at IS NULL THEN 1 ELSE 0 END,");
        qb.push(" items.published_at DESC,");
        qb.push(" items.fetched_at DESC,");
        qb.push(" items.id DESC");

        qb.push(" LIMIT ");
        qb.push_bind(query.limit);
        qb.push(" OFFSET ");
        qb.push_bind(query.offset);

        qb.build_query_as::<RankedItem>().fetch_all(&self.pool).await
    }

    /// Top 10 active breaking items: emergency < breaking < developing,
    /// then recency.
    pub async fn breaking_ticker(&self, now: DateTime<Utc>) -> Result<Vec<Item>, sqlx::Error> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM items
            WHERE is_breaking = 1
              AND breaking_expires_at > ?1
              AND is_duplicate = 0
            ORDER BY
                CASE alert_level
                    WHEN 'emergency' THEN 0
                    WHEN 'breaking' THEN 1
                    ELSE 2
                END,
                COALESCE(published_at, fetched_at) DESC,
                id DESC
            LIMIT 10
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    /// Seven-day per-county aggregates.
    pub async fn coverage_report(&self, now: DateTime<Utc>) -> Result<Vec<CountyCoverage>, sqlx::Error> {
        let cutoff = now - Duration::days(7);
        sqlx::query_as::<_, CountyCoverage>(
            r#"
            SELECT il.county AS county,
                   COUNT(DISTINCT i.id) AS item_count,
                   MAX(COALESCE(i.published_at, i.fetched_at)) AS latest_at
            FROM item_locations il
            JOIN items i ON i.id = il.item_id
            WHERE il.state_code = 'KY'
              AND il.county != ''
              AND i.fetched_at >= ?1
            GROUP BY il.county
            ORDER BY il.county
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// Counties with at least one item in the trailing window. The
    /// coverage-gap detector takes the complement against the gazetteer.
    pub async fn counties_with_items_since(
        &self,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, sqlx::Error> {
        let cutoff = now - Duration::hours(window_hours);
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT il.county FROM item_locations il
            JOIN items i ON i.id = il.item_id
            WHERE il.state_code = 'KY'
              AND il.county != ''
              AND i.fetched_at >= ?1
            ORDER BY il.county
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }
}
