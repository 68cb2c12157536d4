use chrono::{DateTime, Duration, Utc};
use kywire_common::{AlertLevel, CountyTag, RegionScope, Sentiment};

use crate::Store;

/// How far back the dedup window reaches.
pub const DEDUP_WINDOW_HOURS: i64 = 48;

/// Cap on dedup candidates scanned per new item.
pub const DEDUP_SCAN_CAP: i64 = 500;

/// A stored article row, enrichment columns included.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub url: String,
    pub guid: Option<String>,
    pub author: Option<String>,
    pub region_scope: String,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub body_text: Option<String>,
    pub word_count: Option<i64>,
    pub hash: String,
    pub is_facebook: bool,
    pub tags: Option<String>,
    pub minhash: Option<String>,
    pub is_duplicate: bool,
    pub canonical_item_id: Option<String>,
    pub is_paywalled: bool,
    pub paywall_confidence: i64,
    pub paywall_signals: Option<String>,
    pub paywall_deprioritized: bool,
    pub is_breaking: bool,
    pub alert_level: Option<String>,
    pub sentiment: Option<String>,
    pub breaking_expires_at: Option<DateTime<Utc>>,
    pub ai_summary: Option<String>,
    pub ai_meta_description: Option<String>,
    pub categories_json: Option<String>,
}

impl Item {
    pub fn region_scope(&self) -> RegionScope {
        RegionScope::parse(&self.region_scope).unwrap_or(RegionScope::Ky)
    }

    pub fn alert_level(&self) -> Option<AlertLevel> {
        self.alert_level.as_deref().and_then(AlertLevel::parse)
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        self.sentiment.as_deref().and_then(Sentiment::parse)
    }
}

/// Parsed feed item ready for the upsert contract.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub id: String,
    pub title: String,
    pub url: String,
    pub guid: Option<String>,
    pub author: Option<String>,
    pub region_scope: RegionScope,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub hash: String,
    pub is_facebook: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Stored hash matched; only the feed link was ensured.
    Unchanged,
}

/// A dedup-window candidate: enough to estimate Jaccard and pick a canonical.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DedupCandidate {
    pub id: String,
    pub minhash: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Store {
    /// Insert-or-update an item and ensure the feed link.
    ///
    /// Unchanged content (same stored hash) touches nothing but the link.
    /// On update, nullable ingest columns use COALESCE so a re-ingested
    /// feed row never clobbers enrichment or a previously fetched body.
    pub async fn upsert_item(
        &self,
        draft: &ItemDraft,
        feed_id: &str,
    ) -> Result<UpsertOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing_hash: Option<String> =
            sqlx::query_scalar("SELECT hash FROM items WHERE id = ?1")
                .bind(&draft.id)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = match existing_hash {
            Some(hash) if hash == draft.hash => UpsertOutcome::Unchanged,
            Some(_) => {
                sqlx::query(
                    r#"
                    UPDATE items SET
                        title = ?2,
                        url = ?3,
                        guid = COALESCE(?4, guid),
                        author = COALESCE(?5, author),
                        published_at = COALESCE(?6, published_at),
                        summary = COALESCE(?7, summary),
                        content = COALESCE(?8, content),
                        image_url = COALESCE(?9, image_url),
                        hash = ?10,
                        fetched_at = ?11
                    WHERE id = ?1
                    "#,
                )
                .bind(&draft.id)
                .bind(&draft.title)
                .bind(&draft.url)
                .bind(&draft.guid)
                .bind(&draft.author)
                .bind(draft.published_at)
                .bind(&draft.summary)
                .bind(&draft.content)
                .bind(&draft.image_url)
                .bind(&draft.hash)
                .bind(draft.fetched_at)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Updated
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO items
                        (id, title, url, guid, author, region_scope, published_at,
                         fetched_at, summary, content, image_url, hash, is_facebook)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                    "#,
                )
                .bind(&draft.id)
                .bind(&draft.title)
                .bind(&draft.url)
                .bind(&draft.guid)
                .bind(&draft.author)
                .bind(draft.region_scope.as_str())
                .bind(draft.published_at)
                .bind(draft.fetched_at)
                .bind(&draft.summary)
                .bind(&draft.content)
                .bind(&draft.image_url)
                .bind(&draft.hash)
                .bind(draft.is_facebook)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Inserted
            }
        };

        sqlx::query("INSERT OR IGNORE INTO feed_items (feed_id, item_id) VALUES (?1, ?2)")
            .bind(feed_id)
            .bind(&draft.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn get_item(&self, id: &str) -> Result<Option<Item>, sqlx::Error> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Any feed that carries this item (stage-2 needs the feed's
    /// `default_county` when re-tagging).
    pub async fn first_feed_for_item(&self, item_id: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT feed_id FROM feed_items WHERE item_id = ?1 ORDER BY feed_id LIMIT 1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Drop one feed's link; delete the item outright when no other feed
    /// references it (relevance rejection of a freshly linked item).
    pub async fn unlink_item_from_feed(
        &self,
        item_id: &str,
        feed_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM feed_items WHERE feed_id = ?1 AND item_id = ?2")
            .bind(feed_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM feed_items WHERE item_id = ?1")
                .bind(item_id)
                .fetch_one(&mut *tx)
                .await?;

        let deleted = remaining == 0;
        if deleted {
            sqlx::query("DELETE FROM items WHERE id = ?1")
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }

    /// Replace an item's location tags atomically.
    pub async fn set_item_locations(
        &self,
        item_id: &str,
        tags: &[CountyTag],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM item_locations WHERE item_id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        for tag in tags {
            sqlx::query(
                "INSERT OR IGNORE INTO item_locations (item_id, state_code, county) VALUES (?1, ?2, ?3)",
            )
            .bind(item_id)
            .bind(&tag.state_code)
            .bind(&tag.county)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn item_locations(&self, item_id: &str) -> Result<Vec<CountyTag>, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT state_code, county FROM item_locations WHERE item_id = ?1 ORDER BY county",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(state_code, county)| CountyTag { state_code, county })
            .collect())
    }

    /// Replace an item's categories atomically and mirror them into
    /// `categories_json`.
    pub async fn replace_item_categories(
        &self,
        item_id: &str,
        categories: &[String],
    ) -> Result<(), sqlx::Error> {
        let json = serde_json::to_string(categories).unwrap_or_else(|_| "[]".to_string());
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM item_categories WHERE item_id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        for category in categories {
            sqlx::query(
                "INSERT OR IGNORE INTO item_categories (item_id, category) VALUES (?1, ?2)",
            )
            .bind(item_id)
            .bind(category)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE items SET categories_json = ?2 WHERE id = ?1")
            .bind(item_id)
            .bind(&json)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn add_item_category(
        &self,
        item_id: &str,
        category: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO item_categories (item_id, category) VALUES (?1, ?2)")
            .bind(item_id)
            .bind(category)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn item_categories(&self, item_id: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT category FROM item_categories WHERE item_id = ?1 ORDER BY category",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Persist the fetched article body and its word count.
    pub async fn save_item_body(
        &self,
        item_id: &str,
        raw_html: Option<&str>,
        body_text: &str,
        word_count: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE items
            SET content = COALESCE(?2, content),
                body_text = ?3,
                word_count = ?4
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .bind(raw_html)
        .bind(body_text)
        .bind(word_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store the MinHash signature. Must happen before the window scan so
    /// later items can deduplicate against this one.
    pub async fn set_item_minhash(&self, item_id: &str, encoded: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE items SET minhash = ?2 WHERE id = ?1")
            .bind(item_id)
            .bind(encoded)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Non-duplicate items in the trailing window with signatures, most
    /// recent first, excluding the item itself. Canonical targets only;
    /// a duplicate never becomes someone's canonical.
    pub async fn dedup_candidates(
        &self,
        exclude_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<DedupCandidate>, sqlx::Error> {
        let cutoff = now - Duration::hours(DEDUP_WINDOW_HOURS);
        sqlx::query_as::<_, DedupCandidate>(
            r#"
            SELECT id, minhash, published_at FROM items
            WHERE fetched_at >= ?1
              AND minhash IS NOT NULL
              AND is_duplicate = 0
              AND id != ?2
            ORDER BY fetched_at DESC
            LIMIT ?3
            "#,
        )
        .bind(cutoff)
        .bind(exclude_id)
        .bind(DEDUP_SCAN_CAP)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn mark_item_duplicate(
        &self,
        item_id: &str,
        canonical_item_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE items SET is_duplicate = 1, canonical_item_id = ?2 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(canonical_item_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_item_paywall(
        &self,
        item_id: &str,
        is_paywalled: bool,
        confidence: i64,
        signals_json: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE items
            SET is_paywalled = ?2, paywall_confidence = ?3, paywall_signals = ?4
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .bind(is_paywalled)
        .bind(confidence)
        .bind(signals_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_item_paywall_deprioritized(&self, item_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE items SET paywall_deprioritized = 1 WHERE id = ?1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_item_breaking(
        &self,
        item_id: &str,
        is_breaking: bool,
        alert_level: Option<AlertLevel>,
        sentiment: Sentiment,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE items
            SET is_breaking = ?2, alert_level = ?3, sentiment = ?4, breaking_expires_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .bind(is_breaking)
        .bind(alert_level.map(|l| l.as_str()))
        .bind(sentiment.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_item_ai_summary(
        &self,
        item_id: &str,
        summary: &str,
        meta_description: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE items SET ai_summary = ?2, ai_meta_description = ?3 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(summary)
        .bind(meta_description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
