//! Stage-1 ingestion: fetch each due feed conditionally, parse, upsert,
//! gate for Kentucky relevance, tag locations, and queue for enrichment.
//!
//! A feed failure is never fatal to the run; per-item failures are never
//! fatal to the feed.

use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use kywire_common::{
    canonicalize_url, content_fingerprint, stable_item_id, RegionScope, RunStatus,
};
use kywire_enrich::{tag_locations, LocationInput};
use kywire_fetch::article::extract_article_body;
use kywire_fetch::fetcher::{ARTICLE_TIMEOUT, FEED_TIMEOUT};
use kywire_fetch::scrape::{parse_scraped, rule_for};
use kywire_fetch::{parse_feed, Accept, FetchError, FetchOptions, HttpFetcher, RawFeedItem};
use kywire_store::runs::FeedRunMetric;
use kywire_store::{Feed, ItemDraft, Store, UpsertOutcome};

use crate::relevance::{check_article_body, check_feed_text, RelevanceTier};

pub struct Orchestrator {
    store: Store,
    fetcher: HttpFetcher,
    max_feeds: usize,
    max_items_per_feed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub feeds_processed: usize,
    pub feeds_failed: usize,
    pub items_seen: i64,
    pub items_upserted: i64,
}

struct FeedOutcome {
    status: RunStatus,
    http_status: Option<u16>,
    items_seen: i64,
    items_upserted: i64,
}

impl Orchestrator {
    pub fn new(
        store: Store,
        fetcher: HttpFetcher,
        max_feeds: usize,
        max_items_per_feed: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            max_feeds,
            max_items_per_feed,
        }
    }

    /// One ingestion pass over the due feeds.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Utc::now();
        let run_id = self.store.begin_fetch_run("feed-ingestion", started).await;

        let feeds = self.store.due_feeds(self.max_feeds).await?;
        info!(feeds = feeds.len(), "Ingestion run starting");

        let mut summary = RunSummary::default();
        for feed in &feeds {
            let timer = Instant::now();
            let now = Utc::now();

            let metric = match self.process_feed(feed, now).await {
                Ok(outcome) => {
                    summary.items_seen += outcome.items_seen;
                    summary.items_upserted += outcome.items_upserted;
                    FeedRunMetric {
                        feed_id: feed.id.clone(),
                        status: outcome.status,
                        http_status: outcome.http_status,
                        duration_ms: timer.elapsed().as_millis() as i64,
                        items_seen: outcome.items_seen,
                        items_upserted: outcome.items_upserted,
                        error_message: None,
                    }
                }
                Err(e) => {
                    summary.feeds_failed += 1;
                    warn!(feed = %feed.id, error = %e, "Feed ingestion failed");
                    self.store
                        .record_fetch_error(Some(&feed.id), &e.to_string(), now)
                        .await;
                    FeedRunMetric {
                        feed_id: feed.id.clone(),
                        status: RunStatus::Error,
                        http_status: upstream_status(&e),
                        duration_ms: timer.elapsed().as_millis() as i64,
                        items_seen: 0,
                        items_upserted: 0,
                        error_message: Some(e.to_string()),
                    }
                }
            };

            if let Some(run_id) = &run_id {
                self.store.record_feed_run_metric(run_id, &metric).await;
            }
            summary.feeds_processed += 1;
        }

        if let Some(run_id) = &run_id {
            self.store
                .finish_fetch_run(
                    run_id,
                    RunStatus::Ok,
                    Utc::now(),
                    &serde_json::json!({
                        "feeds": summary.feeds_processed,
                        "failed": summary.feeds_failed,
                        "items_seen": summary.items_seen,
                        "items_upserted": summary.items_upserted,
                    }),
                )
                .await;
        }

        info!(
            feeds = summary.feeds_processed,
            failed = summary.feeds_failed,
            upserted = summary.items_upserted,
            "Ingestion run complete"
        );
        Ok(summary)
    }

    async fn process_feed(&self, feed: &Feed, now: DateTime<Utc>) -> Result<FeedOutcome> {
        let accept = match feed.fetch_mode() {
            kywire_common::FetchMode::Rss => Accept::Feed,
            _ => Accept::Html,
        };
        let options = FetchOptions {
            etag: feed.etag.clone(),
            last_modified: feed.last_modified.clone(),
            force: false,
            accept: Some(accept),
            timeout: Some(FEED_TIMEOUT),
        };

        let response = match self.fetcher.fetch(&feed.url, &options).await {
            Ok(response) => response,
            Err(e) => {
                // The attempt still counts as a check.
                self.store
                    .update_feed_validators(&feed.id, None, None, now)
                    .await?;
                return Err(e.into());
            }
        };

        self.store
            .update_feed_validators(
                &feed.id,
                response.etag.as_deref(),
                response.last_modified.as_deref(),
                now,
            )
            .await?;

        let body = response.body.as_deref().filter(|b| !b.trim().is_empty());
        let Some(body) = body else {
            return Ok(FeedOutcome {
                status: RunStatus::NotModified,
                http_status: Some(response.status),
                items_seen: 0,
                items_upserted: 0,
            });
        };

        let raw_items = match feed.fetch_mode() {
            kywire_common::FetchMode::Rss => parse_feed(body)?,
            kywire_common::FetchMode::Scrape => {
                parse_scraped(body, rule_for(feed.scraper_id.as_deref()), &feed.url)?
            }
            kywire_common::FetchMode::FacebookPage => parse_scraped(
                body,
                rule_for(feed.scraper_id.as_deref().or(Some("facebook-page"))),
                &feed.url,
            )?,
        };

        let mut items_seen = 0;
        let mut items_upserted = 0;
        for raw in raw_items.iter().take(self.max_items_per_feed) {
            if raw.title.is_empty() {
                continue;
            }
            items_seen += 1;
            match self.ingest_item(feed, raw, now).await {
                Ok(true) => items_upserted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(feed = %feed.id, url = %raw.link, error = %e, "Item ingestion failed");
                    self.store
                        .record_fetch_error(Some(&feed.id), &e.to_string(), now)
                        .await;
                }
            }
        }

        Ok(FeedOutcome {
            status: RunStatus::Ok,
            http_status: Some(response.status),
            items_seen,
            items_upserted,
        })
    }

    /// Upsert one parsed entry, gate it, tag it, queue it. Returns whether
    /// a row was inserted or updated.
    pub(crate) async fn ingest_item(
        &self,
        feed: &Feed,
        raw: &RawFeedItem,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let draft = draft_from_raw(raw, feed, now);
        let outcome = self.store.upsert_item(&draft, &feed.id).await?;
        let changed = matches!(outcome, UpsertOutcome::Inserted | UpsertOutcome::Updated);

        // KY relevance gate: ky-scope, non-Facebook feeds without a county
        // pre-scope. A feed scoped to a county vouches for its items.
        if feed.region_scope() == RegionScope::Ky
            && !feed.is_facebook()
            && feed.default_county.is_none()
            && !self.passes_relevance(raw, &draft).await
        {
            let deleted = self
                .store
                .unlink_item_from_feed(&draft.id, &feed.id)
                .await?;
            info!(url = %draft.url, deleted, "Item rejected as not Kentucky-relevant");
            return Ok(false);
        }

        let feed_text = feed_text_of(raw);
        let tags = tag_locations(&LocationInput {
            title: &raw.title,
            body: feed_text.as_deref(),
            region_scope: feed.region_scope(),
            default_county: feed.default_county.as_deref(),
            is_facebook: feed.is_facebook(),
        });
        self.store.set_item_locations(&draft.id, &tags).await?;

        self.store
            .add_item_category(&draft.id, &feed.category)
            .await?;
        self.store.enqueue_item(&draft.id, now).await?;

        Ok(changed)
    }

    /// Tiered relevance: feed text first, article body as the last resort.
    /// An unreachable article keeps the item; the next tick can retry it.
    async fn passes_relevance(&self, raw: &RawFeedItem, draft: &ItemDraft) -> bool {
        let feed_text = feed_text_of(raw);
        match check_feed_text(&raw.title, feed_text.as_deref()) {
            RelevanceTier::Pass => true,
            RelevanceTier::NeedsBody => {
                let options = FetchOptions {
                    accept: Some(Accept::Html),
                    timeout: Some(ARTICLE_TIMEOUT),
                    ..Default::default()
                };
                match self.fetcher.fetch(&draft.url, &options).await {
                    Ok(response) => {
                        let Some(html) = response.body.as_deref() else {
                            return true;
                        };
                        let body = extract_article_body(html, &draft.url);
                        // Persist what we fetched; the worker won't mind.
                        if body.word_count > 0 {
                            let _ = self
                                .store
                                .save_item_body(
                                    &draft.id,
                                    Some(html),
                                    &body.text,
                                    body.word_count as i64,
                                )
                                .await;
                        }
                        check_article_body(&body.text)
                    }
                    Err(e) => {
                        warn!(url = %draft.url, error = %e, "Relevance body fetch failed, keeping item");
                        true
                    }
                }
            }
        }
    }
}

/// Build the upsert draft: canonical URL, stable id, content fingerprint.
pub(crate) fn draft_from_raw(raw: &RawFeedItem, feed: &Feed, now: DateTime<Utc>) -> ItemDraft {
    let url = canonicalize_url(&raw.link);
    let id = stable_item_id(&url, raw.guid.as_deref(), &raw.title, raw.published_at);
    let hash = content_fingerprint(&raw.title, raw.summary.as_deref(), raw.content.as_deref());

    ItemDraft {
        id,
        title: raw.title.clone(),
        url,
        guid: raw.guid.clone(),
        author: raw.author.clone(),
        region_scope: feed.region_scope(),
        published_at: raw.published_at,
        fetched_at: now,
        summary: raw.summary.clone(),
        content: raw.content.clone(),
        image_url: raw.image_url.clone(),
        hash,
        is_facebook: feed.is_facebook(),
    }
}

fn feed_text_of(raw: &RawFeedItem) -> Option<String> {
    match (&raw.summary, &raw.content) {
        (Some(s), Some(c)) => Some(format!("{s}\n{c}")),
        (Some(s), None) => Some(s.clone()),
        (None, Some(c)) => Some(c.clone()),
        (None, None) => None,
    }
}

fn upstream_status(error: &anyhow::Error) -> Option<u16> {
    error
        .downcast_ref::<FetchError>()
        .and_then(|e| match e {
            FetchError::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kywire_common::{FetchMode, QueueStatus};
    use kywire_store::testutil::mem_store;
    use kywire_store::NewFeed;

    fn ky_feed(id: &str, default_county: Option<&str>) -> NewFeed {
        NewFeed {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("https://example.com/{id}/rss"),
            category: "news".to_string(),
            state_code: "KY".to_string(),
            region_scope: RegionScope::Ky,
            fetch_mode: FetchMode::Rss,
            scraper_id: None,
            default_county: default_county.map(str::to_string),
            enabled: true,
            is_bing_fallback: false,
        }
    }

    fn raw(title: &str, link: &str) -> RawFeedItem {
        RawFeedItem {
            title: title.to_string(),
            link: link.to_string(),
            guid: Some(format!("guid-{link}")),
            summary: Some("Officials in Fayette County said the Kentucky project is on track.".to_string()),
            ..Default::default()
        }
    }

    async fn orchestrator(store: &Store) -> Orchestrator {
        Orchestrator::new(store.clone(), HttpFetcher::new("test/1.0"), 200, 40)
    }

    #[tokio::test]
    async fn ingest_upserts_tags_and_queues() {
        let store = mem_store().await;
        store.upsert_feed(&ky_feed("f", None)).await.unwrap();
        let feed = store.get_feed("f").await.unwrap().unwrap();
        let orch = orchestrator(&store).await;

        let item = raw("Fayette County approves budget", "https://example.com/story");
        assert!(orch.ingest_item(&feed, &item, Utc::now()).await.unwrap());

        let draft = draft_from_raw(&item, &feed, Utc::now());
        let stored = store.get_item(&draft.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Fayette County approves budget");

        let tags = store.item_locations(&draft.id).await.unwrap();
        assert!(tags.iter().any(|t| t.county == "Fayette"));

        let queue = store.queue_row(&draft.id).await.unwrap().unwrap();
        assert_eq!(queue.status(), QueueStatus::Pending);

        assert_eq!(store.item_categories(&draft.id).await.unwrap(), vec!["news"]);
    }

    #[tokio::test]
    async fn reingest_unchanged_is_idempotent() {
        let store = mem_store().await;
        store.upsert_feed(&ky_feed("f", None)).await.unwrap();
        let feed = store.get_feed("f").await.unwrap().unwrap();
        let orch = orchestrator(&store).await;

        let item = raw("Kentucky budget signed", "https://example.com/budget");
        let now = Utc::now();
        assert!(orch.ingest_item(&feed, &item, now).await.unwrap());
        assert!(
            !orch.ingest_item(&feed, &item, now).await.unwrap(),
            "second pass with identical content upserts nothing"
        );

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn county_scoped_feed_skips_relevance_gate() {
        let store = mem_store().await;
        store.upsert_feed(&ky_feed("f", Some("Wolfe"))).await.unwrap();
        let feed = store.get_feed("f").await.unwrap().unwrap();
        let orch = orchestrator(&store).await;

        // No KY signal anywhere, but the feed vouches for its county.
        let mut item = raw("City council recap", "https://example.com/recap");
        item.summary = Some("Routine agenda items passed.".to_string());
        assert!(orch.ingest_item(&feed, &item, Utc::now()).await.unwrap());

        let draft = draft_from_raw(&item, &feed, Utc::now());
        let tags = store.item_locations(&draft.id).await.unwrap();
        assert!(tags.iter().any(|t| t.county == "Wolfe"));
    }

    #[tokio::test]
    async fn national_feed_items_get_no_locations() {
        let store = mem_store().await;
        let mut feed_row = ky_feed("nat", None);
        feed_row.region_scope = RegionScope::National;
        feed_row.state_code = "US".to_string();
        store.upsert_feed(&feed_row).await.unwrap();
        let feed = store.get_feed("nat").await.unwrap().unwrap();
        let orch = orchestrator(&store).await;

        let item = raw("Markets close higher", "https://example.com/markets");
        orch.ingest_item(&feed, &item, Utc::now()).await.unwrap();

        let draft = draft_from_raw(&item, &feed, Utc::now());
        assert!(store.item_locations(&draft.id).await.unwrap().is_empty());
    }

    #[test]
    fn draft_is_stable_and_canonical() {
        let feed = Feed {
            id: "f".to_string(),
            name: "f".to_string(),
            url: "https://example.com/rss".to_string(),
            category: "news".to_string(),
            state_code: "KY".to_string(),
            region_scope: "ky".to_string(),
            fetch_mode: "rss".to_string(),
            scraper_id: None,
            default_county: None,
            enabled: true,
            is_bing_fallback: false,
            etag: None,
            last_modified: None,
            last_checked_at: None,
        };
        let mut item = raw("Title", "https://example.com/story?utm_source=rss");
        let now = Utc::now();
        let a = draft_from_raw(&item, &feed, now);
        assert_eq!(a.url, "https://example.com/story");

        // Tracking params don't change identity
        item.link = "https://example.com/story?fbclid=zzz".to_string();
        item.guid = a.guid.clone();
        let b = draft_from_raw(&item, &feed, now);
        assert_eq!(a.id, b.id);
    }
}
