//! End-to-end enrichment scenarios against an in-memory store: duplicate
//! collapse, paywalled deprioritization, and breaking surfacing.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};

use ai_client::NoopSummarizer;
use kywire_common::{CountyTag, FetchMode, RegionScope};
use kywire_pipeline::{ArticleFetcher, EnrichmentWorker};
use kywire_store::reader::ItemQuery;
use kywire_store::testutil::mem_store;
use kywire_store::{ItemDraft, NewFeed, Store};

/// Article fetcher serving canned HTML per URL.
struct CannedFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl ArticleFetcher for CannedFetcher {
    async fn fetch_article(&self, url: &str) -> Result<Option<String>> {
        Ok(self.pages.get(url).cloned())
    }
}

fn worker(store: &Store, pages: HashMap<String, String>) -> EnrichmentWorker {
    EnrichmentWorker::new(
        store.clone(),
        Arc::new(CannedFetcher { pages }),
        Arc::new(NoopSummarizer),
        None,
        10,
        3,
    )
}

async fn seed_feed(store: &Store, id: &str) {
    store
        .upsert_feed(&NewFeed {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("https://example.com/{id}"),
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
        .unwrap();
}

async fn seed_item(store: &Store, feed_id: &str, id: &str, title: &str, url: &str, summary: &str) {
    let now = Utc::now();
    store
        .upsert_item(
            &ItemDraft {
                id: id.to_string(),
                title: title.to_string(),
                url: url.to_string(),
                guid: Some(format!("guid-{id}")),
                author: None,
                region_scope: RegionScope::Ky,
                published_at: Some(now),
                fetched_at: now,
                summary: Some(summary.to_string()),
                content: None,
                image_url: None,
                hash: format!("hash-{id}"),
                is_facebook: false,
            },
            feed_id,
        )
        .await
        .unwrap();
    store
        .set_item_locations(id, &[CountyTag::ky_statewide()])
        .await
        .unwrap();
    store.add_item_category(id, "news").await.unwrap();
    store.enqueue_item(id, now).await.unwrap();
}

fn bill_summary() -> String {
    "Lawmakers in the Kentucky House voted on the measure after hours of floor debate \
     covering school funding road projects pension obligations and local government \
     budgets while members of both parties offered amendments and constituents watched \
     from the gallery as the final roll call was read aloud before the chamber adjourned \
     for the evening session"
        .to_string()
}

fn storm_summary() -> String {
    "Forecasters tracked the rotating cell across two counties as sirens sounded and \
     spotters reported a funnel near the bypass while emergency crews staged equipment \
     at the fairgrounds and dispatchers urged drivers to leave the roadway and residents \
     to move into interior rooms away from windows until the warning expired later in \
     the Kentucky evening"
        .to_string()
}

fn library_summary() -> String {
    "Registration for the summer reading program opens Monday at every branch with \
     weekly prizes story hours craft sessions and a closing celebration planned for \
     late July while librarians encouraged families across the Kentucky county to sign \
     up early because last year every available slot filled within the first two weeks \
     of open enrollment"
        .to_string()
}

#[tokio::test]
async fn duplicate_collapse_across_feeds() {
    let store = mem_store().await;
    seed_feed(&store, "feed-one").await;
    seed_feed(&store, "feed-two").await;

    seed_item(
        &store,
        "feed-one",
        "item-a",
        "House passes HB 200",
        "https://example.com/a",
        &bill_summary(),
    )
    .await;
    worker(&store, HashMap::new()).run().await.unwrap();

    seed_item(
        &store,
        "feed-two",
        "item-b",
        "House passes H.B. 200",
        "https://example.com/b",
        &bill_summary(),
    )
    .await;
    worker(&store, HashMap::new()).run().await.unwrap();

    // Both persisted; B collapsed onto A.
    let a = store.get_item("item-a").await.unwrap().unwrap();
    let b = store.get_item("item-b").await.unwrap().unwrap();
    assert!(!a.is_duplicate);
    assert!(b.is_duplicate);
    assert_eq!(b.canonical_item_id.as_deref(), Some("item-a"));

    // Default query returns only the canonical.
    let rows = store
        .ranked_items(&ItemQuery::builder().build(), Utc::now())
        .await
        .unwrap();
    let ids: Vec<&str> = rows.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["item-a"]);
}

#[tokio::test]
async fn paywalled_duplicate_is_deprioritized() {
    let store = mem_store().await;
    seed_feed(&store, "feed-free").await;
    seed_feed(&store, "feed-walled").await;

    // Free canonical with a stored body long enough to stand in.
    seed_item(
        &store,
        "feed-free",
        "item-free",
        "House passes HB 200",
        "https://example.com/free-story",
        &bill_summary(),
    )
    .await;
    worker(&store, HashMap::new()).run().await.unwrap();
    store
        .save_item_body("item-free", None, &bill_summary(), 60)
        .await
        .unwrap();

    // Paywalled copy on a subscription daily.
    let walled_url = "https://www.kentucky.com/news/hb200.html";
    let walled_html = format!(
        r#"<html><head><title>t</title></head><body>
           <div class="paywall subscriber-only">subscribe to continue</div>
           <article><p>{body}</p></article></body></html>"#,
        body = bill_summary()
    );
    let walled_summary = format!("{} Subscribe to continue reading.", bill_summary());
    seed_item(
        &store,
        "feed-walled",
        "item-walled",
        "House passes H.B. 200",
        walled_url,
        &walled_summary,
    )
    .await;
    let pages = HashMap::from([(walled_url.to_string(), walled_html)]);
    worker(&store, pages).run().await.unwrap();

    let walled = store.get_item("item-walled").await.unwrap().unwrap();
    assert!(walled.is_paywalled, "confidence {}", walled.paywall_confidence);
    assert!(walled.is_duplicate);
    assert!(walled.paywall_deprioritized);

    // With duplicates and paywalled included, the free canonical still
    // sorts first.
    let query = ItemQuery::builder()
        .include_duplicates(true)
        .include_paywalled(true)
        .build();
    let rows = store.ranked_items(&query, Utc::now()).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["item-free", "item-walled"]);
}

#[tokio::test]
async fn breaking_item_tops_feed_until_expiry() {
    let store = mem_store().await;
    seed_feed(&store, "feed-one").await;

    // The breaking item is published first, the quiet item after it, so
    // recency alone would put the quiet item on top.
    seed_item(
        &store,
        "feed-one",
        "item-hot",
        "BREAKING: tornado warning for Fayette County",
        "https://example.com/tornado",
        &storm_summary(),
    )
    .await;
    seed_item(
        &store,
        "feed-one",
        "item-quiet",
        "Library announces summer reading program",
        "https://example.com/library",
        &library_summary(),
    )
    .await;
    worker(&store, HashMap::new()).run().await.unwrap();

    let hot = store.get_item("item-hot").await.unwrap().unwrap();
    assert!(hot.is_breaking);
    assert_eq!(hot.alert_level.as_deref(), Some("breaking"));
    let expires = hot.breaking_expires_at.unwrap();
    assert!(expires > Utc::now() + Duration::hours(3));
    assert!(expires <= Utc::now() + Duration::hours(4));

    let tags = store.item_locations("item-hot").await.unwrap();
    assert!(tags.iter().any(|t| t.county == "Fayette"));
    assert!(tags.iter().any(|t| t.is_statewide()));

    let now = Utc::now();
    let rows = store
        .ranked_items(&ItemQuery::builder().build(), now)
        .await
        .unwrap();
    assert_eq!(rows[0].id, "item-hot", "breaking boost wins over recency");

    // Five hours on the boost is gone and recency decides.
    let later = now + Duration::hours(5);
    let rows = store
        .ranked_items(&ItemQuery::builder().build(), later)
        .await
        .unwrap();
    assert_eq!(rows[0].id, "item-quiet");
    assert!(store.breaking_ticker(later).await.unwrap().is_empty());
}
