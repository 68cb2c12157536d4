//! Cross-cutting properties of the ranked query surface.

use chrono::{DateTime, Duration, Utc};

use kywire_common::{AlertLevel, CountyTag, FetchMode, QueueStatus, RegionScope, Sentiment};
use kywire_store::reader::{encode_cursor, ItemQuery};
use kywire_store::testutil::mem_store;
use kywire_store::{ItemDraft, NewFeed, Store};

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

async fn seed_item(
    store: &Store,
    id: &str,
    feed_id: &str,
    published_at: Option<DateTime<Utc>>,
    fetched_at: DateTime<Utc>,
) {
    store
        .upsert_item(
            &ItemDraft {
                id: id.to_string(),
                title: format!("Item {id}"),
                url: format!("https://example.com/{id}"),
                guid: None,
                author: None,
                region_scope: RegionScope::Ky,
                published_at,
                fetched_at,
                summary: None,
                content: None,
                image_url: None,
                hash: format!("h-{id}"),
                is_facebook: false,
            },
            feed_id,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn ranking_is_a_total_order() {
    let store = mem_store().await;
    seed_feed(&store, "f").await;
    let now = Utc::now();

    // Same published and fetched instants: only the id key can separate.
    let t = now - Duration::hours(1);
    for id in ["twin-a", "twin-b", "twin-c"] {
        seed_item(&store, id, "f", Some(t), t).await;
    }

    let first = store
        .ranked_items(&ItemQuery::builder().build(), now)
        .await
        .unwrap();
    let second = store
        .ranked_items(&ItemQuery::builder().build(), now)
        .await
        .unwrap();

    let first_ids: Vec<&str> = first.iter().map(|i| i.id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(first_ids.len(), 3);
    assert_eq!(first_ids, second_ids, "order is deterministic");
    assert_eq!(first_ids, vec!["twin-c", "twin-b", "twin-a"], "id DESC breaks the tie");
}

#[tokio::test]
async fn duplicate_rows_resolve_to_clean_canonicals() {
    let store = mem_store().await;
    seed_feed(&store, "f").await;
    let now = Utc::now();

    seed_item(&store, "canon", "f", Some(now - Duration::hours(2)), now).await;
    seed_item(&store, "copy-1", "f", Some(now - Duration::hours(1)), now).await;
    seed_item(&store, "copy-2", "f", Some(now), now).await;
    store.mark_item_duplicate("copy-1", "canon").await.unwrap();
    store.mark_item_duplicate("copy-2", "canon").await.unwrap();

    for copy in ["copy-1", "copy-2"] {
        let item = store.get_item(copy).await.unwrap().unwrap();
        let canonical_id = item.canonical_item_id.unwrap();
        assert_ne!(canonical_id, item.id, "no self-canonicals");
        let canonical = store.get_item(&canonical_id).await.unwrap().unwrap();
        assert!(!canonical.is_duplicate, "canonical is never itself a duplicate");
    }
}

#[tokio::test]
async fn full_pagination_cursor_strictly_decreases() {
    let store = mem_store().await;
    seed_feed(&store, "f").await;
    let now = Utc::now();

    for i in 0..9 {
        seed_item(
            &store,
            &format!("page-{i}"),
            "f",
            Some(now - Duration::minutes(i * 7 + 1)),
            now,
        )
        .await;
    }

    let mut cursor: Option<String> = None;
    let mut seen = Vec::new();
    let mut cursors = Vec::new();
    loop {
        let builder = ItemQuery::builder().limit(4);
        let query = match cursor.take() {
            Some(c) => {
                cursors.push(c.clone());
                builder.cursor(c).build()
            }
            None => builder.build(),
        };
        let page = store.ranked_items(&query, now).await.unwrap();
        if page.is_empty() {
            break;
        }
        cursor = page.last().map(encode_cursor);
        seen.extend(page.into_iter().map(|i| i.id));
    }

    assert_eq!(seen.len(), 9, "every item appears exactly once");
    let unique: std::collections::HashSet<&String> = seen.iter().collect();
    assert_eq!(unique.len(), 9);

    let mut sorted_desc = cursors.clone();
    sorted_desc.sort_by(|a, b| b.cmp(a));
    assert_eq!(cursors, sorted_desc, "cursors strictly decrease page over page");
}

#[tokio::test]
async fn breaking_boost_stops_at_exact_expiry() {
    let store = mem_store().await;
    seed_feed(&store, "f").await;
    let now = Utc::now();

    seed_item(&store, "newer", "f", Some(now - Duration::minutes(10)), now).await;
    seed_item(&store, "hot", "f", Some(now - Duration::hours(2)), now).await;
    let expires = now + Duration::hours(1);
    store
        .set_item_breaking("hot", true, Some(AlertLevel::Breaking), Sentiment::Neutral, Some(expires))
        .await
        .unwrap();

    // One second before expiry the boost holds.
    let rows = store
        .ranked_items(&ItemQuery::builder().build(), expires - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(rows[0].id, "hot");

    // At the expiry instant the boost is gone (`>` comparison).
    let rows = store
        .ranked_items(&ItemQuery::builder().build(), expires)
        .await
        .unwrap();
    assert_eq!(rows[0].id, "newer");
}

#[tokio::test]
async fn null_published_at_sorts_after_dated_items() {
    let store = mem_store().await;
    seed_feed(&store, "f").await;
    let now = Utc::now();

    seed_item(&store, "undated", "f", None, now).await;
    seed_item(&store, "dated-old", "f", Some(now - Duration::days(2)), now - Duration::hours(1)).await;

    let rows = store
        .ranked_items(&ItemQuery::builder().build(), now)
        .await
        .unwrap();
    let ids: Vec<&str> = rows.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["dated-old", "undated"]);
}

#[tokio::test]
async fn rejected_short_excluded_from_every_view() {
    let store = mem_store().await;
    seed_feed(&store, "f").await;
    let now = Utc::now();

    seed_item(&store, "stub", "f", Some(now), now).await;
    store
        .set_item_locations("stub", &[CountyTag::ky_statewide(), CountyTag::ky("Perry")])
        .await
        .unwrap();
    store.add_item_category("stub", "news").await.unwrap();
    store.enqueue_item("stub", now).await.unwrap();
    store
        .transition_queue_row("stub", QueueStatus::RejectedShort, None, now)
        .await
        .unwrap();

    for query in [
        ItemQuery::builder().build(),
        ItemQuery::builder().counties(vec!["Perry".to_string()]).build(),
        ItemQuery::builder().category("news").build(),
        ItemQuery::builder()
            .include_duplicates(true)
            .include_paywalled(true)
            .build(),
    ] {
        assert!(
            store.ranked_items(&query, now).await.unwrap().is_empty(),
            "rejected-short items must never surface"
        );
    }
}

#[tokio::test]
async fn since_filters_on_sort_timestamp() {
    let store = mem_store().await;
    seed_feed(&store, "f").await;
    let now = Utc::now();

    seed_item(&store, "today", "f", Some(now - Duration::hours(2)), now).await;
    seed_item(&store, "last-week", "f", Some(now - Duration::days(6)), now).await;

    let query = ItemQuery::builder().since(now - Duration::days(1)).build();
    let rows = store.ranked_items(&query, now).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["today"]);
}
