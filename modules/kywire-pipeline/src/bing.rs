//! Bing-fallback seeding: a synthetic RSS feed per county that has no
//! real coverage source.

use anyhow::Result;
use tracing::info;

use kywire_common::{FetchMode, RegionScope};
use kywire_enrich::gazetteer::KY_COUNTIES;
use kywire_store::{NewFeed, Store};

/// Upsert a Bing News RSS feed row for every county lacking a non-Bing
/// enabled feed. Idempotent on feed id. Returns how many rows were written.
pub async fn seed_bing_fallback(store: &Store) -> Result<usize> {
    let covered = store.counties_with_real_feeds().await?;

    let mut seeded = 0;
    for county in KY_COUNTIES {
        if covered.iter().any(|c| c == county) {
            continue;
        }
        store.upsert_feed(&bing_feed(county)).await?;
        seeded += 1;
    }

    info!(seeded, covered = covered.len(), "Bing fallback seeding complete");
    Ok(seeded)
}

fn bing_feed(county: &str) -> NewFeed {
    NewFeed {
        id: format!("bing-{}", county_slug(county)),
        name: format!("Bing News - {county} County"),
        url: bing_news_url(county),
        category: "news".to_string(),
        state_code: "KY".to_string(),
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        scraper_id: None,
        default_county: Some(county.to_string()),
        enabled: true,
        is_bing_fallback: true,
    }
}

/// `https://www.bing.com/news/search?q=<encode("<County> County Kentucky")>&format=rss`
pub fn bing_news_url(county: &str) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("q", &format!("{county} County Kentucky"))
        .append_pair("format", "rss")
        .finish();
    format!("https://www.bing.com/news/search?{query}")
}

pub fn county_slug(county: &str) -> String {
    county
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kywire_store::testutil::mem_store;

    #[test]
    fn url_encodes_query() {
        assert_eq!(
            bing_news_url("Fayette"),
            "https://www.bing.com/news/search?q=Fayette+County+Kentucky&format=rss"
        );
    }

    #[test]
    fn slug_flattens_punctuation() {
        assert_eq!(county_slug("McCreary"), "mccreary");
        assert_eq!(county_slug("Jefferson"), "jefferson");
    }

    #[tokio::test]
    async fn seeds_all_uncovered_counties() {
        let store = mem_store().await;
        let seeded = seed_bing_fallback(&store).await.unwrap();
        assert_eq!(seeded, 120, "empty store means every county is uncovered");

        // Second pass rewrites the same rows, still 120, no duplicates.
        let again = seed_bing_fallback(&store).await.unwrap();
        assert_eq!(again, 120);
        let count: i64 = sqlx_count(&store).await;
        assert_eq!(count, 120);
    }

    #[tokio::test]
    async fn covered_county_is_skipped() {
        let store = mem_store().await;
        store
            .upsert_feed(&NewFeed {
                id: "hazard-herald".to_string(),
                name: "Hazard Herald".to_string(),
                url: "https://example.com/feed".to_string(),
                category: "news".to_string(),
                state_code: "KY".to_string(),
                region_scope: RegionScope::Ky,
                fetch_mode: FetchMode::Rss,
                scraper_id: None,
                default_county: Some("Perry".to_string()),
                enabled: true,
                is_bing_fallback: false,
            })
            .await
            .unwrap();

        let seeded = seed_bing_fallback(&store).await.unwrap();
        assert_eq!(seeded, 119);
        assert!(store.get_feed("bing-perry").await.unwrap().is_none());
    }

    async fn sqlx_count(store: &Store) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM feeds WHERE is_bing_fallback = 1")
            .fetch_one(store.pool())
            .await
            .unwrap()
    }
}
