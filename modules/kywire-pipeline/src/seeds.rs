//! Compiled-in seed catalog of Kentucky sources, applied idempotently at
//! startup. Admin-added feeds live only in the database; these are the
//! baseline the pipeline ships with.

use anyhow::Result;
use tracing::info;

use kywire_common::{FetchMode, RegionScope};
use kywire_store::{NewFeed, Store};

struct SeedFeed {
    id: &'static str,
    name: &'static str,
    url: &'static str,
    category: &'static str,
    region_scope: RegionScope,
    fetch_mode: FetchMode,
    default_county: Option<&'static str>,
}

const SEED_FEEDS: &[SeedFeed] = &[
    // Statewide TV
    SeedFeed {
        id: "wkyt-news",
        name: "WKYT News",
        url: "https://www.wkyt.com/arc/outboundfeeds/rss/",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: None,
    },
    SeedFeed {
        id: "lex18-news",
        name: "LEX 18 News",
        url: "https://www.lex18.com/news.rss",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: None,
    },
    SeedFeed {
        id: "wlky-news",
        name: "WLKY News",
        url: "https://www.wlky.com/topstories-rss",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Jefferson"),
    },
    SeedFeed {
        id: "wdrb-news",
        name: "WDRB News",
        url: "https://www.wdrb.com/search/?f=rss&t=article&c=news&l=50",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Jefferson"),
    },
    SeedFeed {
        id: "wave3-news",
        name: "WAVE News",
        url: "https://www.wave3.com/arc/outboundfeeds/rss/",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Jefferson"),
    },
    SeedFeed {
        id: "whas11-news",
        name: "WHAS11 News",
        url: "https://www.whas11.com/feeds/syndication/rss/news/local",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Jefferson"),
    },
    SeedFeed {
        id: "wymt-news",
        name: "WYMT Mountain News",
        url: "https://www.wymt.com/arc/outboundfeeds/rss/",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Perry"),
    },
    SeedFeed {
        id: "wbko-news",
        name: "WBKO News",
        url: "https://www.wbko.com/arc/outboundfeeds/rss/",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Warren"),
    },
    SeedFeed {
        id: "wpsd-news",
        name: "WPSD Local 6",
        url: "https://www.wpsd6.com/search/?f=rss&t=article&c=news&l=50",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("McCracken"),
    },
    // Dailies
    SeedFeed {
        id: "herald-leader",
        name: "Lexington Herald-Leader",
        url: "https://www.kentucky.com/news/local/?widgetName=rssfeed&widgetContentId=712015&getXmlFeed=true",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Fayette"),
    },
    SeedFeed {
        id: "courier-journal",
        name: "Louisville Courier Journal",
        url: "https://www.courier-journal.com/rss/",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Jefferson"),
    },
    SeedFeed {
        id: "daily-independent",
        name: "The Daily Independent",
        url: "https://www.dailyindependent.com/search/?f=rss&t=article&c=news&l=50",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Boyd"),
    },
    SeedFeed {
        id: "bg-daily-news",
        name: "Bowling Green Daily News",
        url: "https://www.bgdailynews.com/search/?f=rss&t=article&c=news&l=50",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Warren"),
    },
    SeedFeed {
        id: "messenger-inquirer",
        name: "Messenger-Inquirer",
        url: "https://www.messenger-inquirer.com/search/?f=rss&t=article&c=news&l=50",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Daviess"),
    },
    // Nonprofit / public media
    SeedFeed {
        id: "kentucky-lantern",
        name: "Kentucky Lantern",
        url: "https://kentuckylantern.com/feed/",
        category: "politics",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: None,
    },
    SeedFeed {
        id: "wfpl-news",
        name: "Louisville Public Media",
        url: "https://www.lpm.org/news.rss",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Jefferson"),
    },
    SeedFeed {
        id: "weku-news",
        name: "WEKU News",
        url: "https://www.weku.org/news.rss",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Madison"),
    },
    SeedFeed {
        id: "wuky-news",
        name: "WUKY News",
        url: "https://www.wuky.org/news.rss",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: Some("Fayette"),
    },
    // Weeklies without a working feed (scraped)
    SeedFeed {
        id: "mountain-eagle",
        name: "The Mountain Eagle",
        url: "https://www.themountaineagle.com/",
        category: "news",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Scrape,
        default_county: Some("Letcher"),
    },
    SeedFeed {
        id: "todays-sports-ky",
        name: "Kentucky High School Sports",
        url: "https://www.khsaa.org/feed/",
        category: "sports",
        region_scope: RegionScope::Ky,
        fetch_mode: FetchMode::Rss,
        default_county: None,
    },
    // National context
    SeedFeed {
        id: "ap-top-news",
        name: "AP Top News",
        url: "https://feeds.apnews.com/rss/apf-topnews",
        category: "national",
        region_scope: RegionScope::National,
        fetch_mode: FetchMode::Rss,
        default_county: None,
    },
    SeedFeed {
        id: "npr-national",
        name: "NPR News",
        url: "https://feeds.npr.org/1001/rss.xml",
        category: "national",
        region_scope: RegionScope::National,
        fetch_mode: FetchMode::Rss,
        default_county: None,
    },
];

/// Upsert the seed catalog. Safe to run every startup.
pub async fn seed_feeds(store: &Store) -> Result<usize> {
    for seed in SEED_FEEDS {
        store
            .upsert_feed(&NewFeed {
                id: seed.id.to_string(),
                name: seed.name.to_string(),
                url: seed.url.to_string(),
                category: seed.category.to_string(),
                state_code: if seed.region_scope == RegionScope::Ky { "KY" } else { "US" }
                    .to_string(),
                region_scope: seed.region_scope,
                fetch_mode: seed.fetch_mode,
                scraper_id: (seed.fetch_mode == FetchMode::Scrape)
                    .then(|| "generic-article-list".to_string()),
                default_county: seed.default_county.map(str::to_string),
                enabled: true,
                is_bing_fallback: false,
            })
            .await?;
    }

    info!(feeds = SEED_FEEDS.len(), "Seed catalog applied");
    Ok(SEED_FEEDS.len())
}
