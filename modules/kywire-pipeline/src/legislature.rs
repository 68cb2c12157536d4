//! Daily sync of the KY legislature bill registry from the LRC record
//! pages. The registry gates article bill links: only bills that exist
//! here ever get a junction row.

use anyhow::Result;
use chrono::{Datelike, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::{info, warn};

use kywire_fetch::fetcher::FEED_TIMEOUT;
use kywire_fetch::{Accept, FetchOptions, HttpFetcher};
use kywire_store::Store;

const CHAMBER_PAGES: &[&str] = &["bills_H.html", "bills_S.html"];

fn bill_anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(HB|SB|HR|SR|HCR|SCR|HJR|SJR)\s*(\d{1,4})\s*$")
            .expect("bill anchor regex compiles")
    })
}

/// Fetch both chamber indexes for the current regular session and upsert
/// every bill found. Returns the number of bills written.
pub async fn sync_bills(store: &Store, fetcher: &HttpFetcher) -> Result<usize> {
    let now = Utc::now();
    let year = now.year();
    let session = format!("{:02}rs", year % 100);

    let mut upserted = 0;
    for page in CHAMBER_PAGES {
        let url = format!("https://apps.legislature.ky.gov/record/{session}/{page}");
        let options = FetchOptions {
            accept: Some(Accept::Html),
            timeout: Some(FEED_TIMEOUT),
            ..Default::default()
        };

        let body = match fetcher.fetch(&url, &options).await {
            Ok(response) => response.body,
            Err(e) => {
                warn!(url, error = %e, "Bill index fetch failed");
                continue;
            }
        };
        let Some(html) = body else { continue };

        for (number, bill_url) in parse_bill_index(&html, &url) {
            if let Err(e) = store
                .upsert_bill(&number, None, Some(year as i64), Some(&bill_url), now)
                .await
            {
                warn!(bill = %number, error = %e, "Bill upsert failed");
                continue;
            }
            upserted += 1;
        }
    }

    info!(upserted, %session, "Legislature sync complete");
    Ok(upserted)
}

/// Pull `(canonical bill number, absolute url)` pairs out of an LRC
/// chamber index page.
pub(crate) fn parse_bill_index(html: &str, base_url: &str) -> Vec<(String, String)> {
    let Ok(base) = url::Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href]").expect("anchor selector parses");

    let mut seen = std::collections::HashSet::new();
    let mut bills = Vec::new();
    for element in document.select(&anchor) {
        let text: String = element.text().collect();
        let Some(caps) = bill_anchor_regex().captures(&text) else {
            continue;
        };
        let number = format!("{} {}", caps[1].to_uppercase(), &caps[2]);
        if !seen.insert(number.clone()) {
            continue;
        }
        let href = element.value().attr("href").unwrap_or_default();
        let Ok(absolute) = base.join(href) else { continue };
        bills.push((number, absolute.to_string()));
    }
    bills
}
