//! School-calendar sync: one ICS probe per county district.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use kywire_enrich::gazetteer::KY_COUNTIES;
use kywire_fetch::fetcher::ICS_TIMEOUT;
use kywire_fetch::ics::{parse_ics, IcsEvent};
use kywire_fetch::{Accept, FetchOptions, HttpFetcher};
use kywire_store::school::SchoolEvent;
use kywire_store::Store;

use crate::bing::county_slug;

/// Candidate ICS paths tried in order per district site.
const CANDIDATE_PATHS: &[&str] = &[
    "/calendar.ics",
    "/ical.ics",
    "/events.ics",
    "/calendar/calendar.ics",
];

/// Polite delay between district sites.
const DISTRICT_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, Default)]
pub struct SchoolSyncSummary {
    pub districts_checked: usize,
    pub calendars_found: usize,
    pub events_upserted: usize,
}

/// Probe every county district for a calendar and upsert its events.
pub async fn sync_school_calendars(
    store: &Store,
    fetcher: &HttpFetcher,
) -> Result<SchoolSyncSummary> {
    let mut summary = SchoolSyncSummary::default();

    for county in KY_COUNTIES.iter().copied() {
        summary.districts_checked += 1;

        match fetch_district_calendar(fetcher, county).await {
            Some(events) => {
                summary.calendars_found += 1;
                let now = Utc::now();
                for event in events {
                    let school_event = to_school_event(event, county);
                    match store.upsert_school_event(&school_event, now).await {
                        Ok(true) => summary.events_upserted += 1,
                        Ok(false) => {}
                        Err(e) => {
                            warn!(county, uid = %school_event.uid, error = %e, "Event upsert failed")
                        }
                    }
                }
            }
            None => debug!(county, "No district calendar found"),
        }

        tokio::time::sleep(DISTRICT_DELAY).await;
    }

    info!(
        districts = summary.districts_checked,
        calendars = summary.calendars_found,
        events = summary.events_upserted,
        "School calendar sync complete"
    );
    Ok(summary)
}

async fn fetch_district_calendar(fetcher: &HttpFetcher, county: &str) -> Option<Vec<IcsEvent>> {
    let base = district_base_url(county);
    let options = FetchOptions {
        accept: Some(Accept::Calendar),
        timeout: Some(ICS_TIMEOUT),
        ..Default::default()
    };

    for path in CANDIDATE_PATHS {
        let url = format!("{base}{path}");
        let Ok(response) = fetcher.fetch(&url, &options).await else {
            continue;
        };
        let Some(body) = response.body else { continue };
        if !body.contains("BEGIN:VCALENDAR") {
            continue;
        }
        match parse_ics(&body) {
            Ok(events) => return Some(events),
            Err(e) => {
                warn!(url, error = %e, "Calendar body failed to parse");
                continue;
            }
        }
    }
    None
}

/// Kentucky districts live under `<county>.kyschools.us`.
pub(crate) fn district_base_url(county: &str) -> String {
    format!("https://www.{}.kyschools.us", county_slug(county))
}

/// Events without a UID key on `county|start|title`.
pub(crate) fn to_school_event(event: IcsEvent, county: &str) -> SchoolEvent {
    let start_at = event.start_at.expect("parser drops events without a start");
    let uid = event.uid.unwrap_or_else(|| {
        format!("{county}|{}|{}", start_at.to_rfc3339(), event.summary)
    });
    SchoolEvent {
        uid,
        county: county.to_string(),
        title: event.summary,
        start_at,
        end_at: event.end_at,
        location: event.location,
        url: event.url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn district_urls_are_slugged() {
        assert_eq!(district_base_url("Fayette"), "https://www.fayette.kyschools.us");
        assert_eq!(district_base_url("McCracken"), "https://www.mccracken.kyschools.us");
    }

    #[test]
    fn uid_fallback_is_deterministic() {
        let start = Utc.with_ymd_and_hms(2025, 8, 6, 0, 0, 0).unwrap();
        let event = IcsEvent {
            uid: None,
            summary: "First Day".to_string(),
            start_at: Some(start),
            end_at: None,
            location: None,
            url: None,
        };
        let a = to_school_event(event.clone(), "Perry");
        let b = to_school_event(event, "Perry");
        assert_eq!(a.uid, b.uid);
        assert!(a.uid.starts_with("Perry|"));
    }

    #[test]
    fn explicit_uid_wins() {
        let start = Utc.with_ymd_and_hms(2025, 8, 6, 0, 0, 0).unwrap();
        let event = IcsEvent {
            uid: Some("evt-9@district".to_string()),
            summary: "Board Meeting".to_string(),
            start_at: Some(start),
            end_at: None,
            location: None,
            url: None,
        };
        assert_eq!(to_school_event(event, "Perry").uid, "evt-9@district");
    }
}
