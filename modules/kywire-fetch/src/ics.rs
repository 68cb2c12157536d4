//! Minimal ICS (RFC 5545) calendar parsing: folded-line handling, VEVENT
//! blocks, DATE and DATE-TIME decoding. Recurrence rules are out of
//! scope; district calendars publish expanded event lists.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::FetchError;

#[derive(Debug, Clone, Default)]
pub struct IcsEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub url: Option<String>,
}

/// Parse VEVENT blocks from an ICS document. Events missing a summary or
/// start are dropped; a document without `BEGIN:VCALENDAR` is an error.
pub fn parse_ics(raw: &str) -> Result<Vec<IcsEvent>, FetchError> {
    if !raw.contains("BEGIN:VCALENDAR") {
        return Err(FetchError::Parse("not an ICS document".to_string()));
    }

    let lines = unfold_lines(raw);

    let mut events = Vec::new();
    let mut current: Option<IcsEvent> = None;

    for line in lines {
        if line == "BEGIN:VEVENT" {
            current = Some(IcsEvent::default());
            continue;
        }
        if line == "END:VEVENT" {
            if let Some(event) = current.take() {
                if !event.summary.is_empty() && event.start_at.is_some() {
                    events.push(event);
                }
            }
            continue;
        }

        let Some(event) = current.as_mut() else {
            continue;
        };
        let Some((name_part, value)) = line.split_once(':') else {
            continue;
        };
        // Property parameters (";VALUE=DATE", ";TZID=…") follow the name.
        let name = name_part.split(';').next().unwrap_or(name_part);

        match name {
            "UID" => event.uid = Some(value.trim().to_string()),
            "SUMMARY" => event.summary = unescape_text(value.trim()),
            "DTSTART" => event.start_at = parse_ics_datetime(value.trim()),
            "DTEND" => event.end_at = parse_ics_datetime(value.trim()),
            "LOCATION" => {
                let loc = unescape_text(value.trim());
                if !loc.is_empty() {
                    event.location = Some(loc);
                }
            }
            "URL" => event.url = Some(value.trim().to_string()),
            _ => {}
        }
    }

    Ok(events)
}

/// RFC 5545 line unfolding: a CRLF (or LF) followed by a space or tab
/// continues the previous line.
fn unfold_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw_line in raw.lines() {
        let line = raw_line.trim_end_matches('\r');
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = lines.last_mut() {
                last.push_str(&line[1..]);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

/// Decode `YYYYMMDD` (all-day) and `YYYYMMDDTHHMMSS[Z]` forms. Naive
/// times are taken as UTC; district calendars don't carry offsets.
fn parse_ics_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Some(stripped) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").ok()?;
        return Some(Utc.from_utc_datetime(&naive));
    }
    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Undo ICS text escaping.
fn unescape_text(value: &str) -> String {
    value
        .replace("\\n", " ")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
}
