use chrono::{DateTime, Utc};

/// Deterministic FNV-1a hash for ids and change detection.
/// Must be stable across process restarts — `DefaultHasher` is NOT
/// (HashDoS randomization).
pub fn fnv1a64(content: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325; // FNV offset basis
    for byte in content.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3); // FNV prime
    }
    hash
}

/// Stable item id: a pure function of `{url, guid, title, published_at}`.
/// Re-ingesting the same article always derives the same id.
pub fn stable_item_id(
    url: &str,
    guid: Option<&str>,
    title: &str,
    published_at: Option<DateTime<Utc>>,
) -> String {
    let key = format!(
        "{url}\u{1}{guid}\u{1}{title}\u{1}{published}",
        guid = guid.unwrap_or(""),
        published = published_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
    );
    format!("{:016x}", fnv1a64(&key))
}

/// Content fingerprint used by the upsert contract: when the stored hash
/// matches, the item is treated as unchanged.
pub fn content_fingerprint(title: &str, summary: Option<&str>, content: Option<&str>) -> String {
    let key = format!(
        "{title}\u{1}{summary}\u{1}{content}",
        summary = summary.unwrap_or(""),
        content = content.unwrap_or(""),
    );
    format!("{:016x}", fnv1a64(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fnv1a64_known_vectors() {
        // Empty string hashes to the offset basis.
        assert_eq!(fnv1a64(""), 0xcbf29ce484222325);
        assert_ne!(fnv1a64("a"), fnv1a64("b"));
    }

    #[test]
    fn item_id_is_stable() {
        let published = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let a = stable_item_id(
            "https://example.com/story",
            Some("guid-1"),
            "House passes HB 200",
            Some(published),
        );
        let b = stable_item_id(
            "https://example.com/story",
            Some("guid-1"),
            "House passes HB 200",
            Some(published),
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn item_id_varies_by_field() {
        let base = stable_item_id("https://example.com/a", None, "Title", None);
        assert_ne!(base, stable_item_id("https://example.com/b", None, "Title", None));
        assert_ne!(base, stable_item_id("https://example.com/a", Some("g"), "Title", None));
        assert_ne!(base, stable_item_id("https://example.com/a", None, "Other", None));
    }

    #[test]
    fn fingerprint_ignores_field_reordering_ambiguity() {
        // Separator byte prevents "ab" + "c" colliding with "a" + "bc".
        assert_ne!(
            content_fingerprint("ab", Some("c"), None),
            content_fingerprint("a", Some("bc"), None)
        );
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = content_fingerprint("Title", Some("summary"), None);
        let b = content_fingerprint("Title", Some("summary"), Some("full body"));
        assert_ne!(a, b);
    }
}
