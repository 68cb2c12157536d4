use url::Url;

/// Tracking query parameters stripped during canonicalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "fbclid",
    "gclid",
    "mc_cid",
    "mc_eid",
    "igshid",
    "ref",
    "smid",
];

/// Hosts known to serve TLS; `http://` links from their feeds are upgraded.
const KNOWN_TLS_HOSTS: &[&str] = &[
    "www.kentucky.com",
    "www.courier-journal.com",
    "www.wkyt.com",
    "www.lex18.com",
    "www.wlky.com",
    "www.wdrb.com",
    "www.whas11.com",
    "www.wave3.com",
    "www.wymt.com",
    "www.wbko.com",
    "www.wpsd6.com",
    "kentuckylantern.com",
    "www.kentuckytoday.com",
    "apps.legislature.ky.gov",
    "www.bing.com",
];

/// Canonicalize an article URL: strip tracking params, the fragment, and
/// any trailing slash; lowercase the host; upgrade `http` to `https` for
/// hosts known to serve TLS. Unparseable input is returned trimmed.
pub fn canonicalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut parsed = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => return trimmed.to_string(),
    };

    if parsed.scheme() == "http" {
        if let Some(host) = parsed.host_str() {
            if KNOWN_TLS_HOSTS.contains(&host.to_ascii_lowercase().as_str()) {
                // set_scheme only fails for invalid transitions; http->https is valid
                let _ = parsed.set_scheme("https");
            }
        }
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_ascii_lowercase();
        if lowered != host {
            let _ = parsed.set_host(Some(&lowered));
        }
    }

    parsed.set_fragment(None);

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &kept {
            serializer.append_pair(k, v);
        }
        parsed.set_query(Some(&serializer.finish()));
    }

    let mut out = parsed.to_string();
    while out.ends_with('/') && !out.ends_with("://") {
        // Keep the bare origin form `https://host/` intact
        if Url::parse(&out)
            .map(|u| u.path() == "/")
            .unwrap_or(false)
        {
            break;
        }
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tracking_params() {
        assert_eq!(
            canonicalize_url("https://example.com/story?utm_source=rss&utm_medium=feed"),
            "https://example.com/story"
        );
    }

    #[test]
    fn keeps_meaningful_params() {
        assert_eq!(
            canonicalize_url("https://example.com/story?id=42&utm_source=rss"),
            "https://example.com/story?id=42"
        );
    }

    #[test]
    fn strips_fragment_and_trailing_slash() {
        assert_eq!(
            canonicalize_url("https://example.com/story/#comments"),
            "https://example.com/story"
        );
    }

    #[test]
    fn preserves_bare_origin_slash() {
        assert_eq!(canonicalize_url("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn lowercases_host_only() {
        assert_eq!(
            canonicalize_url("https://Example.COM/Story"),
            "https://example.com/Story"
        );
    }

    #[test]
    fn upgrades_known_tls_host() {
        assert_eq!(
            canonicalize_url("http://www.wkyt.com/2025/06/01/story"),
            "https://www.wkyt.com/2025/06/01/story"
        );
    }

    #[test]
    fn leaves_unknown_host_scheme_alone() {
        assert_eq!(
            canonicalize_url("http://smalltownpaper.example/story"),
            "http://smalltownpaper.example/story"
        );
    }

    #[test]
    fn unparseable_input_passes_through_trimmed() {
        assert_eq!(canonicalize_url("  not a url  "), "not a url");
    }

    #[test]
    fn same_article_different_tracking_canonicalizes_identically() {
        let a = canonicalize_url("https://example.com/story?fbclid=abc123");
        let b = canonicalize_url("https://example.com/story?gclid=xyz789");
        assert_eq!(a, b);
    }
}
