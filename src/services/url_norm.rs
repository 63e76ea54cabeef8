// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! URL canonicalization.
//!
//! Every URL identity decision in the crawler (frontier dedup, canonical-tag
//! classification, visited-set membership) goes through [`canonicalize`]. The
//! function is pure and idempotent: canonicalizing an already-canonical URL
//! returns it unchanged.

use url::Url;

/// Tracking and session query parameters stripped during canonicalization.
/// Matched case-insensitively, anywhere in the query string.
const STRIP_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "_ga",
    "_gl",
    "phpsessid",
    "sessionid",
    "sid",
];

fn is_stripped_param(key: &str) -> bool {
    STRIP_PARAMS.iter().any(|p| key.eq_ignore_ascii_case(p))
}

/// Normalize an absolute URL into its canonical comparable form.
///
/// Rules, in order: lower-case scheme and host (the `url` crate does this on
/// parse); drop blocklisted query parameters while preserving the order and
/// values of the rest; re-encode the query; default an empty path to `/`;
/// append a trailing slash unless the final path segment contains a dot;
/// drop the fragment. Returns `None` for unparseable input.
pub fn canonicalize(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_stripped_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }

    if url.path().is_empty() {
        url.set_path("/");
    }
    let path = url.path().to_string();
    let last_segment = path.rsplit('/').next().unwrap_or("");
    if !last_segment.is_empty() && !last_segment.contains('.') {
        url.set_path(&format!("{path}/"));
    }

    Some(url.to_string())
}

/// Whether two URLs share a host (and explicit port, when present).
/// Unparseable URLs never match anything.
pub fn same_host(a: &str, b: &str) -> bool {
    let host = |raw: &str| {
        Url::parse(raw)
            .ok()
            .and_then(|u| u.host_str().map(|h| (h.to_ascii_lowercase(), u.port())))
    };
    match (host(a), host(b)) {
        (Some(ha), Some(hb)) => ha == hb,
        _ => false,
    }
}

/// Whether a URL uses an HTTP(S) scheme.
pub fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_is_idempotent() {
        let inputs = [
            "https://A.com/Path?b=2&a=1#frag",
            "https://a.com",
            "https://a.com/file.pdf",
            "https://a.com/shop/?utm_source=x&page=2",
            "http://a.com/a/b/c?x=1+2&y=%2Ffoo",
        ];
        for input in inputs {
            let once = canonicalize(input).unwrap();
            let twice = canonicalize(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_canonicalize_strips_tracking_params() {
        assert_eq!(
            canonicalize("https://a.com/?utm_source=x&k=1").unwrap(),
            canonicalize("https://a.com/?k=1").unwrap()
        );
        // Case-insensitive, any position.
        assert_eq!(
            canonicalize("https://a.com/?k=1&UTM_Campaign=y&SID=abc").unwrap(),
            canonicalize("https://a.com/?k=1").unwrap()
        );
    }

    #[test]
    fn test_canonicalize_preserves_remaining_param_order() {
        let canon = canonicalize("https://a.com/?z=3&utm_medium=m&a=1").unwrap();
        assert_eq!(canon, "https://a.com/?z=3&a=1");
    }

    #[test]
    fn test_canonicalize_drops_empty_query() {
        assert_eq!(
            canonicalize("https://a.com/page?utm_source=x").unwrap(),
            "https://a.com/page/"
        );
    }

    #[test]
    fn test_canonicalize_trailing_slash_rules() {
        assert!(canonicalize("https://a.com/path").unwrap().ends_with('/'));
        assert_eq!(
            canonicalize("https://a.com/file.pdf").unwrap(),
            "https://a.com/file.pdf"
        );
        // Root path stays a single slash.
        assert_eq!(canonicalize("https://a.com").unwrap(), "https://a.com/");
    }

    #[test]
    fn test_canonicalize_lowercases_scheme_and_host() {
        assert_eq!(
            canonicalize("HTTPS://Example.COM/Path").unwrap(),
            "https://example.com/Path/"
        );
    }

    #[test]
    fn test_canonicalize_drops_fragment() {
        assert_eq!(
            canonicalize("https://a.com/page#section-2").unwrap(),
            "https://a.com/page/"
        );
    }

    #[test]
    fn test_canonicalize_rejects_garbage() {
        assert!(canonicalize("not a url").is_none());
        assert!(canonicalize("").is_none());
    }

    #[test]
    fn test_same_host() {
        assert!(same_host("https://a.com/x", "http://A.COM/y"));
        assert!(!same_host("https://a.com/", "https://b.com/"));
        assert!(!same_host("garbage", "https://a.com/"));
        assert!(!same_host("http://a.com:8080/", "http://a.com:9090/"));
        assert!(same_host("http://a.com:8080/x", "http://a.com:8080/y"));
    }

    #[test]
    fn test_is_http() {
        assert!(is_http("https://a.com/"));
        assert!(is_http("http://a.com/"));
        assert!(!is_http("mailto:x@a.com"));
        assert!(!is_http("ftp://a.com/"));
    }
}
