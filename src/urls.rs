//! URL canonicalization and post classification.
//!
//! Every URL that enters the pipeline is funneled through [`normalize`] so
//! that two references to the same logical page compare equal. The
//! normalized form is the deduplication key everywhere downstream.
//!
//! Classification ([`is_post_url`]) decides whether a discovered URL looks
//! like an article rather than a taxonomy, pagination, or asset page. It
//! normalizes its input first, so the verdict is the same whether a URL is
//! tested before or after normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Query parameter key prefixes that only carry tracking state.
const TRACKING_PREFIXES: [&str; 8] = [
    "utm_", "fbclid", "gclid", "yclid", "msclkid", "mc_", "igshid", "ref",
];

/// Path segments that indicate an article page. Includes the date-path
/// convention (`/2024/05/…`) and localized post-path variants.
static POST_ALLOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d{4}/\d{1,2}|blog|posts?|articles?|yazi|yazilar|notlar)/").unwrap()
});

/// Path segments that indicate taxonomy, pagination, search, or assets;
/// never an article, even when an allow pattern also matches.
static POST_DENY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(tags?|categor(y|ies)|author|page|search|attachment|wp-content|wp-json|feed|comments)/")
        .unwrap()
});

/// A four-digit year as its own path segment.
static YEAR_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/((?:19|20)\d{2})(?:/|$)").unwrap());

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    TRACKING_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Canonicalize a URL into its deduplication-key form.
///
/// Steps, in order:
/// 1. drop query parameters whose key matches a tracking prefix
///    (case-insensitive);
/// 2. lowercase scheme and host (done by `url::Url` parsing);
/// 3. default a scheme-less input to `https`;
/// 4. ensure the path ends with `/` (an empty path becomes `/`);
/// 5. drop the fragment; it never names a distinct resource.
///
/// Pure and idempotent: `normalize(normalize(x)) == normalize(x)`.
/// Unparseable input is returned trimmed but otherwise unchanged.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    let Ok(mut url) = Url::parse(&with_scheme) else {
        return trimmed.to_string();
    };
    if url.cannot_be_a_base() {
        return trimmed.to_string();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }

    url.set_fragment(None);

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url.to_string()
}

/// Classify a URL as an article page.
///
/// The input is normalized first, so classification commutes with
/// [`normalize`]. A URL passes when an allow pattern matches and no deny
/// pattern does.
pub fn is_post_url(url: &str) -> bool {
    let n = normalize(url).to_lowercase();
    !POST_DENY.is_match(&n) && POST_ALLOW.is_match(&n)
}

/// Whether `url` shares the scheme/host/port of `base`.
///
/// Every discovery stage restricts its results to the configured site.
pub fn same_origin(url: &str, base: &str) -> bool {
    match (Url::parse(&normalize(url)), Url::parse(&normalize(base))) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

/// Pull a publication year out of a date-style URL path, if present.
///
/// Used as the year-bucket fallback when a post carries no parseable date.
pub fn year_from_path(url: &str) -> Option<String> {
    let parsed = Url::parse(&normalize(url)).ok()?;
    YEAR_SEGMENT
        .captures(parsed.path())
        .map(|caps| caps[1].to_string())
}
