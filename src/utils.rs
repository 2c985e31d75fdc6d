//! Small text helpers shared across extraction and output rendering.
//!
//! This module provides pure string functions used throughout the pipeline:
//! - Whitespace collapsing for scraped titles and descriptions
//! - HTML tag stripping and entity decoding for API excerpts
//! - Character-boundary-safe truncation for short descriptions

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Collapse every whitespace run to a single space and trim the ends.
///
/// Scraped text frequently carries newlines and indentation from the source
/// HTML; descriptions and titles are rendered on a single Markdown line.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  a\n\t b  "), "a b");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Remove HTML tags from a fragment, leaving only its text content.
///
/// Used on content-API excerpts, which arrive as rendered HTML
/// (`<p>…</p>\n`). This is not a sanitizer; it only needs to flatten
/// well-formed excerpt markup.
pub fn strip_tags(s: &str) -> String {
    HTML_TAG.replace_all(s, "").into_owned()
}

/// Decode the handful of HTML entities that show up in titles and excerpts.
///
/// `&amp;` is decoded last so that double-encoded input is not over-decoded.
pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#8216;", "\u{2018}")
        .replace("&#8217;", "\u{2019}")
        .replace("&#8220;", "\u{201C}")
        .replace("&#8221;", "\u{201D}")
        .replace("&#8230;", "\u{2026}")
        .replace("&hellip;", "\u{2026}")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Truncate to at most `max` characters, appending `…` when shortened.
///
/// Operates on `char` boundaries so multi-byte text never splits mid
/// codepoint. The ellipsis counts toward the limit.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("short", 180), "short");
/// assert_eq!(truncate_chars("abcdef", 4), "abc…");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Join a site base URL with an absolute path, avoiding doubled slashes.
pub fn site_path(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
