//! Per-page metadata extraction.
//!
//! Given a discovered post URL, fetch the page and pull out a title, short
//! description, publication timestamp, and canonical URL using a priority
//! chain of structured-metadata sources with plain-content fallbacks:
//!
//! - canonical: `<link rel="canonical">` → the input URL
//! - title: `og:title` → first `<h1>` → `<title>` → canonical URL
//! - description: `og:description` → `<meta name="description">` → first
//!   `<p>`; collapsed whitespace, at most 180 characters
//! - published: `article:published_time` → `<time datetime>`; left empty
//!   for the aggregator's sitemap-lastmod backfill otherwise
//!
//! A failed fetch degrades to a URL-as-title record instead of failing the
//! run; one unreachable page costs exactly one degraded entry.

use crate::fetch::Fetch;
use crate::urls::normalize;
use crate::utils::{collapse_whitespace, truncate_chars};
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Cap applied to extracted descriptions.
pub const MAX_DESCRIPTION_CHARS: usize = 180;

/// Metadata extracted from one page.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub title: String,
    pub description: Option<String>,
    pub published: Option<String>,
    /// Normalized canonical URL; the deduplication key downstream.
    pub canonical: String,
}

/// Fetch `url` and extract its metadata, degrading on fetch failure.
pub async fn extract<F: Fetch>(fetcher: &F, url: &str) -> PageMeta {
    match fetcher.fetch_text(url).await {
        Ok(html) => {
            let meta = parse_page(&html, url);
            debug!(%url, title = %meta.title, "extracted page metadata");
            meta
        }
        Err(e) => {
            warn!(%url, error = %e, "page fetch failed; emitting degraded record");
            let canonical = normalize(url);
            PageMeta {
                title: canonical.clone(),
                description: None,
                published: None,
                canonical,
            }
        }
    }
}

/// Parse a fetched HTML document. Sync so no `scraper::Html` value (which
/// is not `Send`) lives across an await point.
fn parse_page(html: &str, url: &str) -> PageMeta {
    let document = Html::parse_document(html);

    let canonical = normalize(
        &meta_href(&document, r#"link[rel="canonical"]"#).unwrap_or_else(|| url.to_string()),
    );

    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| first_text(&document, "h1"))
        .or_else(|| first_text(&document, "title"))
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| canonical.clone());

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#))
        .or_else(|| first_text(&document, "p"))
        .map(|d| truncate_chars(&collapse_whitespace(&d), MAX_DESCRIPTION_CHARS))
        .filter(|d| !d.is_empty());

    let published = meta_content(&document, r#"meta[property="article:published_time"]"#)
        .or_else(|| attr_value(&document, "time", "datetime"))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    PageMeta {
        title,
        description,
        published,
        canonical,
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    document
        .select(&sel)
        .find_map(|el| el.value().attr("content"))
        .map(|c| c.to_string())
        .filter(|c| !c.trim().is_empty())
}

fn meta_href(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    document
        .select(&sel)
        .find_map(|el| el.value().attr("href"))
        .map(|h| h.to_string())
        .filter(|h| !h.trim().is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    document
        .select(&sel)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .find(|t| !t.trim().is_empty())
}

fn attr_value(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    document
        .select(&sel)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.to_string())
        .filter(|v| !v.trim().is_empty())
}
