//! Data models for discovered posts.
//!
//! Two types flow through the pipeline:
//! - [`PostRecord`]: the final unit of output, one line in the generated
//!   index document
//! - [`DiscoveryOutcome`]: the tagged result of a single discovery strategy,
//!   used by the cascade coordinator to decide whether to fall through to
//!   the next strategy

use serde::Serialize;

/// A single discovered post, ready for rendering.
///
/// Records are unique by `url` (the canonical, normalized form) in the final
/// collection and immutable once constructed. `published` holds whatever
/// date string the source supplied (RFC-3339 from page metadata, a bare
/// `YYYY-MM-DD` from a sitemap `<lastmod>`) and is parsed leniently at
/// sort/group time.
#[derive(Debug, Clone, Serialize)]
pub struct PostRecord {
    /// Post title; falls back to the canonical URL when no title could be
    /// extracted.
    pub title: String,
    /// Canonical URL; the deduplication key.
    pub url: String,
    /// Publication timestamp, if any source provided one.
    pub published: Option<String>,
    /// Short description, at most 180 characters.
    pub description: Option<String>,
}

/// Result of one discovery strategy.
///
/// The cascade tries strategies in priority order and stops at the first
/// non-`Empty` outcome. The content API returns complete records directly;
/// every other strategy only finds URLs, which are handed to the metadata
/// extractor afterwards.
#[derive(Debug)]
pub enum DiscoveryOutcome {
    /// Full records straight from a content API; no per-page extraction
    /// needed.
    Posts(Vec<PostRecord>),
    /// Canonical URLs only, insertion-order deduplicated.
    Urls(Vec<String>),
    /// The strategy found nothing; the cascade moves on.
    Empty,
}

impl DiscoveryOutcome {
    /// Whether the outcome carries any posts or URLs.
    pub fn is_empty(&self) -> bool {
        match self {
            DiscoveryOutcome::Posts(posts) => posts.is_empty(),
            DiscoveryOutcome::Urls(urls) => urls.is_empty(),
            DiscoveryOutcome::Empty => true,
        }
    }

    /// Number of posts or URLs carried.
    pub fn len(&self) -> usize {
        match self {
            DiscoveryOutcome::Posts(posts) => posts.len(),
            DiscoveryOutcome::Urls(urls) => urls.len(),
            DiscoveryOutcome::Empty => 0,
        }
    }
}
