//! Content-API discovery (stage 1).
//!
//! WordPress-style sites expose a REST listing endpoint at
//! `/wp-json/wp/v2/posts`. When present it is the best source: one request
//! per hundred posts returns title, canonical link, publication date, and a
//! rendered excerpt, so no per-page extraction is needed afterwards.
//!
//! Unavailability (the endpoint not existing, a non-2xx status, or a
//! malformed body) is "no result", never an error: the cascade simply
//! falls through to sitemap discovery.

use crate::extract::MAX_DESCRIPTION_CHARS;
use crate::fetch::Fetch;
use crate::models::{DiscoveryOutcome, PostRecord};
use crate::urls::{normalize, same_origin};
use crate::utils::{collapse_whitespace, decode_entities, site_path, strip_tags, truncate_chars};
use serde::Deserialize;
use tracing::{debug, info};

const PER_PAGE: usize = 100;

/// Safety ceiling on pagination, bounding worst-case work.
const MAX_PAGES: usize = 20;

/// One post object from the listing endpoint. Only the fields the index
/// needs; everything else in the response is ignored.
#[derive(Debug, Deserialize)]
struct ApiPost {
    #[serde(default)]
    title: Rendered,
    link: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    excerpt: Option<Rendered>,
}

/// WordPress wraps user-visible strings as `{ "rendered": "<html>" }`.
#[derive(Debug, Default, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

/// Paginate the listing endpoint, ascending page index, until an empty or
/// short page, a fetch/parse failure, or the page ceiling.
pub async fn discover<F: Fetch>(fetcher: &F, base: &str) -> DiscoveryOutcome {
    let endpoint = site_path(base, "/wp-json/wp/v2/posts");
    let mut posts = Vec::new();

    for page in 1..=MAX_PAGES {
        let url = format!("{endpoint}?per_page={PER_PAGE}&page={page}");
        let body = match fetcher.fetch_text(&url).await {
            Ok(body) => body,
            Err(e) => {
                debug!(page, error = %e, "content API unavailable; stopping pagination");
                break;
            }
        };

        let batch: Vec<ApiPost> = match serde_json::from_str(&body) {
            Ok(batch) => batch,
            Err(e) => {
                debug!(page, error = %e, "content API body is not a post listing");
                break;
            }
        };
        if batch.is_empty() {
            break;
        }

        let batch_len = batch.len();
        posts.extend(batch.into_iter().filter_map(|p| to_record(p, base)));

        // a short page is the last page
        if batch_len < PER_PAGE {
            break;
        }
    }

    if posts.is_empty() {
        DiscoveryOutcome::Empty
    } else {
        info!(count = posts.len(), "content API supplied post records");
        DiscoveryOutcome::Posts(posts)
    }
}

fn to_record(post: ApiPost, base: &str) -> Option<PostRecord> {
    if !same_origin(&post.link, base) {
        return None;
    }
    let url = normalize(&post.link);

    let title = collapse_whitespace(&decode_entities(&strip_tags(&post.title.rendered)));
    let title = if title.is_empty() { url.clone() } else { title };

    let description = post
        .excerpt
        .map(|e| collapse_whitespace(&decode_entities(&strip_tags(&e.rendered))))
        .filter(|d| !d.is_empty())
        .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS));

    Some(PostRecord {
        title,
        url,
        published: post.date.filter(|d| !d.is_empty()),
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StubFetcher;

    const PAGE_ONE: &str = r#"[
        {"title": {"rendered": "First &amp; Foremost"},
         "link": "https://example.net/blog/first?utm_source=feed",
         "date": "2024-03-01T08:00:00",
         "excerpt": {"rendered": "<p>An excerpt.</p>\n"}},
        {"title": {"rendered": "Second"},
         "link": "https://example.net/blog/second",
         "date": null,
         "excerpt": null},
        {"title": {"rendered": "Elsewhere"},
         "link": "https://other.net/blog/offsite",
         "date": "2024-01-01T00:00:00"}
    ]"#;

    #[tokio::test]
    async fn test_discover_maps_records_and_filters_origin() {
        let stub = StubFetcher::new().page(
            "https://example.net/wp-json/wp/v2/posts?per_page=100&page=1",
            PAGE_ONE,
        );

        let DiscoveryOutcome::Posts(posts) = discover(&stub, "https://example.net").await else {
            panic!("expected Posts outcome");
        };
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "First & Foremost");
        assert_eq!(posts[0].url, "https://example.net/blog/first/");
        assert_eq!(posts[0].published.as_deref(), Some("2024-03-01T08:00:00"));
        assert_eq!(posts[0].description.as_deref(), Some("An excerpt."));
        assert!(posts[1].description.is_none());
    }

    #[tokio::test]
    async fn test_discover_short_page_stops_pagination() {
        let stub = StubFetcher::new().page(
            "https://example.net/wp-json/wp/v2/posts?per_page=100&page=1",
            PAGE_ONE,
        );

        discover(&stub, "https://example.net").await;
        // three posts < PER_PAGE, so page 2 is never requested
        assert_eq!(stub.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_discover_missing_endpoint_is_empty_not_error() {
        let stub = StubFetcher::new();
        assert!(matches!(
            discover(&stub, "https://example.net").await,
            DiscoveryOutcome::Empty
        ));
    }

    #[tokio::test]
    async fn test_discover_html_error_page_is_empty() {
        let stub = StubFetcher::new().page(
            "https://example.net/wp-json/wp/v2/posts?per_page=100&page=1",
            "<html>404</html>",
        );
        assert!(matches!(
            discover(&stub, "https://example.net").await,
            DiscoveryOutcome::Empty
        ));
    }
}
