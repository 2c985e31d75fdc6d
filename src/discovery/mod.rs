//! The URL-discovery cascade.
//!
//! Strategies are tried in priority order; the first one yielding results
//! wins and the rest are never invoked:
//!
//! | Stage | Module | Source | Yields |
//! |-------|--------|--------|--------|
//! | 1 | [`content_api`] | REST post listing | full records |
//! | 2 | [`sitemaps`] | post-hinted sitemaps | URLs, verbatim |
//! | 3 | [`sitemaps`] | all sitemaps + classification | URLs |
//! | 4 | [`feeds`] | RSS/Atom well-known paths | URLs |
//! | 5 | [`homepage`] | same-site link scraping | URLs |
//!
//! Each stage signals inapplicability by returning nothing, never by
//! erroring, so the cascade needs no exception-based control flow.
//! Whatever a stage yields is restricted to the site's origin,
//! insertion-order deduplicated on the normalized form, and capped to bound
//! worst-case work on pathological sitemaps.

pub mod content_api;
pub mod feeds;
pub mod homepage;
pub mod sitemaps;

use crate::fetch::Fetch;
use crate::models::DiscoveryOutcome;
use crate::urls::{normalize, same_origin};
use std::collections::HashSet;
use tracing::{debug, info};

/// Hard ceiling on URLs carried forward out of discovery.
pub const MAX_DISCOVERED_URLS: usize = 2000;

/// Run the cascade and return the first non-empty outcome.
pub async fn discover_posts<F: Fetch>(fetcher: &F, base: &str) -> DiscoveryOutcome {
    let outcome = content_api::discover(fetcher, base).await;
    if !outcome.is_empty() {
        return cap_posts(outcome);
    }
    debug!("content API yielded nothing; trying post sitemaps");

    let urls = restrict(sitemaps::discover_post_sitemaps(fetcher, base).await, base);
    if !urls.is_empty() {
        info!(count = urls.len(), strategy = "post-sitemaps", "discovery succeeded");
        return DiscoveryOutcome::Urls(urls);
    }
    debug!("no post-hinted sitemaps; trying generic sitemaps");

    let urls = restrict(
        sitemaps::discover_generic_sitemaps(fetcher, base).await,
        base,
    );
    if !urls.is_empty() {
        info!(count = urls.len(), strategy = "generic-sitemaps", "discovery succeeded");
        return DiscoveryOutcome::Urls(urls);
    }
    debug!("no sitemap-derived posts; trying feeds");

    let urls = restrict(feeds::discover(fetcher, base).await, base);
    if !urls.is_empty() {
        info!(count = urls.len(), strategy = "feeds", "discovery succeeded");
        return DiscoveryOutcome::Urls(urls);
    }
    debug!("no feeds; trying homepage scraping");

    let urls = restrict(homepage::discover(fetcher, base).await, base);
    if !urls.is_empty() {
        info!(count = urls.len(), strategy = "homepage", "discovery succeeded");
        return DiscoveryOutcome::Urls(urls);
    }

    DiscoveryOutcome::Empty
}

/// Same-origin filter + first-seen-order dedup on normalized form + cap.
fn restrict(raw: Vec<String>, base: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for candidate in raw {
        if !same_origin(&candidate, base) {
            continue;
        }
        let canonical = normalize(&candidate);
        if seen.insert(canonical.clone()) {
            urls.push(canonical);
            if urls.len() >= MAX_DISCOVERED_URLS {
                break;
            }
        }
    }
    urls
}

/// Content-API records get the same origin/dedup/cap treatment.
fn cap_posts(outcome: DiscoveryOutcome) -> DiscoveryOutcome {
    let DiscoveryOutcome::Posts(posts) = outcome else {
        return outcome;
    };
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for post in posts {
        if seen.insert(post.url.clone()) {
            kept.push(post);
            if kept.len() >= MAX_DISCOVERED_URLS {
                break;
            }
        }
    }
    info!(count = kept.len(), strategy = "content-api", "discovery succeeded");
    DiscoveryOutcome::Posts(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StubFetcher;

    const API_PAGE: &str = r#"[{"title": {"rendered": "Hello"},
        "link": "https://example.net/blog/hello",
        "date": "2024-03-01T08:00:00"}]"#;

    #[tokio::test]
    async fn test_stage_one_success_skips_later_stages() {
        let stub = StubFetcher::new()
            .page(
                "https://example.net/wp-json/wp/v2/posts?per_page=100&page=1",
                API_PAGE,
            )
            .page(
                "https://example.net/sitemap.xml",
                "<urlset><url><loc>https://example.net/blog/from-sitemap/</loc></url></urlset>",
            );

        let outcome = discover_posts(&stub, "https://example.net").await;
        assert!(matches!(outcome, DiscoveryOutcome::Posts(ref p) if p.len() == 1));

        // no sitemap, robots, feed, or homepage request was made
        for requested in stub.requested() {
            assert!(
                requested.contains("/wp-json/"),
                "unexpected request to {requested}"
            );
        }
    }

    #[tokio::test]
    async fn test_stage_two_results_returned_verbatim() {
        let stub = StubFetcher::new().page(
            "https://example.net/post-sitemap.xml",
            r#"<urlset>
                <url><loc>https://example.net/whatever/</loc></url>
                <url><loc>https://example.net/blog/post/</loc></url>
            </urlset>"#,
        );

        let outcome = discover_posts(&stub, "https://example.net").await;
        let DiscoveryOutcome::Urls(urls) = outcome else {
            panic!("expected Urls outcome");
        };
        // stage 2 applies no post classification
        assert_eq!(
            urls,
            vec![
                "https://example.net/whatever/",
                "https://example.net/blog/post/"
            ]
        );
    }

    #[tokio::test]
    async fn test_cascade_falls_through_to_feeds() {
        let stub = StubFetcher::new().page(
            "https://example.net/feed",
            r#"<rss><channel>
                <item><link>https://example.net/blog/a/</link></item>
                <item><link>https://example.net/blog/b/</link></item>
            </channel></rss>"#,
        );

        let outcome = discover_posts(&stub, "https://example.net").await;
        let DiscoveryOutcome::Urls(urls) = outcome else {
            panic!("expected Urls outcome");
        };
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn test_everything_empty_yields_empty() {
        let stub = StubFetcher::new();
        assert!(matches!(
            discover_posts(&stub, "https://example.net").await,
            DiscoveryOutcome::Empty
        ));
    }

    #[test]
    fn test_restrict_dedups_in_first_seen_order() {
        let raw = vec![
            "https://example.net/blog/a".to_string(),
            "https://Example.net/blog/a/?utm_source=x".to_string(),
            "https://other.net/blog/b".to_string(),
            "https://example.net/blog/c".to_string(),
        ];
        assert_eq!(
            restrict(raw, "https://example.net"),
            vec!["https://example.net/blog/a/", "https://example.net/blog/c/"]
        );
    }
}
