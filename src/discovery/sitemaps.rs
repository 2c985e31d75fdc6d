//! Sitemap-backed discovery (stages 2 and 3).
//!
//! Stage 2 walks only candidate sitemaps whose path carries a post-only
//! naming hint (contains `post`, does not contain `page`, a convention of
//! WordPress SEO plugins) and takes every location they list at face
//! value.
//!
//! Stage 3 walks every candidate sitemap, then keeps only locations passing
//! the post-pattern classifier, since generic sitemaps mix articles with
//! taxonomy pages, attachments, and static pages.

use crate::fetch::Fetch;
use crate::sitemap;
use crate::urls::is_post_url;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Post-only naming hint for a sitemap URL. Only the path is inspected, so
/// a host like `posts.example.net` does not turn every sitemap post-only.
pub fn looks_like_post_sitemap(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };
    path.contains("post") && !path.contains("page")
}

/// Stage 2: locations of post-hinted sitemaps only.
pub async fn discover_post_sitemaps<F: Fetch>(fetcher: &F, base: &str) -> Vec<String> {
    let candidates = sitemap::candidate_sitemaps(fetcher, base).await;
    let mut visited = HashSet::new();
    let mut urls = Vec::new();

    for candidate in candidates.iter().filter(|c| looks_like_post_sitemap(c)) {
        let locations = sitemap::walk(fetcher, candidate, &mut visited).await;
        debug!(sitemap = %candidate, count = locations.len(), "post sitemap walked");
        urls.extend(locations.into_iter().map(|l| l.loc));
    }

    urls
}

/// Stage 3: every candidate sitemap, filtered through post classification.
pub async fn discover_generic_sitemaps<F: Fetch>(fetcher: &F, base: &str) -> Vec<String> {
    let candidates = sitemap::candidate_sitemaps(fetcher, base).await;
    let mut visited = HashSet::new();
    let mut urls = Vec::new();

    for candidate in &candidates {
        let locations = sitemap::walk(fetcher, candidate, &mut visited).await;
        let before = locations.len();
        let kept: Vec<String> = locations
            .into_iter()
            .map(|l| l.loc)
            .filter(|loc| is_post_url(loc))
            .collect();
        debug!(
            sitemap = %candidate,
            found = before,
            kept = kept.len(),
            "generic sitemap classified"
        );
        urls.extend(kept);
    }

    urls
}
