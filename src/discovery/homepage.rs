//! Homepage link scraping (stage 5, last resort).
//!
//! Harvests every same-site hyperlink from the homepage, resolving relative
//! hrefs against the base URL. Links matching the post-path heuristics are
//! preferred; when none match, the full same-site set is returned so a
//! minimal site still produces an index.

use crate::fetch::Fetch;
use crate::urls::{is_post_url, normalize, same_origin};
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Scrape the homepage for candidate post URLs.
pub async fn discover<F: Fetch>(fetcher: &F, base: &str) -> Vec<String> {
    let html = match fetcher.fetch_text(base).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "homepage fetch failed");
            return Vec::new();
        }
    };

    let links = same_site_links(&html, base);
    let post_like: Vec<String> = links
        .iter()
        .filter(|link| is_post_url(link))
        .cloned()
        .collect();

    debug!(
        total = links.len(),
        post_like = post_like.len(),
        "scraped homepage links"
    );

    if post_like.is_empty() { links } else { post_like }
}

/// Collect every `<a href>` on the page that resolves to the site's origin.
/// Sync so the non-`Send` `scraper::Html` never crosses an await point.
fn same_site_links(html: &str, base: &str) -> Vec<String> {
    let Ok(base_url) = Url::parse(&normalize(base)) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href]").unwrap();

    let mut links = Vec::new();
    for element in document.select(&anchor) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
        {
            continue;
        }
        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        let resolved = resolved.to_string();
        if same_origin(&resolved, base) {
            links.push(resolved);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StubFetcher;

    const HOMEPAGE: &str = r##"<html><body>
      <a href="/blog/relative-post">Relative</a>
      <a href="https://example.net/blog/absolute-post">Absolute</a>
      <a href="https://other.net/blog/offsite">Offsite</a>
      <a href="/about">About</a>
      <a href="#top">Anchor</a>
      <a href="mailto:hi@example.net">Mail</a>
    </body></html>"##;

    #[test]
    fn test_same_site_links_resolve_and_filter() {
        let links = same_site_links(HOMEPAGE, "https://example.net");
        assert_eq!(
            links,
            vec![
                "https://example.net/blog/relative-post",
                "https://example.net/blog/absolute-post",
                "https://example.net/about"
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_prefers_post_like_links() {
        let stub = StubFetcher::new().page("https://example.net", HOMEPAGE);
        let urls = discover(&stub, "https://example.net").await;
        assert_eq!(
            urls,
            vec![
                "https://example.net/blog/relative-post",
                "https://example.net/blog/absolute-post"
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_all_same_site_links() {
        let html = r#"<html><body><a href="/about">About</a><a href="/contact">Contact</a></body></html>"#;
        let stub = StubFetcher::new().page("https://example.net", html);
        let urls = discover(&stub, "https://example.net").await;
        assert_eq!(
            urls,
            vec!["https://example.net/about", "https://example.net/contact"]
        );
    }
}
