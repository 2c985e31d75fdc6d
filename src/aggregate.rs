//! Aggregation: fan out metadata extraction, merge, sort, and group.
//!
//! The only concurrent phase of the pipeline. Extraction tasks are
//! independent (they share nothing but the read-only fetch client) and
//! join completion-ordered through `buffer_unordered`; results are indexed
//! by submission order before merging so deduplication stays deterministic,
//! and presentation order comes solely from the explicit sort/group below.

use crate::extract;
use crate::fetch::Fetch;
use crate::models::{DiscoveryOutcome, PostRecord};
use crate::urls::{normalize, year_from_path};
use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

/// Turn a discovery outcome into the final, merged post collection.
///
/// `Urls` outcomes go through bounded concurrent extraction (`fan_out`
/// workers); `Posts` outcomes from the content API skip extraction. Either
/// way the merge step deduplicates by canonical URL (first-seen wins) and
/// backfills missing dates from the sitemap lastmod table.
pub async fn build_post_records<F: Fetch + Sync>(
    fetcher: &F,
    outcome: DiscoveryOutcome,
    fan_out: usize,
    lastmod_by_url: &HashMap<String, String>,
) -> Vec<PostRecord> {
    let records = match outcome {
        DiscoveryOutcome::Posts(posts) => posts,
        DiscoveryOutcome::Urls(urls) => {
            let total = urls.len();
            info!(total, fan_out, "extracting metadata");

            let mut indexed: Vec<(usize, PostRecord)> = stream::iter(urls.into_iter().enumerate())
                .map(|(i, url)| async move {
                    let meta = extract::extract(fetcher, &url).await;
                    (
                        i,
                        PostRecord {
                            title: meta.title,
                            url: meta.canonical,
                            published: meta.published,
                            description: meta.description,
                        },
                    )
                })
                .buffer_unordered(fan_out.max(1))
                .collect()
                .await;

            // completion-ordered join; restore submission order for the
            // first-seen-wins merge
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, record)| record).collect()
        }
        DiscoveryOutcome::Empty => Vec::new(),
    };

    merge(records, lastmod_by_url)
}

/// Deduplicate by canonical URL and backfill missing publication dates.
fn merge(records: Vec<PostRecord>, lastmod_by_url: &HashMap<String, String>) -> Vec<PostRecord> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for mut record in records {
        let canonical = normalize(&record.url);
        if !seen.insert(canonical.clone()) {
            continue;
        }
        if record.published.is_none() {
            record.published = lastmod_by_url.get(&canonical).cloned();
        }
        record.url = canonical;
        merged.push(record);
    }

    info!(count = merged.len(), "merged post records");
    merged
}

/// Parse the leading date out of a lenient timestamp string: full RFC-3339,
/// a `YYYY-MM-DDTHH:MM:SS` local timestamp, or a bare `YYYY-MM-DD`.
pub fn parse_post_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

fn effective_date(record: &PostRecord) -> Option<NaiveDate> {
    parse_post_date(record.published.as_deref()?)
}

/// Sort descending by effective date. Dateless records sink to the bottom
/// (sentinel earliest date); the sort is stable, so first-seen order
/// survives ties.
pub fn sort_posts(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| {
        let da = effective_date(a).unwrap_or(NaiveDate::MIN);
        let db = effective_date(b).unwrap_or(NaiveDate::MIN);
        db.cmp(&da)
    });
}

/// Year bucket for a record: publication year, else a year-like path
/// segment, else `None` (the "Other" bucket).
pub fn year_of(record: &PostRecord) -> Option<String> {
    effective_date(record)
        .map(|d| d.year().to_string())
        .or_else(|| year_from_path(&record.url))
}

/// Group records into year buckets, newest year first, "Other" last.
/// Within a bucket the input order (already sorted) is preserved.
pub fn group_by_year(posts: &[PostRecord]) -> Vec<(String, Vec<PostRecord>)> {
    let mut by_year: BTreeMap<String, Vec<PostRecord>> = BTreeMap::new();
    let mut other = Vec::new();

    for post in posts {
        match year_of(post) {
            Some(year) => by_year.entry(year).or_default().push(post.clone()),
            None => other.push(post.clone()),
        }
    }

    let mut groups: Vec<(String, Vec<PostRecord>)> = by_year.into_iter().rev().collect();
    if !other.is_empty() {
        groups.push(("Other".to_string(), other));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery;
    use crate::fetch::StubFetcher;
    use crate::models::DiscoveryOutcome;
    use crate::sitemap;

    fn record(url: &str, published: Option<&str>) -> PostRecord {
        PostRecord {
            title: url.to_string(),
            url: url.to_string(),
            published: published.map(str::to_string),
            description: None,
        }
    }

    #[test]
    fn test_parse_post_date() {
        assert_eq!(
            parse_post_date("2024-03-01T08:00:00+00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_post_date("2024-03-01T08:00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_post_date("2024-03-01"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_post_date("soonish"), None);
    }

    #[tokio::test]
    async fn test_merge_keeps_first_encountered_metadata() {
        // two candidates normalize identically but carry different titles
        let records = vec![
            PostRecord {
                title: "Kept".into(),
                url: "https://example.net/blog/a".into(),
                published: None,
                description: Some("first".into()),
            },
            PostRecord {
                title: "Dropped".into(),
                url: "https://example.net/blog/a/?utm_source=x".into(),
                published: Some("2024-01-01".into()),
                description: None,
            },
        ];

        let stub = StubFetcher::new();
        let merged = build_post_records(
            &stub,
            DiscoveryOutcome::Posts(records),
            4,
            &HashMap::new(),
        )
        .await;

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "Kept");
        assert_eq!(merged[0].url, "https://example.net/blog/a/");
        assert_eq!(merged[0].description.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_merge_backfills_lastmod() {
        let mut lastmod = HashMap::new();
        lastmod.insert(
            "https://example.net/blog/a/".to_string(),
            "2023-06-01".to_string(),
        );

        let stub = StubFetcher::new();
        let merged = build_post_records(
            &stub,
            DiscoveryOutcome::Posts(vec![record("https://example.net/blog/a", None)]),
            4,
            &lastmod,
        )
        .await;

        assert_eq!(merged[0].published.as_deref(), Some("2023-06-01"));
    }

    #[test]
    fn test_sort_posts_descending_with_dateless_last() {
        let mut posts = vec![
            record("https://example.net/old/", Some("2020-01-01")),
            record("https://example.net/undated/", None),
            record("https://example.net/new/", Some("2024-06-01")),
        ];
        sort_posts(&mut posts);
        let urls: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.net/new/",
                "https://example.net/old/",
                "https://example.net/undated/"
            ]
        );
    }

    #[test]
    fn test_group_by_year_with_path_fallback_and_other() {
        let posts = vec![
            record("https://example.net/a/", Some("2024-06-01")),
            record("https://example.net/2023/11/b/", None),
            record("https://example.net/undatable/", None),
            record("https://example.net/c/", Some("2024-01-01")),
        ];
        let groups = group_by_year(&posts);
        let labels: Vec<&str> = groups.iter().map(|(y, _)| y.as_str()).collect();
        assert_eq!(labels, vec!["2024", "2023", "Other"]);
        assert_eq!(groups[0].1.len(), 2);
    }

    /// Base exposes a sitemap index referencing a post sitemap with three
    /// dated locations; two pages carry open-graph metadata, the third
    /// fetch fails. Expect three records, one degraded, all carrying the
    /// sitemap lastmod as published date, in a single year bucket.
    #[tokio::test]
    async fn test_end_to_end_sitemap_site_with_one_broken_page() {
        let index = r#"<sitemapindex>
            <sitemap><loc>https://example.net/wp-post-map.xml</loc></sitemap>
        </sitemapindex>"#;
        let urlset = r#"<urlset>
            <url><loc>https://example.net/blog/one/</loc><lastmod>2024-02-01</lastmod></url>
            <url><loc>https://example.net/blog/two/</loc><lastmod>2024-03-01</lastmod></url>
            <url><loc>https://example.net/blog/three/</loc><lastmod>2024-04-01</lastmod></url>
        </urlset>"#;
        let page = |title: &str| {
            format!(
                r#"<html><head>
                    <meta property="og:title" content="{title}">
                    <meta property="og:description" content="About {title}.">
                </head></html>"#
            )
        };

        let stub = StubFetcher::new()
            .page("https://example.net/sitemap_index.xml", index)
            .page("https://example.net/wp-post-map.xml", urlset)
            .page("https://example.net/blog/one/", &page("One"))
            .page("https://example.net/blog/two/", &page("Two"));
        // blog/three 404s

        let outcome = discovery::discover_posts(&stub, "https://example.net").await;
        let lastmod = sitemap::lastmod_index(&stub, "https://example.net").await;
        let mut posts = build_post_records(&stub, outcome, 4, &lastmod).await;
        sort_posts(&mut posts);

        assert_eq!(posts.len(), 3);
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        // newest first; the broken page degrades to its URL as title
        assert_eq!(
            titles,
            vec!["https://example.net/blog/three/", "Two", "One"]
        );
        for post in &posts {
            assert!(post.published.is_some(), "lastmod backfill missing");
        }

        let groups = group_by_year(&posts);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "2024");
        assert_eq!(groups[0].1.len(), 3);
    }

    /// No sitemaps, no content API, no robots, but /feed has two items.
    #[tokio::test]
    async fn test_end_to_end_feed_only_site() {
        let stub = StubFetcher::new().page(
            "https://example.net/feed",
            r#"<rss><channel>
                <item><link>https://example.net/p/alpha</link></item>
                <item><link>https://example.net/p/beta</link></item>
            </channel></rss>"#,
        );

        let outcome = discovery::discover_posts(&stub, "https://example.net").await;
        let lastmod = sitemap::lastmod_index(&stub, "https://example.net").await;
        let posts = build_post_records(&stub, outcome, 4, &lastmod).await;

        assert_eq!(posts.len(), 2);
        // degraded records: pages are unreachable, URL stands in for title
        assert_eq!(posts[0].title, "https://example.net/p/alpha/");
        let groups = group_by_year(&posts);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "Other");
    }
}
