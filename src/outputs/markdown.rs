//! Markdown rendering of the final post collection.
//!
//! Document layout:
//!
//! ```text
//! # example.net backlink index
//!
//! <intro + source lines>
//!
//! Total N posts | Last updated: <UTC>
//!
//! ## Latest        (newest `latest` entries)
//! ## 2025          (one section per year, newest year first)
//! ## Other         (records with no derivable year)
//! ## Notes         (discovery order, regeneration policy)
//! ```
//!
//! Entry lines render as `- [date — ]**title** — (url)[: description]`.

use crate::aggregate::{group_by_year, parse_post_date};
use crate::models::PostRecord;
use chrono::Utc;
use std::fmt::Write;
use url::Url;

/// Render the whole document. `posts` must already be sorted newest-first.
pub fn build_document(base: &str, posts: &[PostRecord], latest: usize) -> String {
    let host = Url::parse(base)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| base.to_string());
    let now = Utc::now().format("%Y-%m-%d %H:%M:%SZ");

    let mut md = String::new();
    writeln!(md, "# {host} backlink index").unwrap();
    writeln!(md).unwrap();
    writeln!(
        md,
        "Automatically generated index of the posts published on `{base}`, \
         kept as a lightweight backlink list for search discovery."
    )
    .unwrap();
    writeln!(md).unwrap();
    writeln!(md, "- Source: `{base}`").unwrap();
    writeln!(md, "- Generated by `backlink_index`; rewritten in full on every run").unwrap();
    writeln!(md).unwrap();
    writeln!(md, "Total {} posts | Last updated: {now}", posts.len()).unwrap();
    writeln!(md).unwrap();

    writeln!(md, "## Latest").unwrap();
    writeln!(md).unwrap();
    for post in posts.iter().take(latest) {
        writeln!(md, "{}", entry_line(post)).unwrap();
    }
    writeln!(md).unwrap();

    for (year, group) in group_by_year(posts) {
        writeln!(md, "## {year}").unwrap();
        writeln!(md).unwrap();
        for post in &group {
            writeln!(md, "{}", entry_line(post)).unwrap();
        }
        writeln!(md).unwrap();
    }

    writeln!(md, "## Notes").unwrap();
    writeln!(md).unwrap();
    writeln!(
        md,
        "- Discovery tries the site's content API first, then post-only \
         sitemaps, generic sitemaps filtered by post heuristics, RSS/Atom \
         feeds, and finally homepage links."
    )
    .unwrap();
    writeln!(
        md,
        "- Posts without an on-page publication date carry the sitemap \
         `lastmod` value instead."
    )
    .unwrap();

    md
}

fn entry_line(post: &PostRecord) -> String {
    let mut line = String::from("- ");
    if let Some(date) = post.published.as_deref().and_then(parse_post_date) {
        write!(line, "{date} — ").unwrap();
    }
    write!(line, "**{}** — ({})", post.title, post.url).unwrap();
    if let Some(description) = &post.description {
        write!(line, ": {description}").unwrap();
    }
    line
}
