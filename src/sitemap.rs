//! Sitemap fetching, parsing, and cycle-guarded tree walking.
//!
//! Sitemaps come in two shapes: an *index* (`<sitemapindex>` listing child
//! sitemaps) and a *urlset* (`<urlset>` listing page locations, each with an
//! optional `<lastmod>`). [`walk`] resolves an index tree into a flat list
//! of locations, guarding against cyclic references with a visited set.
//!
//! A fetch or parse failure for any single sitemap contributes zero
//! locations; one broken sitemap never aborts discovery of the rest.

use crate::fetch::Fetch;
use crate::urls::normalize;
use crate::utils::site_path;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Well-known sitemap paths probed in addition to robots.txt declarations.
const WELL_KNOWN_SITEMAPS: [&str; 6] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml",
    "/post-sitemap.xml",
    "/sitemap.xml.gz",
];

/// One `<url>` entry from a urlset.
#[derive(Debug, Clone)]
pub struct SitemapLocation {
    pub loc: String,
    pub lastmod: Option<String>,
}

/// Parse a sitemap index document into its child sitemap URLs.
///
/// Returns empty when the document contains no `<sitemap>` entries, the
/// signal that it is not an index. Malformed XML also yields empty.
pub fn parse_index(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut children = Vec::new();
    let mut buf = Vec::new();
    let mut in_sitemap = false;
    let mut in_loc = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemap" => in_sitemap = true,
                b"loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"sitemap" => in_sitemap = false,
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_sitemap && in_loc => {
                let loc = e.xml_content().unwrap_or_default().trim().to_string();
                if !loc.is_empty() {
                    children.push(loc);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "sitemap index parse error; treating as empty");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    children
}

/// Parse a urlset document into its location entries.
///
/// Every `<url>` block yields its `<loc>` plus the optional `<lastmod>`.
/// When the document carries no `<url>` blocks at all, any bare `<loc>`
/// references outside index entries are harvested instead, so slightly
/// malformed sitemaps still contribute URLs.
pub fn parse_urlset(xml: &str) -> Vec<SitemapLocation> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut bare_locs = Vec::new();
    let mut buf = Vec::new();

    let mut in_url = false;
    let mut in_sitemap = false;
    let mut current_tag = Vec::new();
    let mut current_loc = String::new();
    let mut current_lastmod = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => {
                    in_url = true;
                    current_tag.clear();
                    current_loc.clear();
                    current_lastmod.clear();
                }
                b"sitemap" => {
                    in_sitemap = true;
                    current_tag.clear();
                }
                // the qualified name, so a namespaced <image:loc> inside a
                // <url> block never shadows the page <loc>
                _ => current_tag = e.name().as_ref().to_vec(),
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" if in_url => {
                    if !current_loc.is_empty() {
                        entries.push(SitemapLocation {
                            loc: current_loc.clone(),
                            lastmod: (!current_lastmod.is_empty())
                                .then(|| current_lastmod.clone()),
                        });
                    }
                    in_url = false;
                }
                b"sitemap" => in_sitemap = false,
                _ => current_tag.clear(),
            },
            Ok(Event::Text(e)) if current_tag == b"loc" => {
                let text = e.xml_content().unwrap_or_default().trim().to_string();
                if !text.is_empty() {
                    if in_url {
                        current_loc = text;
                    } else if !in_sitemap {
                        bare_locs.push(text);
                    }
                }
            }
            Ok(Event::Text(e)) if in_url && current_tag == b"lastmod" => {
                current_lastmod = e.xml_content().unwrap_or_default().trim().to_string();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "urlset parse error; keeping entries parsed so far");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if entries.is_empty() {
        return bare_locs
            .into_iter()
            .map(|loc| SitemapLocation { loc, lastmod: None })
            .collect();
    }
    entries
}

/// Fetch `url` and return its child sitemaps, or empty when it is not an
/// index (or the fetch failed).
pub async fn expand_index<F: Fetch>(fetcher: &F, url: &str) -> Vec<String> {
    match fetcher.fetch_maybe_compressed(url).await {
        Ok(xml) => parse_index(&xml),
        Err(e) => {
            warn!(%url, error = %e, "sitemap fetch failed; skipping");
            Vec::new()
        }
    }
}

/// Fetch `url` and return its location entries, or empty on failure.
pub async fn collect_locations<F: Fetch>(fetcher: &F, url: &str) -> Vec<SitemapLocation> {
    match fetcher.fetch_maybe_compressed(url).await {
        Ok(xml) => parse_urlset(&xml),
        Err(e) => {
            warn!(%url, error = %e, "sitemap fetch failed; skipping");
            Vec::new()
        }
    }
}

/// Walk a sitemap tree rooted at `url`, expanding index entries recursively
/// and concatenating every urlset's locations, in document order.
///
/// `visited` holds normalized sitemap URLs already walked; a sitemap that
/// references itself (directly or through a cycle) is fetched once and then
/// skipped, so walking always terminates. Callers share one visited set
/// across multiple roots to avoid re-fetching common children.
pub async fn walk<F: Fetch>(
    fetcher: &F,
    url: &str,
    visited: &mut HashSet<String>,
) -> Vec<SitemapLocation> {
    let mut locations = Vec::new();
    let mut stack = vec![url.to_string()];

    while let Some(current) = stack.pop() {
        if !visited.insert(normalize(&current)) {
            debug!(url = %current, "sitemap already visited; cycle guard");
            continue;
        }

        let xml = match fetcher.fetch_maybe_compressed(&current).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(url = %current, error = %e, "sitemap fetch failed; skipping");
                continue;
            }
        };

        let children = parse_index(&xml);
        if !children.is_empty() {
            debug!(url = %current, count = children.len(), "expanding sitemap index");
            // pushed in reverse so the stack pops in document order
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        } else {
            let mut found = parse_urlset(&xml);
            debug!(url = %current, count = found.len(), "collected sitemap locations");
            locations.append(&mut found);
        }
    }

    locations
}

/// Enumerate candidate sitemap URLs for a site: the well-known paths plus
/// any `Sitemap:` directives declared in robots.txt, deduplicated in order.
pub async fn candidate_sitemaps<F: Fetch>(fetcher: &F, base: &str) -> Vec<String> {
    let mut candidates: Vec<String> = WELL_KNOWN_SITEMAPS
        .iter()
        .map(|path| site_path(base, path))
        .collect();

    match fetcher.fetch_text(&site_path(base, "/robots.txt")).await {
        Ok(robots) => candidates.extend(sitemaps_from_robots(&robots)),
        Err(e) => debug!(error = %e, "no robots.txt sitemap declarations"),
    }

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(normalize(c)));
    candidates
}

/// Pull `Sitemap:` directive values out of a robots.txt body.
fn sitemaps_from_robots(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let (key, value) = line.trim().split_once(':')?;
            if key.trim().eq_ignore_ascii_case("sitemap") {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Build the lastmod lookup table: normalized page URL → lastmod string.
///
/// Walks every candidate sitemap once (shared visited set) and keeps the
/// first lastmod seen per URL. Used by the aggregator to backfill dates for
/// posts whose pages carry no published-time metadata.
pub async fn lastmod_index<F: Fetch>(fetcher: &F, base: &str) -> HashMap<String, String> {
    let mut visited = HashSet::new();
    let mut map = HashMap::new();

    for sitemap in candidate_sitemaps(fetcher, base).await {
        for location in walk(fetcher, &sitemap, &mut visited).await {
            if let Some(lastmod) = location.lastmod {
                map.entry(normalize(&location.loc)).or_insert(lastmod);
            }
        }
    }

    debug!(count = map.len(), "built lastmod lookup table");
    map
}
