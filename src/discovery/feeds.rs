//! Syndication-feed discovery (stage 4).
//!
//! Probes the well-known feed paths and extracts item links from both
//! schema families: RSS (`<item><link>text</link>`) and Atom
//! (`<entry><link href="…"/>`). Atom entries may carry several links
//! (`self`, `edit`, …); only `rel="alternate"`, or a link carrying no
//! `rel` at all, names the article page.

use crate::fetch::Fetch;
use crate::utils::site_path;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

const FEED_PATHS: [&str; 5] = ["/feed", "/feed.xml", "/rss.xml", "/atom.xml", "/index.xml"];

/// Probe every well-known feed path and collect item links.
pub async fn discover<F: Fetch>(fetcher: &F, base: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for path in FEED_PATHS {
        let feed_url = site_path(base, path);
        match fetcher.fetch_text(&feed_url).await {
            Ok(xml) => {
                let found = parse_feed(&xml);
                debug!(feed = %feed_url, count = found.len(), "parsed feed");
                urls.extend(found);
            }
            Err(e) => debug!(feed = %feed_url, error = %e, "feed not available"),
        }
    }

    urls
}

/// Extract entry links from an RSS or Atom document.
pub fn parse_feed(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut buf = Vec::new();
    let mut in_item = false;
    let mut in_entry = false;
    let mut in_link = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" => in_item = true,
                b"entry" => in_entry = true,
                b"link" => {
                    in_link = true;
                    if in_entry {
                        if let Some(href) = entry_link_href(&e) {
                            urls.push(href);
                        }
                    }
                }
                _ => {}
            },
            // Atom links are usually self-closing
            Ok(Event::Empty(e)) => {
                if in_entry && e.local_name().as_ref() == b"link" {
                    if let Some(href) = entry_link_href(&e) {
                        urls.push(href);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" => in_item = false,
                b"entry" => in_entry = false,
                b"link" => in_link = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_item && in_link => {
                let link = e.xml_content().unwrap_or_default().trim().to_string();
                if !link.is_empty() {
                    urls.push(link);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "feed parse error; keeping links parsed so far");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    urls
}

/// Read the `href` of an Atom entry link, honoring `rel`.
fn entry_link_href(e: &BytesStart) -> Option<String> {
    let mut href = None;
    let mut is_alternate = true;

    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"href" => href = attr.unescape_value().ok().map(|v| v.trim().to_string()),
            b"rel" => {
                is_alternate = matches!(attr.unescape_value().as_deref(), Ok("alternate"));
            }
            _ => {}
        }
    }

    if is_alternate {
        href.filter(|h| !h.is_empty())
    } else {
        None
    }
}
