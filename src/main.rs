//! # backlink_index
//!
//! Discovers every post published on a single website and regenerates a
//! Markdown index document linking to them, grouped by year with titles,
//! dates, and short descriptions. Intended to run on a schedule so the
//! backlink/discovery index stays current.
//!
//! ## Usage
//!
//! ```sh
//! backlink_index -b https://example.net -o README.md
//! ```
//!
//! ## Architecture
//!
//! The application is a one-way pipeline:
//! 1. **Discovery**: a cascade of strategies (content API, post-only
//!    sitemaps, generic sitemaps with classification, feeds, homepage
//!    scraping), stopping at the first that yields results
//! 2. **Extraction**: per-page metadata (title, description, published
//!    date, canonical URL), fetched concurrently with a bounded fan-out
//! 3. **Aggregation**: dedup by canonical URL, sitemap-lastmod date
//!    backfill, sort and year grouping
//! 4. **Output**: one Markdown document, rewritten in full
//!
//! ## Exit codes
//!
//! - `0`: at least one post discovered and the document written
//! - `2`: zero posts discovered by every strategy (nothing is written)
//! - `3`: unhandled transport-level error
//! - `1`: any other failure

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod discovery;
mod extract;
mod fetch;
mod models;
mod outputs;
mod sitemap;
mod urls;
mod utils;

use cli::Cli;
use fetch::{Fetch, FetchClient, FetchError};
use urls::normalize;

/// Top-level failure taxonomy, mapped one-to-one onto exit codes.
#[derive(Debug, Error)]
enum RunError {
    #[error("no posts discovered by any strategy")]
    NoPostsFound,
    #[error(transparent)]
    Transport(#[from] FetchError),
    #[error("failed to write output document: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    info!(base = %args.base_url, output = %args.output, "backlink_index starting up");

    match run(&args).await {
        Ok(count) => {
            let elapsed = start_time.elapsed();
            info!(count, secs = elapsed.as_secs(), "index regenerated");
            ExitCode::SUCCESS
        }
        Err(e @ RunError::NoPostsFound) => {
            error!(error = %e, "the site may expose no sitemap, feed, or API");
            ExitCode::from(2)
        }
        Err(e @ RunError::Transport(_)) => {
            error!(error = %e, "transport failure");
            ExitCode::from(3)
        }
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::from(1)
        }
    }
}

async fn run(args: &Cli) -> Result<usize, RunError> {
    let client = FetchClient::new(Duration::from_secs(args.timeout_secs))?;
    execute(&client, args).await
}

/// The whole pipeline: discover, extract, aggregate, render, write.
///
/// Per-document failures (one sitemap, one feed, one page) are contained
/// inside their stages; only total discovery failure or an I/O error on the
/// final write surfaces here. Zero discovered posts aborts before any write,
/// and the document is built fully in memory before the single write, so a
/// previously generated index is never clobbered or left half-written.
async fn execute<F: Fetch + Sync>(fetcher: &F, args: &Cli) -> Result<usize, RunError> {
    let base = normalize(&args.base_url);

    let outcome = discovery::discover_posts(fetcher, &base).await;
    if outcome.is_empty() {
        return Err(RunError::NoPostsFound);
    }
    info!(count = outcome.len(), "discovery complete");

    let lastmod = sitemap::lastmod_index(fetcher, &base).await;
    let mut posts = aggregate::build_post_records(fetcher, outcome, args.fan_out, &lastmod).await;
    aggregate::sort_posts(&mut posts);

    let document = outputs::markdown::build_document(&base, &posts, args.latest);
    tokio::fs::write(&args.output, document).await?;
    info!(path = %args.output, count = posts.len(), "wrote index document");

    Ok(posts.len())
}
