//! Command-line interface definitions.
//!
//! All options can be provided via command-line flags; the site and output
//! path can also come from environment variables, which suits scheduled
//! (cron/CI) execution.

use clap::Parser;

/// Command-line arguments for the backlink index generator.
///
/// # Examples
///
/// ```sh
/// # Basic usage
/// backlink_index -b https://example.net -o README.md
///
/// # Wider extraction fan-out, longer per-request timeout
/// backlink_index -b https://example.net -o index.md --fan-out 16 --timeout-secs 30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Base origin of the site to index, e.g. https://example.net
    #[arg(short, long, env = "BACKLINK_BASE_URL")]
    pub base_url: String,

    /// Path of the Markdown index document to regenerate
    #[arg(short, long, env = "BACKLINK_OUTPUT", default_value = "README.md")]
    pub output: String,

    /// Number of entries in the "Latest" section
    #[arg(long, default_value_t = 10)]
    pub latest: usize,

    /// Concurrent metadata-extraction workers
    #[arg(long, default_value_t = 8)]
    pub fan_out: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,
}
