//! CLI parse: clap types for Articast. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Articast CLI - Batch podcast generation and publishing
#[derive(Parser)]
#[command(name = "articast")]
#[command(about = "Generates and publishes podcast episodes from board-curated articles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one full batch: fetch candidates, generate, publish, report
    Run {
        /// Cap on candidates pulled from the board (default from config)
        #[arg(long)]
        max_items: Option<usize>,
    },
    /// Generate one episode for a URL, outside board candidate selection
    Generate {
        /// Article URL to narrate
        #[arg(long)]
        url: String,

        /// Board item to update with the results
        #[arg(long)]
        item_id: Option<String>,

        /// Resume from an existing notebook instead of creating one
        #[arg(long)]
        notebook_url: Option<String>,

        /// Stop after transcoding; do not upload
        #[arg(long)]
        no_upload: bool,

        /// Skip the upload confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Analyze a URL and print its podcastability verdict
    Score {
        /// Article URL to analyze
        url: String,
    },
    /// Show remaining generation slots and the entries consuming them
    Quota,
}
