//! CLI argument definitions using clap
//!
//! Commands:
//! - shelfwatch init --config <path>
//! - shelfwatch observe --config <path> --patron <name> [--at <rfc3339>]
//! - shelfwatch unexpected --config <path> [--days N]
//! - shelfwatch missing --config <path> [--days N]
//! - shelfwatch recent-items --config <path> [--days N]
//! - shelfwatch prune --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// shelfwatch - track library checkouts and holds across scrape cycles
#[derive(Parser, Debug)]
#[command(name = "shelfwatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and empty store files
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./shelfwatch.json")]
        config: PathBuf,
    },

    /// Record one scrape cycle read from stdin and detect transitions
    Observe {
        /// Path to configuration file
        #[arg(long, default_value = "./shelfwatch.json")]
        config: PathBuf,

        /// Patron whose cycle this is
        #[arg(long)]
        patron: String,

        /// Cycle timestamp (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// List unexpected transitions, newest first
    Unexpected {
        /// Path to configuration file
        #[arg(long, default_value = "./shelfwatch.json")]
        config: PathBuf,

        /// Window in days; defaults to report_days_back
        #[arg(long)]
        days: Option<u32>,
    },

    /// List unexpected disappearances grouped by patron and cycle
    Missing {
        /// Path to configuration file
        #[arg(long, default_value = "./shelfwatch.json")]
        config: PathBuf,

        /// Window in days; defaults to report_days_back
        #[arg(long)]
        days: Option<u32>,
    },

    /// List item ids seen recently
    RecentItems {
        /// Path to configuration file
        #[arg(long, default_value = "./shelfwatch.json")]
        config: PathBuf,

        /// Window in days; defaults to recent_items_days_back
        #[arg(long)]
        days: Option<u32>,
    },

    /// Apply the configured retention policy
    Prune {
        /// Path to configuration file
        #[arg(long, default_value = "./shelfwatch.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
