use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::db::SourceKind;

pub mod formatters;

#[derive(Parser, Debug)]
#[command(name = "stockwatch")]
#[command(version, about = "Track ticker mentions on Reddit and HotCopper")]
#[command(
    long_about = "Crawl r/ausstocks and the HotCopper post view for posts that mention a watch-listed ticker, and store matched posts with their comments. Each run stops at the first post already stored."
)]
pub struct Cli {
    /// Config file (default: ~/.stockwatch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema
    Init,

    /// Sync the watch-list, crawl every enabled source and store matches
    Run {
        /// Watch-list CSV (overrides config)
        #[arg(long)]
        watchlist: Option<PathBuf>,

        /// Only crawl this source
        #[arg(long, value_enum)]
        only: Option<SourceArg>,

        /// Fetch pages over plain HTTP instead of headless Chrome
        #[arg(long)]
        http: bool,

        /// Write a per-run log file into this directory (overrides config)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Watch-list management
    Tickers {
        #[command(subcommand)]
        action: TickersCommands,
    },

    /// Show stored post and comment counts
    Status {
        /// Number of recent posts to list
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum TickersCommands {
    /// Add symbols from a CSV that are not stored yet
    Sync {
        /// Header-less CSV, symbol in the first column
        file: PathBuf,
    },

    /// List stored tickers in match order
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Reddit,
    Hotcopper,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Reddit => SourceKind::Reddit,
            SourceArg::Hotcopper => SourceKind::HotCopper,
        }
    }
}
