pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "A feed aggregation poller", long_about = None)]
pub struct Cli {
    /// Database file path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a feed
    Add {
        /// Display name for the feed
        name: String,
        /// URL of the feed to add
        url: String,
    },
    /// Remove a feed and its posts
    Remove {
        /// URL of the feed to remove
        url: String,
    },
    /// List registered feeds
    Feeds,
    /// Show the most recent posts
    Posts {
        /// How many posts to show
        #[arg(short, long, default_value_t = 2)]
        limit: i64,
    },
    /// Poll feeds forever, one per interval
    Poll {
        /// Time between polls (e.g. "1m30s", "1h")
        interval: String,
    },
    /// Delete all feeds and posts
    Reset,
}
