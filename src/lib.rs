//! # Tributary
//!
//! A feed-aggregation poller: register RSS feeds, then let the poller
//! collect new posts on a fixed cadence.
//!
//! ## Architecture
//!
//! One polling cycle flows straight through:
//!
//! ```text
//! Selector → Stamp → Fetcher → Parser → Ingestor
//! ```
//!
//! - the store picks the stalest feed, never-fetched feeds first
//! - the feed is stamped as attempted before the fetch
//! - the body is fetched and parsed as RSS
//! - each item becomes a post, with duplicate URLs tolerated
//!
//! A feed that fails to fetch or parse is logged and skipped; having
//! been stamped, it waits a full rotation before its next attempt.
//! Only a store failure stops the loop.
//!
//! ## Quick Start
//!
//! ```bash
//! # Register a feed
//! tributary add "Rust Blog" https://blog.rust-lang.org/feed.xml
//!
//! # Poll every two minutes, forever
//! tributary poll 2m
//!
//! # Show the latest posts
//! tributary posts --limit 5
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`domain`]: Core domain models (FeedSource, Post)
//! - [`fetcher`]: HTTP fetching
//! - [`parser`]: RSS parsing
//! - [`poller`]: The polling loop and ingestion
//! - [`store`]: Database persistence

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store
/// and the fetcher.
pub mod app;

/// Command-line interface using clap.
///
/// - `add <name> <url>` - Register a feed
/// - `remove <url>` - Remove a feed and its posts
/// - `feeds` - List registered feeds
/// - `posts [--limit N]` - Show recent posts
/// - `poll <interval>` - Run the polling loop
/// - `reset` - Delete all feeds and posts
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/tributary/config.toml`: HTTP timeout,
/// User-Agent, and the database path.
pub mod config;

/// Core domain models.
///
/// - [`FeedSource`](domain::FeedSource): a registered feed and its fetch history
/// - [`Post`](domain::Post): one stored item, unique by URL
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for feed retrieval
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// RSS parsing.
///
/// Fixed-schema RSS 2.0: channel metadata plus items in document
/// order, with HTML entities unescaped in titles and descriptions.
pub mod parser;

/// The polling loop.
///
/// - [`Poller`](poller::Poller): select, stamp, fetch, ingest, repeat
/// - [`IngestReport`](poller::IngestReport): per-batch insert/duplicate/failure counts
pub mod poller;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
