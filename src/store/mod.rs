pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{FeedSource, Post};

pub use sqlite::SqliteStore;

/// Outcome of a post insertion. A URL collision means the item was already
/// ingested on an earlier poll; it is an expected result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateUrl,
}

pub trait Store {
    // Feed operations
    fn add_feed(&self, feed: &FeedSource) -> Result<i64>;
    fn get_feed(&self, id: i64) -> Result<Option<FeedSource>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<FeedSource>>;
    fn get_all_feeds(&self) -> Result<Vec<FeedSource>>;
    fn delete_feed(&self, id: i64) -> Result<()>;

    // Polling operations
    /// The next source to poll: never-fetched feeds first, then the
    /// least-recently-fetched, ties broken by ascending id.
    fn next_feed_to_poll(&self) -> Result<Option<FeedSource>>;
    /// Stamp a feed as attempted. Called by the scheduler immediately after
    /// selection, before the fetch.
    fn mark_polled(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    // Post operations
    fn insert_post(&self, post: &Post) -> Result<InsertOutcome>;
    fn recent_posts(&self, limit: i64) -> Result<Vec<Post>>;
    fn count_posts_for_feed(&self, feed_id: i64) -> Result<i64>;

    // Maintenance
    fn reset(&self) -> Result<()>;
}
