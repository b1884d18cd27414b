use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered remote syndication endpoint to be polled.
///
/// `last_fetched_at` is stamped when the feed is *selected* for a poll, not
/// when the poll succeeds, and is monotonically non-decreasing once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedSource {
    pub fn new(name: String, url: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            url,
            last_fetched_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Human label for the last poll attempt, used by the feeds listing.
    pub fn last_fetched_display(&self) -> String {
        match self.last_fetched_at {
            Some(at) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
            None => "never".to_string(),
        }
    }
}
