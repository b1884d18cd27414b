use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted feed item. Created exactly once per distinct URL and never
/// updated afterwards; URL uniqueness is enforced by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(feed_id: i64, title: String, url: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            feed_id,
            title,
            url,
            description: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(untitled)"
        } else {
            &self.title
        }
    }
}
