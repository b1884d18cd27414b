use chrono::{DateTime, Utc};

use crate::domain::{FeedSource, Post};
use crate::parser::RawItem;
use crate::store::{InsertOutcome, Store};

/// Counts from one ingestion batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicate: usize,
    pub failed: usize,
}

/// Persist each parsed item as a post, in document order.
///
/// Items fail independently: an unparseable publish date or a store
/// error on one item never stops the rest of the batch. A duplicate
/// URL is counted but is not a failure.
pub fn ingest(store: &dyn Store, feed: &FeedSource, items: &[RawItem]) -> IngestReport {
    let mut report = IngestReport::default();

    for item in items {
        let published_at = match item.pub_date.as_deref().and_then(parse_pub_date) {
            Some(dt) => dt,
            None => {
                tracing::warn!(
                    "Skipping {}: unparseable publish date {:?}",
                    item.link,
                    item.pub_date
                );
                report.failed += 1;
                continue;
            }
        };

        let mut post = Post::new(feed.id, item.title.clone(), item.link.clone());
        post.description = item.description.clone();
        post.published_at = Some(published_at);

        match store.insert_post(&post) {
            Ok(InsertOutcome::Inserted) => report.inserted += 1,
            Ok(InsertOutcome::DuplicateUrl) => {
                tracing::debug!("Already have {}", post.url);
                report.duplicate += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to save {}: {}", post.url, e);
                report.failed += 1;
            }
        }
    }

    report
}

/// Feeds put RFC 2822 dates on the wire ("Mon, 01 Jan 2024 00:00:00 GMT").
/// That one format is the contract; there is no fallback chain.
fn parse_pub_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
