//! Polling loop for registered feeds.
//!
//! Each cycle selects the stalest feed, stamps it as attempted, then
//! fetches and ingests it. One feed per cycle, no overlapping cycles.

pub mod ingest;

pub use ingest::{ingest, IngestReport};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};

use crate::app::{Result, TributaryError};
use crate::fetcher::Fetcher;
use crate::parser;
use crate::store::Store;

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing registered yet; the cycle was a no-op.
    NoFeeds,
    /// The selected feed could not be fetched or parsed. The feed is
    /// already stamped, so it waits a full rotation before a retry.
    FetchFailed,
    /// Items were ingested from the selected feed.
    Ingested(IngestReport),
}

pub struct Poller<S> {
    store: Arc<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    interval: Duration,
}

impl<S: Store + 'static> Poller<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            interval,
        }
    }

    /// Run cycles forever, one per interval tick, starting immediately.
    ///
    /// Only a store failure ends the loop; a feed that cannot be
    /// fetched or parsed is logged and the loop moves on.
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            "Collecting feeds every {}",
            format_interval(self.interval.as_secs())
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            self.run_cycle().await?;
        }
    }

    /// One select, stamp, fetch, ingest pass over a single feed.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let feed = match self.store.next_feed_to_poll()? {
            Some(feed) => feed,
            None => {
                tracing::debug!("No feeds registered, nothing to poll");
                return Ok(CycleOutcome::NoFeeds);
            }
        };

        // A feed counts as attempted the moment it is chosen, so a
        // broken feed cannot be re-selected every cycle and starve the
        // healthy ones.
        self.store.mark_polled(feed.id, Utc::now())?;

        let body = match self.fetcher.fetch(&feed.url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", feed.url, e);
                return Ok(CycleOutcome::FetchFailed);
            }
        };

        let parsed = match parser::parse_feed(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", feed.url, e);
                return Ok(CycleOutcome::FetchFailed);
            }
        };

        let report = ingest(self.store.as_ref(), &feed, &parsed.items);
        tracing::info!(
            "Added {} new posts from {} ({} duplicate, {} failed)",
            report.inserted,
            feed.url,
            report.duplicate,
            report.failed
        );

        Ok(CycleOutcome::Ingested(report))
    }
}

/// Parse a compound interval string like "1m30s", "2h", or "1d".
///
/// Every number needs a unit (d, h, m or s); "90" on its own is
/// rejected rather than guessed at.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err(TributaryError::InvalidInterval("empty interval".into()));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if digits.is_empty() {
                return Err(TributaryError::InvalidInterval(format!(
                    "expected a number before '{}' in '{}'",
                    c, s
                )));
            }
            let value: u64 = digits.parse().map_err(|_| {
                TributaryError::InvalidInterval(format!("invalid number '{}' in '{}'", digits, s))
            })?;
            let unit: u64 = match c {
                'd' => 86400,
                'h' => 3600,
                'm' => 60,
                's' => 1,
                _ => {
                    return Err(TributaryError::InvalidInterval(format!(
                        "unknown unit '{}' in '{}'. Use d, h, m or s",
                        c, s
                    )))
                }
            };
            total += value * unit;
            digits.clear();
        }
    }

    if !digits.is_empty() {
        return Err(TributaryError::InvalidInterval(format!(
            "missing unit after '{}' in '{}'",
            digits, s
        )));
    }
    if total == 0 {
        return Err(TributaryError::InvalidInterval(
            "interval must be positive".into(),
        ));
    }

    Ok(Duration::from_secs(total))
}

/// Format a second count the way intervals are written, e.g. 90 -> "1m30s".
pub fn format_interval(secs: u64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }

    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}d", days));
    }
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 {
        out.push_str(&format!("{}s", seconds));
    }
    out
}
