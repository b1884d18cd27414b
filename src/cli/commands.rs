use url::Url;

use crate::app::{AppContext, Result, TributaryError};
use crate::domain::FeedSource;
use crate::poller::{parse_interval, Poller};
use crate::store::Store;

pub fn add_feed(ctx: &AppContext, name: &str, url: &str) -> Result<()> {
    // Reject anything that could never be fetched before touching the store.
    Url::parse(url)?;

    if ctx.store.get_feed_by_url(url)?.is_some() {
        println!("Feed already exists: {}", url);
        return Ok(());
    }

    let feed = FeedSource::new(name.to_string(), url.to_string());
    ctx.store.add_feed(&feed)?;
    println!("Added feed: {} ({})", name, url);

    Ok(())
}

pub fn remove_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| TributaryError::FeedNotFound(url.to_string()))?;

    ctx.store.delete_feed(feed.id)?;
    println!("Removed feed: {}", url);
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let count = ctx.store.count_posts_for_feed(feed.id)?;
        println!(
            "{} ({} posts, last fetched {})\n  {}",
            feed.name,
            count,
            feed.last_fetched_display(),
            feed.url
        );
    }

    Ok(())
}

pub fn list_posts(ctx: &AppContext, limit: i64) -> Result<()> {
    let posts = ctx.store.recent_posts(limit)?;

    if posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in posts {
        let date = post
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "          ".to_string());

        println!("{} {}\n  {}", date, post.display_title(), post.url);
        if let Some(ref description) = post.description {
            println!("  {}", description);
        }
    }

    Ok(())
}

pub async fn poll(ctx: &AppContext, interval: &str) -> Result<()> {
    let every = parse_interval(interval)?;
    let poller = Poller::new(ctx.store.clone(), ctx.fetcher.clone(), every);
    poller.run().await
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    ctx.store.reset()?;
    println!("Database reset");
    Ok(())
}
