use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, TributaryError};
use crate::domain::{FeedSource, Post};
use crate::store::{InsertOutcome, Store};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| TributaryError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

impl Store for SqliteStore {
    fn add_feed(&self, feed: &FeedSource) -> Result<i64> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        conn.execute(
            "INSERT INTO feeds (name, url, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                feed.name,
                feed.url,
                feed.created_at.to_rfc3339(),
                feed.updated_at.to_rfc3339()
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_feed(&self, id: i64) -> Result<Option<FeedSource>> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        let result = conn
            .query_row(
                "SELECT id, name, url, last_fetched_at, created_at, updated_at
                 FROM feeds WHERE id = ?1",
                params![id],
                |row| {
                    Ok(FeedSource {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                        last_fetched_at: row.get::<_, Option<String>>(3)?
                            .and_then(|s| Self::parse_datetime(&s)),
                        created_at: row.get::<_, String>(4)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                        updated_at: row.get::<_, String>(5)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<FeedSource>> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        let result = conn
            .query_row(
                "SELECT id, name, url, last_fetched_at, created_at, updated_at
                 FROM feeds WHERE url = ?1",
                params![url],
                |row| {
                    Ok(FeedSource {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                        last_fetched_at: row.get::<_, Option<String>>(3)?
                            .and_then(|s| Self::parse_datetime(&s)),
                        created_at: row.get::<_, String>(4)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                        updated_at: row.get::<_, String>(5)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn get_all_feeds(&self) -> Result<Vec<FeedSource>> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        let mut stmt = conn.prepare(
            "SELECT id, name, url, last_fetched_at, created_at, updated_at
             FROM feeds ORDER BY name, url",
        )?;

        let feeds = stmt
            .query_map([], |row| {
                Ok(FeedSource {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    url: row.get(2)?,
                    last_fetched_at: row.get::<_, Option<String>>(3)?
                        .and_then(|s| Self::parse_datetime(&s)),
                    created_at: row.get::<_, String>(4)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                    updated_at: row.get::<_, String>(5)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn next_feed_to_poll(&self) -> Result<Option<FeedSource>> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        let result = conn
            .query_row(
                "SELECT id, name, url, last_fetched_at, created_at, updated_at
                 FROM feeds ORDER BY last_fetched_at ASC NULLS FIRST, id ASC LIMIT 1",
                [],
                |row| {
                    Ok(FeedSource {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                        last_fetched_at: row.get::<_, Option<String>>(3)?
                            .and_then(|s| Self::parse_datetime(&s)),
                        created_at: row.get::<_, String>(4)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                        updated_at: row.get::<_, String>(5)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn mark_polled(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        conn.execute(
            "UPDATE feeds SET last_fetched_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id],
        )?;

        Ok(())
    }

    fn insert_post(&self, post: &Post) -> Result<InsertOutcome> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        let result = conn.execute(
            "INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.feed_id,
                post.title,
                post.url,
                post.description,
                post.published_at.map(|dt| dt.to_rfc3339()),
                post.created_at.to_rfc3339(),
                post.updated_at.to_rfc3339()
            ],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            // The only UNIQUE constraint on posts is the url column.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Ok(InsertOutcome::DuplicateUrl)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn recent_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        let mut stmt = conn.prepare(
            "SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
             FROM posts ORDER BY published_at DESC, id DESC LIMIT ?1",
        )?;

        let posts = stmt
            .query_map(params![limit], |row| {
                Ok(Post {
                    id: row.get(0)?,
                    feed_id: row.get(1)?,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    description: row.get(4)?,
                    published_at: row.get::<_, Option<String>>(5)?
                        .and_then(|s| Self::parse_datetime(&s)),
                    created_at: row.get::<_, String>(6)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                    updated_at: row.get::<_, String>(7)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn count_posts_for_feed(&self, feed_id: i64) -> Result<i64> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE feed_id = ?1",
            params![feed_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    fn reset(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| {
            TributaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })?;

        conn.execute("DELETE FROM posts", [])?;
        conn.execute("DELETE FROM feeds", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn feed(name: &str, url: &str) -> FeedSource {
        FeedSource::new(name.into(), url.into())
    }

    fn post(feed_id: i64, url: &str) -> Post {
        let mut p = Post::new(feed_id, "Title".into(), url.into());
        p.published_at = Some(Utc::now());
        p
    }

    #[test]
    fn test_add_and_get_feed() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .add_feed(&feed("Example", "https://example.com/feed.xml"))
            .unwrap();

        let retrieved = store.get_feed(id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Example");
        assert_eq!(retrieved.url, "https://example.com/feed.xml");
        assert!(retrieved.last_fetched_at.is_none());
    }

    #[test]
    fn test_get_feed_by_url() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .add_feed(&feed("Example", "https://example.com/feed.xml"))
            .unwrap();

        let found = store
            .get_feed_by_url("https://example.com/feed.xml")
            .unwrap();
        assert!(found.is_some());

        let missing = store
            .get_feed_by_url("https://example.com/nonexistent.xml")
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_add_feed_duplicate_url_is_error() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .add_feed(&feed("One", "https://example.com/feed.xml"))
            .unwrap();

        let result = store.add_feed(&feed("Two", "https://example.com/feed.xml"));
        assert!(matches!(result, Err(TributaryError::Database(_))));
    }

    #[test]
    fn test_next_feed_to_poll_empty_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.next_feed_to_poll().unwrap().is_none());
    }

    #[test]
    fn test_next_feed_to_poll_prefers_never_fetched() {
        let store = SqliteStore::in_memory().unwrap();
        let a = store.add_feed(&feed("A", "https://a.example/feed")).unwrap();
        let b = store.add_feed(&feed("B", "https://b.example/feed")).unwrap();

        // B was fetched ten minutes ago; A never.
        store
            .mark_polled(b, Utc::now() - Duration::minutes(10))
            .unwrap();

        let next = store.next_feed_to_poll().unwrap().unwrap();
        assert_eq!(next.id, a);
    }

    #[test]
    fn test_next_feed_to_poll_ties_break_by_id() {
        let store = SqliteStore::in_memory().unwrap();
        let a = store.add_feed(&feed("A", "https://a.example/feed")).unwrap();
        store.add_feed(&feed("B", "https://b.example/feed")).unwrap();

        let next = store.next_feed_to_poll().unwrap().unwrap();
        assert_eq!(next.id, a);
    }

    #[test]
    fn test_selection_rotates_by_staleness() {
        let store = SqliteStore::in_memory().unwrap();
        let a = store.add_feed(&feed("A", "https://a.example/feed")).unwrap();
        let b = store.add_feed(&feed("B", "https://b.example/feed")).unwrap();
        store
            .mark_polled(b, Utc::now() - Duration::minutes(10))
            .unwrap();

        // A is unfetched so it goes first; once stamped, B is stalest.
        let first = store.next_feed_to_poll().unwrap().unwrap();
        assert_eq!(first.id, a);
        store.mark_polled(a, Utc::now()).unwrap();

        let second = store.next_feed_to_poll().unwrap().unwrap();
        assert_eq!(second.id, b);
        store.mark_polled(b, Utc::now()).unwrap();

        let third = store.next_feed_to_poll().unwrap().unwrap();
        assert_eq!(third.id, a);
    }

    #[test]
    fn test_mark_polled_advances_timestamp() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .add_feed(&feed("Example", "https://example.com/feed.xml"))
            .unwrap();

        let first = Utc::now() - Duration::minutes(5);
        store.mark_polled(id, first).unwrap();
        let after_first = store.get_feed(id).unwrap().unwrap();
        assert_eq!(
            after_first.last_fetched_at.unwrap().timestamp(),
            first.timestamp()
        );

        let second = Utc::now();
        store.mark_polled(id, second).unwrap();
        let after_second = store.get_feed(id).unwrap().unwrap();
        assert!(after_second.last_fetched_at.unwrap() > after_first.last_fetched_at.unwrap());
        assert!(after_second.updated_at >= after_first.updated_at);
    }

    #[test]
    fn test_insert_post_then_duplicate() {
        let store = SqliteStore::in_memory().unwrap();
        let feed_id = store
            .add_feed(&feed("Example", "https://example.com/feed.xml"))
            .unwrap();

        let p = post(feed_id, "https://example.com/post-1");
        assert_eq!(store.insert_post(&p).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_post(&p).unwrap(), InsertOutcome::DuplicateUrl);

        // Exactly one row survives.
        assert_eq!(store.count_posts_for_feed(feed_id).unwrap(), 1);
    }

    #[test]
    fn test_insert_post_unknown_feed_is_error() {
        let store = SqliteStore::in_memory().unwrap();

        // Foreign key violation must surface as an error, not as a duplicate.
        let result = store.insert_post(&post(999, "https://example.com/post-1"));
        assert!(matches!(result, Err(TributaryError::Database(_))));
    }

    #[test]
    fn test_recent_posts_limit_and_order() {
        let store = SqliteStore::in_memory().unwrap();
        let feed_id = store
            .add_feed(&feed("Example", "https://example.com/feed.xml"))
            .unwrap();

        for i in 0..5 {
            let mut p = post(feed_id, &format!("https://example.com/post-{}", i));
            p.published_at = Some(Utc::now() - Duration::hours(5 - i));
            store.insert_post(&p).unwrap();
        }

        let posts = store.recent_posts(3).unwrap();
        assert_eq!(posts.len(), 3);
        // Newest first.
        assert_eq!(posts[0].url, "https://example.com/post-4");
        assert_eq!(posts[1].url, "https://example.com/post-3");
        assert_eq!(posts[2].url, "https://example.com/post-2");
    }

    #[test]
    fn test_delete_feed_cascades_posts() {
        let store = SqliteStore::in_memory().unwrap();
        let feed_id = store
            .add_feed(&feed("Example", "https://example.com/feed.xml"))
            .unwrap();
        store
            .insert_post(&post(feed_id, "https://example.com/post-1"))
            .unwrap();

        store.delete_feed(feed_id).unwrap();

        assert!(store.get_feed(feed_id).unwrap().is_none());
        assert_eq!(store.count_posts_for_feed(feed_id).unwrap(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = SqliteStore::in_memory().unwrap();
        let feed_id = store
            .add_feed(&feed("Example", "https://example.com/feed.xml"))
            .unwrap();
        store
            .insert_post(&post(feed_id, "https://example.com/post-1"))
            .unwrap();

        store.reset().unwrap();

        assert!(store.get_all_feeds().unwrap().is_empty());
        assert!(store.recent_posts(10).unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tributary.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store
                .add_feed(&feed("Example", "https://example.com/feed.xml"))
                .unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        let feeds = reopened.get_all_feeds().unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/feed.xml");
    }
}
