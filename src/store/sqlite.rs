use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, WatchpostError};
use crate::domain::Article;
use crate::store::Store;

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

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| WatchpostError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            WatchpostError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn row_to_article(row: &Row<'_>) -> rusqlite::Result<Article> {
        Ok(Article {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            author: row.get(3)?,
            category: row.get(4)?,
            posted_at: row.get(5)?,
            notified: row.get::<_, i32>(6)? != 0,
            first_seen_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }
}

const ARTICLE_COLUMNS: &str =
    "id, title, url, author, category, posted_at, notified, first_seen_at";

impl Store for SqliteStore {
    fn article_exists(&self, url: &str) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn save_article(&self, article: &Article) -> Result<i64> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO articles (title, url, author, category, posted_at, notified, first_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                article.title,
                article.url,
                article.author,
                article.category,
                article.posted_at,
                article.notified as i32,
                article.first_seen_at.to_rfc3339()
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn mark_notified(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE articles SET notified = 1 WHERE id = ?1",
            params![id],
        )?;

        Ok(())
    }

    fn get_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE url = ?1"),
                params![url],
                Self::row_to_article,
            )
            .optional()?;

        Ok(result)
    }

    fn recent_articles(&self, limit: usize) -> Result<Vec<Article>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY id DESC LIMIT ?1"
        ))?;

        let articles = stmt
            .query_map(params![limit as i64], Self::row_to_article)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(articles)
    }

    fn unnotified_articles(&self) -> Result<Vec<Article>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE notified = 0 ORDER BY id"
        ))?;

        let articles = stmt
            .query_map([], Self::row_to_article)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(articles)
    }

    fn count_articles(&self) -> Result<i64> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;

        Ok(count)
    }
}
