// Database module - SQLite connection, schema and the persistence boundary

pub mod models;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::crawl::SeenSet;
use crate::utils::truncate_chars;
pub use models::{ExtractedComment, ExtractedPost, Extraction, SourceKind, StoredPost, Ticker};

// Column limits enforced before every insert.
const POST_TYPE_MAX: usize = 10;
/// Stored URLs are cut to this length; seen-set lookups use the same key.
pub const POST_URL_MAX: usize = 255;
const POST_EXTERNAL_ID_MAX: usize = 20;
const POST_TITLE_MAX: usize = 50;
const POST_SYMBOL_MAX: usize = 10;
const COMMENT_AUTHOR_MAX: usize = 20;
const COMMENT_SYMBOL_MAX: usize = 8;
/// Stored ticker symbols are cut to this length.
pub const TICKER_SYMBOL_MAX: usize = 10;

/// Persistence collaborator used by the run orchestrator.
///
/// String fields may be silently truncated; callers must not rely on
/// long values round-tripping.
pub trait Store {
    fn load_tickers(&self) -> Result<Vec<Ticker>>;
    /// Insert all symbols or none. Returns the number inserted.
    fn save_tickers(&self, symbols: &[String]) -> Result<usize>;
    fn load_seen_urls(&self) -> Result<SeenSet>;
    /// Returns the durable id of the new post.
    fn save_post(&self, post: &ExtractedPost) -> Result<i64>;
    /// Returns the durable id of the new comment.
    fn save_comment(&self, comment: &ExtractedComment, post_id: i64) -> Result<i64>;
}

/// Get the default database path (~/.stockwatch/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let app_dir = PathBuf::from(home).join(".stockwatch");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&app_dir).context("Failed to create .stockwatch directory")?;

    Ok(app_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    apply_schema(&conn)?;

    info!("Database initialized successfully");
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let conn = open_db(path)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])
            .context("Failed to enable foreign keys")?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count_posts(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_comments(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Most recently inserted posts first
    pub fn recent_posts(&self, limit: usize) -> Result<Vec<StoredPost>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, type, url, title, stockname, timestamp
             FROM posts
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(StoredPost {
                id: row.get(0)?,
                source: row.get(1)?,
                url: row.get(2)?,
                title: row.get(3)?,
                ticker_symbol: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }
}

impl Store for SqliteStore {
    fn load_tickers(&self) -> Result<Vec<Ticker>> {
        let mut stmt = self.conn.prepare("SELECT id, stk FROM stock ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Ticker {
                id: row.get(0)?,
                symbol: row.get(1)?,
            })
        })?;
        let mut tickers = Vec::new();
        for row in rows {
            tickers.push(row?);
        }
        Ok(tickers)
    }

    fn save_tickers(&self, symbols: &[String]) -> Result<usize> {
        if symbols.is_empty() {
            return Ok(0);
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to start ticker transaction")?;
        for symbol in symbols {
            tx.execute(
                "INSERT INTO stock (stk) VALUES (?1)",
                params![truncate_chars(symbol, TICKER_SYMBOL_MAX)],
            )
            .with_context(|| format!("Failed to insert ticker {}", symbol))?;
        }
        tx.commit().context("Failed to commit tickers")?;
        Ok(symbols.len())
    }

    fn load_seen_urls(&self) -> Result<SeenSet> {
        let mut stmt = self.conn.prepare("SELECT url FROM posts")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut seen = SeenSet::default();
        for row in rows {
            seen.insert(row?);
        }
        Ok(seen)
    }

    fn save_post(&self, post: &ExtractedPost) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO posts (type, url, post_id, title, description, stockid, stockname)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    truncate_chars(post.source.as_str(), POST_TYPE_MAX),
                    truncate_chars(&post.url, POST_URL_MAX),
                    truncate_chars(&post.external_id, POST_EXTERNAL_ID_MAX),
                    truncate_chars(&post.title, POST_TITLE_MAX),
                    post.description,
                    post.ticker_id,
                    truncate_chars(&post.ticker_symbol, POST_SYMBOL_MAX),
                ],
            )
            .with_context(|| format!("Failed to insert post {}", post.url))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn save_comment(&self, comment: &ExtractedComment, post_id: i64) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO comments (text, author, postid, stockid, stockname)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    comment.text,
                    truncate_chars(&comment.author, COMMENT_AUTHOR_MAX),
                    post_id,
                    comment.ticker_id,
                    truncate_chars(&comment.ticker_symbol, COMMENT_SYMBOL_MAX),
                ],
            )
            .with_context(|| format!("Failed to insert comment for post {}", post_id))?;

        Ok(self.conn.last_insert_rowid())
    }
}

/// Open a store for the given path, creating the schema on first use.
pub fn open_store(path: Option<&Path>) -> Result<SqliteStore> {
    SqliteStore::open(path.map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> SqliteStore {
        SqliteStore::from_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn sample_post(url: &str) -> ExtractedPost {
        ExtractedPost {
            source: SourceKind::Reddit,
            url: url.to_string(),
            external_id: "1abcde".to_string(),
            title: "BHP results".to_string(),
            description: "Strong quarter".to_string(),
            ticker_id: 1,
            ticker_symbol: "BHP".to_string(),
        }
    }

    #[test]
    fn test_tickers_round_trip_in_insertion_order() {
        let store = memory_store();
        let inserted = store
            .save_tickers(&["ZIP".to_string(), "BHP".to_string()])
            .unwrap();
        assert_eq!(inserted, 2);
        let tickers = store.load_tickers().unwrap();
        let symbols: Vec<_> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ZIP", "BHP"]);
        assert!(tickers[0].id < tickers[1].id);
    }

    #[test]
    fn test_save_post_returns_id_and_marks_url_seen() {
        let store = memory_store();
        let id = store.save_post(&sample_post("https://www.reddit.com/r/x/comments/1abcde/t/")).unwrap();
        assert!(id > 0);
        let seen = store.load_seen_urls().unwrap();
        assert!(seen.contains("https://www.reddit.com/r/x/comments/1abcde/t/"));
        assert_eq!(store.count_posts().unwrap(), 1);
    }

    #[test]
    fn test_long_fields_are_truncated() {
        let store = memory_store();
        let mut post = sample_post("https://hotcopper.com.au/threads/x/?post_id=1");
        post.title = "T".repeat(80);
        post.external_id = "9".repeat(30);
        let post_id = store.save_post(&post).unwrap();
        let comment = ExtractedComment {
            text: "fine".to_string(),
            author: "a_very_long_author_name_indeed".to_string(),
            ticker_id: 1,
            ticker_symbol: "LONGSYMBOL".to_string(),
        };
        store.save_comment(&comment, post_id).unwrap();

        let (title, ext): (String, String) = store
            .connection()
            .query_row("SELECT title, post_id FROM posts", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(title.chars().count(), 50);
        assert_eq!(ext.len(), 20);

        let (author, symbol): (String, String) = store
            .connection()
            .query_row("SELECT author, stockname FROM comments", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(author, "a_very_long_author_n");
        assert_eq!(symbol, "LONGSYMB");
    }

    #[test]
    fn test_comment_requires_existing_post() {
        let store = memory_store();
        let comment = ExtractedComment {
            text: "orphan".to_string(),
            author: "nobody".to_string(),
            ticker_id: 1,
            ticker_symbol: "BHP".to_string(),
        };
        assert!(store.save_comment(&comment, 42).is_err());
        assert_eq!(store.count_comments().unwrap(), 0);
    }

    #[test]
    fn test_recent_posts_newest_first() {
        let store = memory_store();
        store.save_post(&sample_post("https://a")).unwrap();
        store.save_post(&sample_post("https://b")).unwrap();
        let recent = store.recent_posts(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].url, "https://b");
        assert_eq!(recent[0].source, "Reddit");
    }
}
