//! SQLite-backed content catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::types::{strip_tag, tag_title};
use super::{CatalogError, ContentCatalog, MediaItem};

/// SQLite-backed content catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS media_items (
                source_url TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                remote_ref TEXT,
                in_progress INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_media_items_in_progress ON media_items(in_progress);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load_title(conn: &Connection, source_url: &str) -> Result<String, CatalogError> {
        conn.query_row(
            "SELECT title FROM media_items WHERE source_url = ?",
            params![source_url],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| CatalogError::NotFound(source_url.to_string()))
    }
}

impl ContentCatalog for SqliteCatalog {
    fn upsert_item(&self, source_url: &str, title: &str) -> Result<(), CatalogError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO media_items (source_url, title, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(source_url) DO UPDATE SET title = excluded.title, updated_at = excluded.updated_at",
            params![source_url, title, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn mark_in_progress(&self, source_url: &str) -> Result<(), CatalogError> {
        let conn = self.lock();
        let title = Self::load_title(&conn, source_url)?;

        conn.execute(
            "UPDATE media_items SET title = ?, in_progress = 1, updated_at = ? WHERE source_url = ?",
            params![tag_title(&title), Utc::now().to_rfc3339(), source_url],
        )?;
        debug!("Marked {} as in progress", source_url);
        Ok(())
    }

    fn record_published(&self, source_url: &str, remote_ref: &str) -> Result<(), CatalogError> {
        let conn = self.lock();
        let title = Self::load_title(&conn, source_url)?;

        conn.execute(
            "UPDATE media_items SET title = ?, remote_ref = ?, in_progress = 0, updated_at = ?
             WHERE source_url = ?",
            params![
                strip_tag(&title),
                remote_ref,
                Utc::now().to_rfc3339(),
                source_url
            ],
        )?;
        debug!("Recorded {} for {}", remote_ref, source_url);
        Ok(())
    }

    fn get_item(&self, source_url: &str) -> Result<MediaItem, CatalogError> {
        let conn = self.lock();
        conn.query_row(
            "SELECT source_url, title, remote_ref, in_progress, updated_at
             FROM media_items WHERE source_url = ?",
            params![source_url],
            |row| {
                let updated_at_str: String = row.get(4)?;
                let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                Ok(MediaItem {
                    source_url: row.get(0)?,
                    title: row.get(1)?,
                    remote_ref: row.get(2)?,
                    in_progress: row.get::<_, i64>(3)? != 0,
                    updated_at,
                })
            },
        )
        .optional()?
        .ok_or_else(|| CatalogError::NotFound(source_url.to_string()))
    }
}
