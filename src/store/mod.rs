//! Persistent seen-item store.
//!
//! One append-only `items` table keyed by content identity, plus a small
//! `samples` table marking sites that already received their one-time
//! sample notification. Rows in `items` are never updated or deleted.

pub mod identity;

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::ParsedItem;

pub use identity::identity_of;

/// Schema version applied by [`SeenStore::migrate`].
const SCHEMA_VERSION: i64 = 2;

/// SQLite-backed store owning a single connection for the run.
pub struct SeenStore {
    conn: Connection,
}

impl SeenStore {
    /// Open (or create) the store at the given path and migrate the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 30000;
        "#,
        )?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store. Test use only.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Apply additive schema migrations up to [`SCHEMA_VERSION`].
    ///
    /// Migrations only add tables, indexes or nullable columns; existing
    /// data is never rewritten.
    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS items (
                    id TEXT PRIMARY KEY,
                    url TEXT NOT NULL,
                    title TEXT NOT NULL,
                    published TEXT NOT NULL,
                    updated TEXT NOT NULL,
                    source TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_items_url ON items(url);
                CREATE INDEX IF NOT EXISTS idx_items_source ON items(source);
            "#,
            )?;
        }

        if version < 2 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS samples (
                    source TEXT PRIMARY KEY,
                    sent_at TEXT NOT NULL
                );
            "#,
            )?;
        }

        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        Ok(())
    }

    /// Whether an identity has ever been recorded. No side effects.
    pub fn is_known(&self, id: &str) -> Result<bool> {
        let row = self
            .conn
            .query_row("SELECT 1 FROM items WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(row.is_some())
    }

    /// Record an item under its identity. Idempotent: an existing row is
    /// left untouched.
    pub fn record(&self, item: &ParsedItem, id: &str, source: &str) -> Result<()> {
        self.conn.execute(
            r#"INSERT OR IGNORE INTO items (id, url, title, published, updated, source, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                id,
                item.url,
                item.title,
                item.published,
                item.updated,
                source,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Whether any item has ever been recorded for a source name.
    /// Drives seed-mode detection; independent of the identity scheme.
    pub fn has_any_seen_for(&self, source: &str) -> Result<bool> {
        let row = self
            .conn
            .query_row(
                "SELECT 1 FROM items WHERE source = ?1 LIMIT 1",
                params![source],
                |_| Ok(()),
            )
            .optional()?;
        Ok(row.is_some())
    }

    /// Whether this exact URL has ever been recorded, under any identity.
    pub fn has_seen_url(&self, url: &str) -> Result<bool> {
        let row = self
            .conn
            .query_row(
                "SELECT 1 FROM items WHERE url = ?1 LIMIT 1",
                params![url],
                |_| Ok(()),
            )
            .optional()?;
        Ok(row.is_some())
    }

    /// Whether the one-time sample notification was already sent for a site.
    pub fn sample_sent(&self, source: &str) -> Result<bool> {
        let row = self
            .conn
            .query_row(
                "SELECT 1 FROM samples WHERE source = ?1",
                params![source],
                |_| Ok(()),
            )
            .optional()?;
        Ok(row.is_some())
    }

    /// Mark the one-time sample notification as sent for a site.
    pub fn mark_sample_sent(&self, source: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO samples (source, sent_at) VALUES (?1, ?2)",
            params![source, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
