//! Authoritative document store over SQLite.
//!
//! `docs` is the single source of truth; the dense projection in
//! `doc_embeddings` is derived from it and updated in the same transaction
//! by the ingestion write path. Replacement upserts go through
//! `ON CONFLICT ... DO UPDATE` so a document keeps its rowid (and therefore
//! its insertion-order position) when its text is replaced wholesale.
//!
//! Listing returns documents in reverse insertion order with a 500-character
//! snippet, matching the pagination contract of the serving layer.

use crate::db::migrations;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Longest snippet returned by [`list`], in characters.
const SNIPPET_CHARS: u32 = 500;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Opaque unique identifier, stable across the document's lifetime.
    pub id: String,
    /// Full passage content.
    pub text: String,
    /// Free-form provenance tag, usually the originating filename.
    pub source: Option<String>,
    /// Ingestion wall-clock timestamp in microseconds.
    pub created_at_us: i64,
}

/// One row of a [`list`] page: id, provenance, and a truncated preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocSummary {
    pub id: String,
    pub source: Option<String>,
    pub snippet: String,
}

/// A page of documents plus the total corpus size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocPage {
    pub total: u64,
    pub items: Vec<DocSummary>,
}

/// Handle owning the store's SQLite connection.
///
/// Construction opens (or creates) the database file and applies pending
/// migrations; dropping the handle closes the connection. All access to the
/// backing database goes through this handle — there is no ambient global
/// connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the store at `path`, creating the file and schema as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the
    /// database cannot be opened, or a migration fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create store directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store database {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (tests, throwaway corpora).
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot create the in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .context("failed to enable foreign keys")?;
        migrations::migrate(&mut conn).context("failed to apply store migrations")?;
        Ok(Self { conn })
    }

    /// Shared access to the underlying connection for read paths.
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Exclusive access for transactional write paths.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Consume the handle and return the raw connection.
    #[must_use]
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

/// Insert or replace a document, returning its id.
///
/// A fresh UUID is generated when `id` is omitted. Re-upserting an existing
/// id replaces text and source wholesale but keeps the original rowid and
/// `created_at_us`, so insertion order is stable across replacement.
/// Idempotent: repeating the same call leaves exactly one row.
///
/// Callers that also write the dense projection must run both writes inside
/// one transaction (the connection handed in may be a `Transaction`, which
/// derefs to `Connection`).
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn upsert(
    conn: &Connection,
    id: Option<&str>,
    text: &str,
    source: Option<&str>,
) -> Result<String> {
    let doc_id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
    let now_us = chrono::Utc::now().timestamp_micros();

    conn.execute(
        "INSERT INTO docs (doc_id, text, source, created_at_us)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(doc_id) DO UPDATE SET
             text = excluded.text,
             source = excluded.source",
        params![doc_id, text, source, now_us],
    )
    .with_context(|| format!("failed to upsert document {doc_id}"))?;

    Ok(doc_id)
}

/// Fetch one document by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get(conn: &Connection, id: &str) -> Result<Option<Document>> {
    conn.query_row(
        "SELECT doc_id, text, source, created_at_us FROM docs WHERE doc_id = ?1",
        params![id],
        |row| {
            Ok(Document {
                id: row.get(0)?,
                text: row.get(1)?,
                source: row.get(2)?,
                created_at_us: row.get(3)?,
            })
        },
    )
    .optional()
    .with_context(|| format!("failed to read document {id}"))
}

/// Number of distinct documents currently stored.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM docs", [], |row| row.get(0))
        .context("failed to count documents")?;
    Ok(u64::try_from(n).unwrap_or(0))
}

/// Number of rows in the dense projection.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_embeddings(conn: &Connection) -> Result<u64> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM doc_embeddings", [], |row| row.get(0))
        .context("failed to count embeddings")?;
    Ok(u64::try_from(n).unwrap_or(0))
}

/// Page through documents in reverse insertion order.
///
/// Out-of-bounds `offset`/`limit` yield an empty page, never an error.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn list(conn: &Connection, offset: u64, limit: u64) -> Result<DocPage> {
    let total = count(conn)?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);

    let mut stmt = conn
        .prepare(
            "SELECT doc_id, source, substr(text, 1, ?1)
             FROM docs
             ORDER BY rowid DESC
             LIMIT ?2 OFFSET ?3",
        )
        .context("failed to prepare document listing")?;

    let rows = stmt
        .query_map(params![SNIPPET_CHARS, limit, offset], |row| {
            Ok(DocSummary {
                id: row.get(0)?,
                source: row.get(1)?,
                snippet: row.get(2)?,
            })
        })
        .context("failed to execute document listing")?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.context("failed to read document listing row")?);
    }

    Ok(DocPage { total, items })
}

/// Full-corpus reset: drop every document, embedding, and memory row.
///
/// This is the only delete operation the store supports; per-document
/// deletion is out of scope.
///
/// # Errors
///
/// Returns an error if the transaction fails.
pub fn clear(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction().context("failed to begin clear")?;
    tx.execute("DELETE FROM doc_embeddings", [])
        .context("failed to clear embeddings")?;
    tx.execute("DELETE FROM docs", [])
        .context("failed to clear documents")?;
    tx.execute("DELETE FROM memories", [])
        .context("failed to clear memories")?;
    tx.commit().context("failed to commit clear")?;
    tracing::info!("store cleared");
    Ok(())
}

/// Check the store/index invariant: `docs` and `doc_embeddings` hold exactly
/// the same id set.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn indexes_in_sync(conn: &Connection) -> Result<bool> {
    let missing_embedding: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM docs d
             LEFT JOIN doc_embeddings e ON e.doc_id = d.doc_id
             WHERE e.doc_id IS NULL",
            [],
            |row| row.get(0),
        )
        .context("failed to check docs without embeddings")?;

    let orphan_embedding: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM doc_embeddings e
             LEFT JOIN docs d ON d.doc_id = e.doc_id
             WHERE d.doc_id IS NULL",
            [],
            |row| row.get(0),
        )
        .context("failed to check orphaned embeddings")?;

    Ok(missing_embedding == 0 && orphan_embedding == 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> Store {
        Store::open_in_memory().expect("open in-memory store")
    }

    #[test]
    fn upsert_generates_id_when_omitted() {
        let store = test_store();
        let id = upsert(store.conn(), None, "some passage", None).unwrap();
        assert!(!id.is_empty());
        assert_eq!(count(store.conn()).unwrap(), 1);
    }

    #[test]
    fn upsert_is_idempotent() {
        let store = test_store();
        upsert(store.conn(), Some("d1"), "hello", Some("a.txt")).unwrap();
        upsert(store.conn(), Some("d1"), "hello", Some("a.txt")).unwrap();

        assert_eq!(count(store.conn()).unwrap(), 1);
        let doc = get(store.conn(), "d1").unwrap().expect("doc exists");
        assert_eq!(doc.text, "hello");
        assert_eq!(doc.source.as_deref(), Some("a.txt"));
    }

    #[test]
    fn upsert_replaces_text_wholesale() {
        let store = test_store();
        upsert(store.conn(), Some("d1"), "first version", None).unwrap();
        upsert(store.conn(), Some("d1"), "second version", Some("b.txt")).unwrap();

        let doc = get(store.conn(), "d1").unwrap().expect("doc exists");
        assert_eq!(doc.text, "second version");
        assert_eq!(doc.source.as_deref(), Some("b.txt"));
        assert_eq!(count(store.conn()).unwrap(), 1);
    }

    #[test]
    fn upsert_preserves_insertion_order_on_replace() {
        let store = test_store();
        upsert(store.conn(), Some("d1"), "one", None).unwrap();
        upsert(store.conn(), Some("d2"), "two", None).unwrap();
        // Replacing d1 must not move it to the front of the listing.
        upsert(store.conn(), Some("d1"), "one revised", None).unwrap();

        let page = list(store.conn(), 0, 10).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d2", "d1"]);
    }

    #[test]
    fn get_missing_returns_none() {
        let store = test_store();
        assert!(get(store.conn(), "nope").unwrap().is_none());
    }

    #[test]
    fn list_reverse_insertion_order_with_snippet() {
        let store = test_store();
        upsert(store.conn(), Some("d1"), &"x".repeat(600), Some("big.txt")).unwrap();
        upsert(store.conn(), Some("d2"), "short", None).unwrap();

        let page = list(store.conn(), 0, 10).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, "d2");
        assert_eq!(page.items[1].id, "d1");
        assert_eq!(page.items[1].snippet.len(), 500);
    }

    #[test]
    fn list_out_of_bounds_returns_empty_page() {
        let store = test_store();
        upsert(store.conn(), Some("d1"), "only", None).unwrap();

        let page = list(store.conn(), 50, 20).unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn list_pages_are_contiguous() {
        let store = test_store();
        for i in 0..5 {
            upsert(store.conn(), Some(&format!("d{i}")), "text", None).unwrap();
        }

        let first = list(store.conn(), 0, 2).unwrap();
        let second = list(store.conn(), 2, 2).unwrap();
        let ids: Vec<&str> = first
            .items
            .iter()
            .chain(second.items.iter())
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["d4", "d3", "d2", "d1"]);
    }

    #[test]
    fn clear_empties_every_table() {
        let mut store = test_store();
        upsert(store.conn(), Some("d1"), "text", None).unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO doc_embeddings (doc_id, content_hash, embedding_json, dim)
                 VALUES ('d1', 'h', '[1.0]', 1)",
                [],
            )
            .unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO memories (session_id, query, answer, citations, created_at_us)
                 VALUES ('s', 'q', 'a', '[]', 0)",
                [],
            )
            .unwrap();

        clear(store.conn_mut()).unwrap();

        assert_eq!(count(store.conn()).unwrap(), 0);
        assert_eq!(count_embeddings(store.conn()).unwrap(), 0);
        let memories: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(memories, 0);
    }

    #[test]
    fn in_sync_detects_drift_both_ways() {
        let store = test_store();
        assert!(indexes_in_sync(store.conn()).unwrap());

        upsert(store.conn(), Some("d1"), "text", None).unwrap();
        assert!(!indexes_in_sync(store.conn()).unwrap());

        store
            .conn()
            .execute(
                "INSERT INTO doc_embeddings (doc_id, content_hash, embedding_json, dim)
                 VALUES ('d1', 'h', '[1.0]', 1)",
                [],
            )
            .unwrap();
        assert!(indexes_in_sync(store.conn()).unwrap());
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/sift.db");
        let store = Store::open(&path).unwrap();
        upsert(store.conn(), Some("d1"), "persisted", None).unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(count(reopened.conn()).unwrap(), 1);
    }
}
