//! Canonical SQLite schema for the sift store.
//!
//! Three tables share one database file:
//! - `docs` is the authoritative (id, text, source) mapping
//! - `doc_embeddings` is the dense-index projection of `docs`
//! - `memories` is the session interaction log kept for audit/replay
//!
//! `doc_embeddings` must always hold exactly the id set of `docs`; the write
//! path updates both inside one transaction, and `store::indexes_in_sync`
//! checks the invariant after the fact. Listing reads `docs` in reverse
//! rowid order, so replacement upserts must preserve the rowid (the store
//! uses `ON CONFLICT ... DO UPDATE`, never `INSERT OR REPLACE`).

/// Migration v1: document store plus the dense-index projection.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS docs (
    doc_id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    source TEXT,
    created_at_us INTEGER NOT NULL,
    CHECK (length(doc_id) > 0)
);

CREATE TABLE IF NOT EXISTS doc_embeddings (
    doc_id TEXT PRIMARY KEY REFERENCES docs(doc_id) ON DELETE CASCADE,
    content_hash TEXT NOT NULL,
    embedding_json TEXT NOT NULL,
    dim INTEGER NOT NULL CHECK (dim > 0)
);
";

/// Migration v2: session interaction log.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS memories (
    memory_id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL CHECK (length(trim(session_id)) > 0),
    query TEXT NOT NULL,
    answer TEXT NOT NULL,
    citations TEXT NOT NULL DEFAULT '[]',
    created_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_session_created
    ON memories(session_id, created_at_us DESC);
";

/// Indexes expected by the session-replay read path.
pub const REQUIRED_INDEXES: &[&str] = &["idx_memories_session_created"];
