//! Dense vector index: per-document unit embeddings with brute-force
//! cosine KNN.
//!
//! Embedding rows live in `doc_embeddings`, maintained strictly in
//! lock-step with document upserts (same transaction, see the retriever).
//! Vectors are stored unit-normalized, so cosine similarity reduces to a
//! dot product. The scan orders by the document's rowid and the sort is
//! stable, which gives the documented tie-break: equal similarity ranks
//! earliest-inserted first.

use crate::embed::DimensionMismatch;
use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

/// A single dense hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenseHit {
    pub doc_id: String,
    pub text: String,
    pub source: Option<String>,
    pub similarity: f32,
}

/// SHA-256 of the exact text handed to the embedder.
///
/// Stored next to each vector so re-ingestion of unchanged content can skip
/// inference.
#[must_use]
pub fn content_hash_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when `doc_id` already has a vector for exactly this content.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub fn has_same_hash(conn: &Connection, doc_id: &str, content_hash: &str) -> Result<bool> {
    let existing = conn
        .query_row(
            "SELECT content_hash FROM doc_embeddings WHERE doc_id = ?1",
            params![doc_id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("failed to query content hash for document {doc_id}"))?;

    Ok(existing.as_deref() == Some(content_hash))
}

/// Write or replace the vector for `doc_id`.
///
/// Must run inside the same transaction as the document upsert so the
/// store/index invariant holds at every commit point.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn upsert_embedding(
    conn: &Connection,
    doc_id: &str,
    content_hash: &str,
    embedding: &[f32],
) -> Result<()> {
    let embedding_json =
        serde_json::to_string(embedding).context("failed to serialize embedding")?;
    let dim = i64::try_from(embedding.len()).unwrap_or(i64::MAX);

    conn.execute(
        "INSERT INTO doc_embeddings (doc_id, content_hash, embedding_json, dim)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(doc_id) DO UPDATE SET
             content_hash = excluded.content_hash,
             embedding_json = excluded.embedding_json,
             dim = excluded.dim",
        params![doc_id, content_hash, embedding_json, dim],
    )
    .with_context(|| format!("failed to upsert embedding for document {doc_id}"))?;

    Ok(())
}

/// Drop the vector for `doc_id`, if present.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn remove(conn: &Connection, doc_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM doc_embeddings WHERE doc_id = ?1",
        params![doc_id],
    )
    .with_context(|| format!("failed to remove embedding for document {doc_id}"))?;
    Ok(())
}

/// Dimensionality of the stored vectors, if any exist.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn stored_dim(conn: &Connection) -> Result<Option<usize>> {
    let dim: Option<i64> = conn
        .query_row("SELECT dim FROM doc_embeddings LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .context("failed to read stored embedding dimension")?;

    Ok(dim.and_then(|d| usize::try_from(d).ok()))
}

/// Return the `k` nearest stored documents by cosine similarity.
///
/// `query_embedding` must be unit-normalized by the caller. A dimension
/// mismatch against the stored corpus is an error; an individual row that
/// fails to parse (or carries a stray dimension) is skipped with a debug
/// log rather than failing the whole query.
///
/// # Errors
///
/// Returns an error on a dimension mismatch or if the scan fails.
pub fn search(conn: &Connection, query_embedding: &[f32], k: usize) -> Result<Vec<DenseHit>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    if let Some(dim) = stored_dim(conn)? {
        if dim != query_embedding.len() {
            bail!(DimensionMismatch {
                expected: dim,
                got: query_embedding.len(),
            });
        }
    }

    let mut stmt = conn
        .prepare(
            "SELECT e.doc_id, d.text, d.source, e.embedding_json
             FROM doc_embeddings e
             JOIN docs d ON d.doc_id = e.doc_id
             ORDER BY d.rowid ASC",
        )
        .context("failed to prepare dense scan")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .context("failed to execute dense scan")?;

    let mut hits = Vec::new();
    for row in rows {
        let (doc_id, text, source, embedding_json) = row.context("failed to read dense row")?;

        let embedding: Vec<f32> = match serde_json::from_str(&embedding_json) {
            Ok(value) => value,
            Err(err) => {
                debug!("skipping malformed embedding row for {doc_id}: {err}");
                continue;
            }
        };

        if embedding.len() != query_embedding.len() {
            debug!(
                "skipping embedding row for {doc_id} with stray dimension {}",
                embedding.len()
            );
            continue;
        }

        let similarity = dot(query_embedding, &embedding);
        hits.push(DenseHit {
            doc_id,
            text,
            source,
            similarity,
        });
    }

    // Stable sort over the rowid-ordered scan: similarity ties keep
    // insertion order, earliest first.
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);

    Ok(hits)
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right.iter()).map(|(a, b)| a * b).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
