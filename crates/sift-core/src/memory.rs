//! Session interaction log for audit and session replay.
//!
//! Each row records one (query, answer, citations) exchange under a session
//! id. The log is append-only from the engine's point of view; it is wiped
//! only by a full-corpus reset. It is not consulted by the ranking core.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;

/// One recorded exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub session_id: String,
    pub query: String,
    pub answer: String,
    /// JSON array of citation objects, stored verbatim.
    pub citations: serde_json::Value,
    pub created_at_us: i64,
}

/// Append one exchange to the session log.
///
/// # Errors
///
/// Returns an error if the citations cannot be serialized or the insert
/// fails (a blank session id violates the schema CHECK).
pub fn save(
    conn: &Connection,
    session_id: &str,
    query: &str,
    answer: &str,
    citations: &serde_json::Value,
) -> Result<()> {
    let citations_json =
        serde_json::to_string(citations).context("failed to serialize citations")?;
    let now_us = chrono::Utc::now().timestamp_micros();

    conn.execute(
        "INSERT INTO memories (session_id, query, answer, citations, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![session_id, query, answer, citations_json, now_us],
    )
    .with_context(|| format!("failed to save interaction for session {session_id}"))?;

    tracing::debug!(session = session_id, "interaction recorded");
    Ok(())
}

/// Read a session's exchanges, most recent first.
///
/// An unknown session id yields an empty list, not an error.
///
/// # Errors
///
/// Returns an error if the query fails or a stored citations column is not
/// valid JSON.
pub fn list(conn: &Connection, session_id: &str) -> Result<Vec<Interaction>> {
    let mut stmt = conn
        .prepare(
            "SELECT session_id, query, answer, citations, created_at_us
             FROM memories
             WHERE session_id = ?1
             ORDER BY created_at_us DESC, memory_id DESC",
        )
        .context("failed to prepare session log query")?;

    let rows = stmt
        .query_map(params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })
        .context("failed to execute session log query")?;

    let mut out = Vec::new();
    for row in rows {
        let (session_id, query, answer, citations_json, created_at_us) =
            row.context("failed to read session log row")?;
        let citations: serde_json::Value = serde_json::from_str(&citations_json)
            .with_context(|| format!("corrupt citations for session {session_id}"))?;
        out.push(Interaction {
            session_id,
            query,
            answer,
            citations,
            created_at_us,
        });
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
