//! `sift memory` — inspect a session's interaction log.

use crate::cmd::resolve_db_path;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sift_core::memory;
use sift_core::store::Store;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
#[command(
    about = "Show a session's recorded interactions",
    long_about = "List the (query, answer, citations) exchanges recorded under a session id, \
                  most recent first. The log is written by the answer-generation layer; this \
                  command only reads it.",
    after_help = "EXAMPLES:\n    # Default session\n    sift memory default\n\n    # Machine-readable output\n    sift memory default --json"
)]
pub struct MemoryArgs {
    /// Session id to inspect.
    pub session_id: String,
}

/// One rendered interaction.
#[derive(Debug, Serialize)]
pub struct MemoryRow {
    pub at: String,
    pub query: String,
    pub answer: String,
    pub citations: serde_json::Value,
}

/// JSON envelope for memory output.
#[derive(Debug, Serialize)]
pub struct MemoryOutput {
    pub session_id: String,
    pub count: usize,
    pub rows: Vec<MemoryRow>,
}

/// Execute `sift memory <session-id>`.
///
/// # Errors
///
/// Returns an error if the store cannot open or the log read fails.
pub fn run_memory(
    args: &MemoryArgs,
    output: OutputMode,
    project_root: &Path,
    db_override: Option<&Path>,
) -> Result<()> {
    let db_path = resolve_db_path(project_root, db_override);
    let store = Store::open(&db_path)?;
    let interactions = memory::list(store.conn(), &args.session_id)?;

    let rows: Vec<MemoryRow> = interactions
        .into_iter()
        .map(|i| MemoryRow {
            at: format_timestamp(i.created_at_us),
            query: i.query,
            answer: i.answer,
            citations: i.citations,
        })
        .collect();

    let out = MemoryOutput {
        session_id: args.session_id.clone(),
        count: rows.len(),
        rows,
    };
    render(output, &out, |out, w| render_memory_human(out, w))
}

fn format_timestamp(us: i64) -> String {
    chrono::DateTime::from_timestamp_micros(us)
        .map_or_else(|| us.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn render_memory_human(out: &MemoryOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if out.rows.is_empty() {
        writeln!(w, "No interactions for session '{}'", out.session_id)?;
        return Ok(());
    }

    writeln!(
        w,
        "{} interaction(s) for session '{}':",
        out.count, out.session_id
    )?;
    writeln!(w, "{:-<90}", "")?;

    for row in &out.rows {
        writeln!(w, "[{}] {}", row.at, row.query)?;
        writeln!(w, "    {}", row.answer)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
