//! `sift info` — store diagnostics.

use crate::cmd::resolve_db_path;
use crate::output::{CliError, OutputMode, render, render_error};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sift_core::db::migrations;
use sift_core::error::ErrorCode;
use sift_core::store::{self, Store};
use sift_search::dense;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
#[command(
    about = "Show store counts and index health",
    long_about = "Report the store path, schema version, document and embedding counts, the \
                  stored embedding dimensionality, and whether the two indexes cover exactly \
                  the same documents.",
    after_help = "EXAMPLES:\n    # Human summary\n    sift info\n\n    # Machine-readable output\n    sift info --json"
)]
pub struct InfoArgs {}

/// JSON envelope for info output.
#[derive(Debug, Serialize)]
pub struct InfoOutput {
    pub db_path: String,
    pub schema_version: u32,
    pub documents: u64,
    pub embeddings: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dim: Option<usize>,
    pub in_sync: bool,
}

/// Execute `sift info`.
///
/// # Errors
///
/// Returns an error if the store cannot open or a diagnostic query fails.
pub fn run_info(
    _args: &InfoArgs,
    output: OutputMode,
    project_root: &Path,
    db_override: Option<&Path>,
) -> Result<()> {
    let db_path = resolve_db_path(project_root, db_override);
    let store = Store::open(&db_path)?;
    let conn = store.conn();

    let out = InfoOutput {
        db_path: db_path.display().to_string(),
        schema_version: migrations::current_schema_version(conn)?,
        documents: store::count(conn)?,
        embeddings: store::count_embeddings(conn)?,
        embedding_dim: dense::stored_dim(conn)?,
        in_sync: store::indexes_in_sync(conn)?,
    };

    if !out.in_sync {
        render_error(output, &CliError::from_error_code(ErrorCode::IndexOutOfSync))?;
    }

    render(output, &out, |out, w| render_info_human(out, w))
}

fn render_info_human(out: &InfoOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "{:<16} {}", "store:", out.db_path)?;
    writeln!(w, "{:<16} {}", "schema:", out.schema_version)?;
    writeln!(w, "{:<16} {}", "documents:", out.documents)?;
    writeln!(w, "{:<16} {}", "embeddings:", out.embeddings)?;
    if let Some(dim) = out.embedding_dim {
        writeln!(w, "{:<16} {dim}", "dimension:")?;
    }
    writeln!(
        w,
        "{:<16} {}",
        "indexes:",
        if out.in_sync { "in sync" } else { "OUT OF SYNC" }
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
