//! `sift clear` — full-corpus reset.

use crate::cmd::resolve_db_path;
use crate::output::{CliError, OutputMode, render, render_error};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sift_core::store::{self, Store};
use std::io::Write;
use std::path::Path;
use tracing::warn;

#[derive(Args, Debug)]
#[command(
    about = "Delete every document, embedding, and session memory",
    long_about = "Reset the corpus: delete all documents, their embeddings, and the session \
                  interaction log in one transaction. This is the only delete operation sift \
                  supports; it cannot be undone.",
    after_help = "EXAMPLES:\n    # Reset everything\n    sift clear --yes"
)]
pub struct ClearArgs {
    /// Actually perform the reset; without this flag nothing is deleted.
    #[arg(long)]
    pub yes: bool,
}

/// JSON envelope for clear output.
#[derive(Debug, Serialize)]
pub struct ClearOutput {
    pub cleared: bool,
    pub documents_removed: u64,
}

/// Execute `sift clear`.
///
/// # Errors
///
/// Returns an error when `--yes` is missing, or if the reset fails.
pub fn run_clear(
    args: &ClearArgs,
    output: OutputMode,
    project_root: &Path,
    db_override: Option<&Path>,
) -> Result<()> {
    if !args.yes {
        render_error(
            output,
            &CliError::with_details(
                "refusing to clear without confirmation",
                "re-run with --yes to delete the entire corpus",
                "confirmation_required",
            ),
        )?;
        anyhow::bail!("clear not confirmed");
    }

    let db_path = resolve_db_path(project_root, db_override);
    let mut store = Store::open(&db_path)?;
    let before = store::count(store.conn())?;

    warn!("clearing corpus at {}", db_path.display());
    store::clear(store.conn_mut())?;

    let out = ClearOutput {
        cleared: true,
        documents_removed: before,
    };
    render(output, &out, |out, w| render_clear_human(out, w))
}

fn render_clear_human(out: &ClearOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "Cleared corpus ({} document(s) removed)",
        out.documents_removed
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
