//! `sift docs` — page through stored documents.

use crate::cmd::resolve_db_path;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sift_core::store::{self, DocSummary, Store};
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
#[command(
    about = "List stored documents",
    long_about = "Page through stored documents in reverse insertion order (most recently \
                  inserted first), with a truncated text snippet per document.",
    after_help = "EXAMPLES:\n    # First page\n    sift docs\n\n    # Next page of 20\n    sift docs --offset 20\n\n    # Machine-readable output\n    sift docs --json"
)]
pub struct DocsArgs {
    /// Documents to skip before the page starts.
    #[arg(long, default_value = "0")]
    pub offset: u64,

    /// Maximum documents in the page.
    #[arg(long, default_value = "20")]
    pub limit: u64,
}

/// JSON envelope for docs output.
#[derive(Debug, Serialize)]
pub struct DocsOutput {
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
    pub items: Vec<DocSummary>,
}

/// Execute `sift docs`.
///
/// # Errors
///
/// Returns an error if the store cannot open or the listing fails.
pub fn run_docs(
    args: &DocsArgs,
    output: OutputMode,
    project_root: &Path,
    db_override: Option<&Path>,
) -> Result<()> {
    let db_path = resolve_db_path(project_root, db_override);
    let store = Store::open(&db_path)?;
    let page = store::list(store.conn(), args.offset, args.limit)?;

    let out = DocsOutput {
        offset: args.offset,
        limit: args.limit,
        total: page.total,
        items: page.items,
    };
    render(output, &out, |out, w| render_docs_human(out, w))
}

fn render_docs_human(out: &DocsOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if out.items.is_empty() {
        writeln!(w, "No documents (total: {})", out.total)?;
        return Ok(());
    }

    writeln!(
        w,
        "{} document(s), showing {} from offset {}:",
        out.total,
        out.items.len(),
        out.offset
    )?;
    writeln!(w, "{:-<90}", "")?;

    for item in &out.items {
        let source = item.source.as_deref().unwrap_or("-");
        writeln!(w, "{:<38}  [{source}]", item.id)?;
        writeln!(w, "    {}", item.snippet.replace('\n', " "))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
