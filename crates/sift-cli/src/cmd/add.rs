//! `sift add` — ingest a single passage from the command line.

use crate::cmd::{open_retriever, resolve_db_path};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
#[command(
    about = "Ingest one passage of text",
    long_about = "Ingest a single passage into the corpus. The passage is written to the \
                  document store and both indexes before the command returns, so an \
                  immediately following search will see it.",
    after_help = "EXAMPLES:\n    # Quick text ingestion\n    sift add \"The cat sat on the mat.\"\n\n    # Tag provenance and pin the document id\n    sift add \"Dogs bark at cats.\" --source notes.md --id d2"
)]
pub struct AddArgs {
    /// Passage text to ingest.
    pub text: String,

    /// Provenance tag recorded with the document (e.g. a filename).
    #[arg(long)]
    pub source: Option<String>,

    /// Document id; re-using an existing id replaces that document.
    #[arg(long)]
    pub id: Option<String>,
}

/// JSON envelope for add output.
#[derive(Debug, Serialize)]
pub struct AddOutput {
    pub added: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Execute `sift add <text>`.
///
/// # Errors
///
/// Returns an error if the store cannot open or the batch fails.
pub fn run_add(
    args: &AddArgs,
    output: OutputMode,
    project_root: &Path,
    db_override: Option<&Path>,
) -> Result<()> {
    let db_path = resolve_db_path(project_root, db_override);
    let mut retriever = open_retriever(project_root, &db_path)?;

    let texts = vec![args.text.clone()];
    let sources = vec![args.source.clone()];
    let ids = args.id.clone().map(|id| vec![id]);

    let added = retriever.ingest(&texts, &sources, ids.as_deref())?;

    let out = AddOutput {
        added,
        id: args.id.clone(),
    };
    render(output, &out, |out, w| render_add_human(out, w))
}

fn render_add_human(out: &AddOutput, w: &mut dyn Write) -> std::io::Result<()> {
    match &out.id {
        Some(id) => writeln!(w, "Added {} document(s) (id: {id})", out.added),
        None => writeln!(w, "Added {} document(s)", out.added),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::store::{self, Store};

    #[test]
    fn add_args_parse() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: AddArgs,
        }

        let w = Wrapper::parse_from(["test", "some text", "--source", "a.txt", "--id", "d1"]);
        assert_eq!(w.args.text, "some text");
        assert_eq!(w.args.source.as_deref(), Some("a.txt"));
        assert_eq!(w.args.id.as_deref(), Some("d1"));
    }

    #[test]
    fn run_add_stores_the_passage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = AddArgs {
            text: "a passage".into(),
            source: Some("cli".into()),
            id: Some("d1".into()),
        };

        run_add(&args, OutputMode::Human, dir.path(), None).unwrap();

        let db_path = resolve_db_path(dir.path(), None);
        let store = Store::open(&db_path).unwrap();
        assert_eq!(store::count(store.conn()).unwrap(), 1);
        assert!(store::indexes_in_sync(store.conn()).unwrap());
    }

    #[test]
    fn run_add_respects_db_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        let custom = dir.path().join("elsewhere.db");
        let args = AddArgs {
            text: "a passage".into(),
            source: None,
            id: None,
        };

        run_add(&args, OutputMode::Json, dir.path(), Some(&custom)).unwrap();

        let store = Store::open(&custom).unwrap();
        assert_eq!(store::count(store.conn()).unwrap(), 1);
    }
}
