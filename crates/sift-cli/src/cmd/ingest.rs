//! `sift ingest` — ingest plain-text files into the corpus.
//!
//! Accepts already-clean text formats only (`txt`, `md`, `csv`, `log`).
//! Anything else — PDF, DOCX, binaries — must go through an external
//! extraction step first and arrive here as text.

use crate::cmd::{open_retriever, resolve_db_path};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "csv", "log"];

#[derive(Args, Debug)]
#[command(
    about = "Ingest plain-text files",
    long_about = "Read one or more plain-text files (txt, md, csv, log) and ingest each as a \
                  document, tagged with its filename as provenance. Unsupported file types are \
                  skipped with a warning. The batch is all-or-nothing: if any readable file \
                  fails to ingest, none of them are stored.",
    after_help = "EXAMPLES:\n    # Ingest two notes files\n    sift ingest notes.md ideas.txt\n\n    # Machine-readable summary\n    sift ingest corpus/*.txt --json"
)]
pub struct IngestArgs {
    /// Files to ingest.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Why a file was left out of the batch.
#[derive(Debug, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// JSON envelope for ingest output.
#[derive(Debug, Serialize)]
pub struct IngestOutput {
    pub uploaded: usize,
    pub ingested: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Execute `sift ingest <files…>`.
///
/// # Errors
///
/// Returns an error if the store cannot open or the batch fails to commit.
pub fn run_ingest(
    args: &IngestArgs,
    output: OutputMode,
    project_root: &Path,
    db_override: Option<&Path>,
) -> Result<()> {
    let mut texts = Vec::new();
    let mut sources = Vec::new();
    let mut skipped = Vec::new();

    for path in &args.files {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !TEXT_EXTENSIONS.contains(&extension.as_str()) {
            warn!("skipping {name}: unsupported file type '{extension}'");
            skipped.push(SkippedFile {
                file: name,
                reason: format!("unsupported file type '{extension}'"),
            });
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => {
                warn!("skipping {name}: empty file");
                skipped.push(SkippedFile {
                    file: name,
                    reason: "empty file".into(),
                });
            }
            Ok(text) => {
                texts.push(text);
                sources.push(Some(name));
            }
            Err(err) => {
                warn!("skipping {name}: {err}");
                skipped.push(SkippedFile {
                    file: name,
                    reason: err.to_string(),
                });
            }
        }
    }

    let ingested = if texts.is_empty() {
        warn!("no valid documents to ingest");
        0
    } else {
        let db_path = resolve_db_path(project_root, db_override);
        let mut retriever = open_retriever(project_root, &db_path)?;
        retriever.ingest(&texts, &sources, None)?
    };

    let out = IngestOutput {
        uploaded: args.files.len(),
        ingested,
        skipped,
    };
    render(output, &out, |out, w| render_ingest_human(out, w))
}

fn render_ingest_human(out: &IngestOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "Ingested {} of {} file(s)",
        out.ingested, out.uploaded
    )?;
    for skip in &out.skipped {
        writeln!(w, "  skipped {}: {}", skip.file, skip.reason)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
