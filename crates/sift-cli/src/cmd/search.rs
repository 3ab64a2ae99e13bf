//! `sift search` — hybrid query over the corpus.
//!
//! Runs the dense and sparse layers, fuses them with reciprocal-rank
//! fusion, and prints the top passages with citation provenance.
//! `--explain` additionally shows each passage's per-layer rank, which is
//! the fastest way to see which signal pulled a result in.

use crate::cmd::{open_retriever, resolve_db_path};
use crate::output::{CliError, OutputMode, render, render_error};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sift_core::config::load_project_config;
use sift_core::error::ErrorCode;
use sift_search::retriever::SearchParams;
use std::io::Write;
use std::path::Path;

/// Longest passage preview printed per result, in characters.
const PREVIEW_CHARS: usize = 180;

#[derive(Args, Debug)]
#[command(
    about = "Search the corpus with hybrid ranking",
    long_about = "Search stored passages using hybrid ranking: BM25 lexical scoring and dense \
                  cosine similarity, merged with reciprocal-rank fusion. Defaults for the \
                  fan-out and fusion knobs come from .sift/config.toml.",
    after_help = "EXAMPLES:\n    # Top passages for a question\n    sift search \"how does fusion work\"\n\n    # Wider candidate pools, fewer results\n    sift search \"cat\" --k-dense 20 --k-sparse 20 -n 3\n\n    # Show per-layer ranks\n    sift search \"cat\" --explain"
)]
pub struct SearchArgs {
    /// Free-text query.
    pub query: String,

    /// Maximum number of fused results to return.
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,

    /// Candidates requested from the dense layer.
    #[arg(long)]
    pub k_dense: Option<usize>,

    /// Candidates requested from the sparse layer.
    #[arg(long)]
    pub k_sparse: Option<usize>,

    /// RRF constant; larger values flatten rank decay.
    #[arg(long)]
    pub rrf_k: Option<usize>,

    /// Show per-layer ranks for each result.
    #[arg(long)]
    pub explain: bool,
}

/// A single rendered search result.
#[derive(Debug, Serialize)]
pub struct SearchResultRow {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub fused_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dense_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse_rank: Option<usize>,
    pub text: String,
}

/// JSON envelope for search output.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub count: usize,
    /// False when the dense layer failed and results are sparse-only.
    pub dense_ok: bool,
    pub results: Vec<SearchResultRow>,
}

/// Execute `sift search <query>`.
///
/// # Errors
///
/// Returns an error for an empty query, a missing/corrupt store, or a
/// failed index scan.
pub fn run_search(
    args: &SearchArgs,
    output: OutputMode,
    project_root: &Path,
    db_override: Option<&Path>,
) -> Result<()> {
    if args.query.trim().is_empty() {
        render_error(output, &CliError::from_error_code(ErrorCode::EmptyQuery))?;
        anyhow::bail!("empty search query");
    }

    let config = load_project_config(project_root)?;
    let params = SearchParams {
        k_dense: args.k_dense.unwrap_or(config.search.k_dense),
        k_sparse: args.k_sparse.unwrap_or(config.search.k_sparse),
        rrf_k: args.rrf_k.unwrap_or(config.search.rrf_k),
        top_k: args.top_k.unwrap_or(config.search.top_k),
    };

    let db_path = resolve_db_path(project_root, db_override);
    let retriever = open_retriever(project_root, &db_path)?;
    let response = retriever.hybrid_search(&args.query, &params)?;

    if !response.dense_ok {
        tracing::warn!("dense layer unavailable; results are sparse-only");
    }

    let results: Vec<SearchResultRow> = response
        .results
        .into_iter()
        .map(|r| SearchResultRow {
            id: r.doc_id,
            source: r.source,
            fused_score: r.fused_score,
            dense_rank: r.dense_rank,
            sparse_rank: r.sparse_rank,
            text: preview(&r.text),
        })
        .collect();

    let out = SearchOutput {
        query: args.query.clone(),
        count: results.len(),
        dense_ok: response.dense_ok,
        results,
    };
    render(output, &out, |out, w| render_search_human(out, w, args.explain))
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push('…');
    }
    preview
}

fn render_search_human(
    out: &SearchOutput,
    w: &mut dyn Write,
    explain: bool,
) -> std::io::Result<()> {
    if out.results.is_empty() {
        writeln!(w, "No results for '{}'", out.query)?;
        return Ok(());
    }

    writeln!(w, "{} result(s) for '{}':", out.count, out.query)?;
    if !out.dense_ok {
        writeln!(w, "(dense layer unavailable; sparse-only ranking)")?;
    }
    writeln!(w, "{:-<90}", "")?;

    for result in &out.results {
        let source = result.source.as_deref().unwrap_or("-");
        writeln!(
            w,
            "{:<14}  {:>8.4}  [{}]",
            result.id, result.fused_score, source
        )?;
        if explain {
            writeln!(
                w,
                "{:<14}  dense: {}  sparse: {}",
                "",
                rank_label(result.dense_rank),
                rank_label(result.sparse_rank)
            )?;
        }
        writeln!(w, "    {}", result.text)?;
    }

    Ok(())
}

fn rank_label(rank: Option<usize>) -> String {
    rank.map_or_else(|| "-".to_string(), |r| format!("#{r}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::add::{AddArgs, run_add};

    fn add_doc(root: &Path, id: &str, text: &str) {
        run_add(
            &AddArgs {
                text: text.into(),
                source: Some("test.txt".into()),
                id: Some(id.into()),
            },
            OutputMode::Human,
            root,
            None,
        )
        .unwrap();
    }

    #[test]
    fn search_args_parse_defaults() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: SearchArgs,
        }

        let w = Wrapper::parse_from(["test", "cats"]);
        assert_eq!(w.args.query, "cats");
        assert!(w.args.top_k.is_none());
        assert!(!w.args.explain);

        let w = Wrapper::parse_from(["test", "cats", "-n", "3", "--rrf-k", "10", "--explain"]);
        assert_eq!(w.args.top_k, Some(3));
        assert_eq!(w.args.rrf_k, Some(10));
        assert!(w.args.explain);
    }

    #[test]
    fn run_search_empty_query_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = SearchArgs {
            query: "   ".into(),
            top_k: None,
            k_dense: None,
            k_sparse: None,
            rrf_k: None,
            explain: false,
        };
        assert!(run_search(&args, OutputMode::Human, dir.path(), None).is_err());
    }

    #[test]
    fn run_search_finds_ingested_doc() {
        let dir = tempfile::tempdir().expect("tempdir");
        add_doc(dir.path(), "d1", "the cat sat on the mat");
        add_doc(dir.path(), "d2", "dogs bark at strangers");

        let args = SearchArgs {
            query: "cat".into(),
            top_k: None,
            k_dense: None,
            k_sparse: None,
            rrf_k: None,
            explain: true,
        };
        run_search(&args, OutputMode::Human, dir.path(), None).unwrap();
        run_search(&args, OutputMode::Json, dir.path(), None).unwrap();
    }

    #[test]
    fn run_search_no_results_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        add_doc(dir.path(), "d1", "something else entirely");

        let args = SearchArgs {
            query: "zzznomatch".into(),
            top_k: None,
            k_dense: Some(0),
            k_sparse: None,
            rrf_k: None,
            explain: false,
        };
        run_search(&args, OutputMode::Human, dir.path(), None).unwrap();
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(400);
        let short = preview(&long);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
