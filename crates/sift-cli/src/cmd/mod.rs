//! Subcommand implementations.

pub mod add;
pub mod clear;
pub mod docs;
pub mod info;
pub mod ingest;
pub mod memory;
pub mod search;

use anyhow::Result;
use sift_core::config::load_project_config;
use sift_core::store::Store;
use sift_search::embed::HashEmbedder;
use sift_search::retriever::Retriever;
use std::path::{Path, PathBuf};

/// Resolve the store path: explicit `--db` flag, else `.sift/sift.db`
/// under the project root.
#[must_use]
pub fn resolve_db_path(project_root: &Path, db_override: Option<&Path>) -> PathBuf {
    db_override.map_or_else(|| project_root.join(".sift/sift.db"), Path::to_path_buf)
}

/// Open the store and wrap it in a retriever configured from
/// `.sift/config.toml`.
///
/// The bundled deterministic embedder backs the dense layer; a model-backed
/// [`sift_search::embed::Embedder`] would be constructed here instead.
///
/// # Errors
///
/// Returns an error if the config is malformed or the store cannot open.
pub fn open_retriever(project_root: &Path, db_path: &Path) -> Result<Retriever> {
    let config = load_project_config(project_root)?;
    let store = Store::open(db_path)?;
    let embedder = HashEmbedder::new(config.embedding.dim);
    Ok(Retriever::new(store, Box::new(embedder), &config))
}
