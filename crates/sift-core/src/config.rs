//! Project configuration loaded from `.sift/config.toml`.
//!
//! Every field has a serde default so a missing file, or a file with only
//! the keys the operator cares about, still yields a usable config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Knobs for the hybrid query path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Candidates requested from the dense index.
    #[serde(default = "default_k_dense")]
    pub k_dense: usize,
    /// Candidates requested from the sparse index.
    #[serde(default = "default_k_sparse")]
    pub k_sparse: usize,
    /// RRF constant; higher values flatten the rank-decay curve.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    /// Fused results returned to the caller.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// BM25 term-frequency saturation.
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,
    /// BM25 length normalization.
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k_dense: default_k_dense(),
            k_sparse: default_k_sparse(),
            rrf_k: default_rrf_k(),
            top_k: default_top_k(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
        }
    }
}

/// Embedding-side choices.
///
/// The instruction prefixes are a corpus-wide configuration choice, never a
/// per-call option: whatever convention the embedding model was trained with
/// (e.g. `"query: "` / `"passage: "`) must be applied consistently at both
/// ingestion and query time. Both default to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Expected embedding dimensionality.
    #[serde(default = "default_dim")]
    pub dim: usize,
    /// Instruction prefix applied to query text before encoding.
    #[serde(default)]
    pub query_prefix: String,
    /// Instruction prefix applied to passage text before encoding.
    #[serde(default)]
    pub passage_prefix: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dim: default_dim(),
            query_prefix: String::new(),
            passage_prefix: String::new(),
        }
    }
}

const fn default_k_dense() -> usize {
    6
}

const fn default_k_sparse() -> usize {
    6
}

const fn default_rrf_k() -> usize {
    60
}

const fn default_top_k() -> usize {
    6
}

const fn default_bm25_k1() -> f32 {
    1.5
}

const fn default_bm25_b() -> f32 {
    0.75
}

const fn default_dim() -> usize {
    256
}

/// Load the project config from `<root>/.sift/config.toml`.
///
/// A missing file yields defaults; a present but malformed file is an error
/// (silently ignoring a typo'd config is worse than failing).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".sift/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
