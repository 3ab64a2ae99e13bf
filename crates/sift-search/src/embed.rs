//! Embedding seam between the retrieval core and the model backend.
//!
//! The engine never loads a model itself; it consumes any [`Embedder`] and
//! normalizes its output to unit length, so dense similarity can be computed
//! as a plain dot product. [`HashEmbedder`] is the bundled deterministic
//! backend: a term-hash projection good enough for tests, demos, and
//! environments without an inference runtime. A model-backed implementation
//! plugs in here without touching the rest of the crate.

use crate::tokenizer::tokenize;
use anyhow::Result;
use std::hash::{Hash, Hasher};

/// Raised when a query or stored vector disagrees with the index dimension.
#[derive(Debug, thiserror::Error)]
#[error("embedding dimension mismatch: expected {expected}, got {got}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub got: usize,
}

/// A deterministic text-to-vector capability.
///
/// Implementations must be deterministic for a given backend version:
/// the same text always embeds to the same vector. Output need not be
/// pre-normalized; callers normalize at the seam.
pub trait Embedder: Send + Sync {
    /// Fixed output dimensionality.
    fn dim(&self) -> usize;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable or inference fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch; the default maps [`Embedder::embed`] over the slice.
    ///
    /// # Errors
    ///
    /// Returns the first per-text error.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Scale a vector to unit length in place.
///
/// The zero vector (e.g. the embedding of an empty string under
/// [`HashEmbedder`]) is left untouched; it scores 0 against everything,
/// which is the wanted behavior for content-free queries.
pub fn unit_normalize(vector: &mut [f32]) {
    let norm_sq: f32 = vector.iter().map(|v| v * v).sum();
    if norm_sq <= f32::EPSILON {
        return;
    }
    let inv_norm = norm_sq.sqrt().recip();
    for v in vector.iter_mut() {
        *v *= inv_norm;
    }
}

/// Deterministic term-hash projection embedder.
///
/// Each token is hashed into one of `dim` buckets and counted; the result
/// captures lexical overlap (identical text embeds identically, similarity
/// exactly 1.0 after normalization) but no semantics. `SipHash` with the
/// default keys is stable across processes, so vectors written by one run
/// are comparable in the next.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    /// Create a projection with `dim` buckets.
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dim];
        for token in tokenize(text) {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = usize::try_from(hasher.finish() % self.dim as u64).unwrap_or(0);
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
