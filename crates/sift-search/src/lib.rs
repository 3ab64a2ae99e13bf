#![forbid(unsafe_code)]
//! sift-search: the hybrid retrieval core.
//!
//! Two independent ranking signals — BM25 lexical scoring over the live
//! corpus and cosine similarity over stored embeddings — are merged into
//! one ranking with Reciprocal Rank Fusion. The document store in
//! `sift-core` is the single source of truth; both indexes are derived
//! views kept in lock-step by the ingestion transaction.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod dense;
pub mod embed;
pub mod fusion;
pub mod retriever;
pub mod sparse;
pub mod tokenizer;

pub use dense::DenseHit;
pub use embed::{Embedder, HashEmbedder, unit_normalize};
pub use fusion::rrf_fuse;
pub use retriever::{HybridResponse, Retriever, ScoredResult, SearchParams};
pub use sparse::{Bm25Params, SparseHit};
pub use tokenizer::{tokenize, tokenize_unique};
