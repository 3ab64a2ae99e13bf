//! Hybrid retrieval orchestration: the ingestion write path and the fused
//! query read path.
//!
//! Ingestion is all-or-nothing per batch: every embedding is computed up
//! front, then one transaction writes each (document, embedding) pair. An
//! embedding or storage failure aborts the batch and leaves the corpus
//! exactly as it was — prior documents are never corrupted, and the
//! store/index invariant holds at every commit point.
//!
//! The query path degrades gracefully: a query-time embedder failure drops
//! to sparse-only fusion with a warning and a `dense_ok = false` marker;
//! storage errors always propagate.

use crate::dense;
use crate::embed::{Embedder, unit_normalize};
use crate::fusion::{find_rank, rrf_fuse};
use crate::sparse::{self, Bm25Params};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use sift_core::config::ProjectConfig;
use sift_core::store::{self, Store};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Per-query fan-out and fusion knobs.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Candidates requested from the dense index.
    pub k_dense: usize,
    /// Candidates requested from the sparse index.
    pub k_sparse: usize,
    /// RRF constant.
    pub rrf_k: usize,
    /// Fused results returned.
    pub top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            k_dense: 6,
            k_sparse: 6,
            rrf_k: 60,
            top_k: 6,
        }
    }
}

/// One fused result with full citation provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub doc_id: String,
    pub text: String,
    pub source: Option<String>,
    /// 1-based rank in the dense list, if ranked there.
    pub dense_rank: Option<usize>,
    /// 1-based rank in the sparse list, if ranked there.
    pub sparse_rank: Option<usize>,
    /// Accumulated RRF contribution across both lists.
    pub fused_score: f32,
}

/// A hybrid query's outcome.
///
/// `dense_ok` is `false` when the embedder failed at query time and the
/// results are sparse-only — the degradation is explicit, never silent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResponse {
    pub results: Vec<ScoredResult>,
    pub dense_ok: bool,
}

/// Orchestrates the document store, both derived indexes, and the
/// embedding seam.
pub struct Retriever {
    store: Store,
    embedder: Box<dyn Embedder>,
    bm25: Bm25Params,
    query_prefix: String,
    passage_prefix: String,
}

impl Retriever {
    /// Build a retriever over an open store and an embedding backend.
    #[must_use]
    pub fn new(store: Store, embedder: Box<dyn Embedder>, config: &ProjectConfig) -> Self {
        Self {
            store,
            embedder,
            bm25: Bm25Params {
                k1: config.search.bm25_k1,
                b: config.search.bm25_b,
            },
            query_prefix: config.embedding.query_prefix.clone(),
            passage_prefix: config.embedding.passage_prefix.clone(),
        }
    }

    /// Shared access to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Exclusive access to the underlying store.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Ingest a batch of passages, returning how many were stored.
    ///
    /// `sources` must be empty (no provenance) or one entry per text;
    /// `ids`, when given, must supply one id per text. Passages whose id
    /// already holds a vector for identical content skip re-embedding.
    ///
    /// All-or-nothing: any embedding or storage failure aborts the whole
    /// batch without touching previously stored documents.
    ///
    /// # Errors
    ///
    /// Returns an error on length mismatch, embedding failure, or a failed
    /// transaction.
    pub fn ingest(
        &mut self,
        texts: &[String],
        sources: &[Option<String>],
        ids: Option<&[String]>,
    ) -> Result<usize> {
        if texts.is_empty() {
            return Ok(0);
        }

        if !sources.is_empty() && sources.len() != texts.len() {
            bail!(
                "ingest batch length mismatch: {} texts but {} sources",
                texts.len(),
                sources.len()
            );
        }
        if let Some(ids) = ids {
            if ids.len() != texts.len() {
                bail!(
                    "ingest batch length mismatch: {} texts but {} ids",
                    texts.len(),
                    ids.len()
                );
            }
        }

        // Plan the batch: decide per passage whether inference is needed,
        // then embed everything before any write happens.
        struct Planned<'a> {
            id: Option<&'a str>,
            text: &'a str,
            source: Option<&'a str>,
            content_hash: String,
            embedding: Option<Vec<f32>>,
        }

        let mut planned = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let id = ids.map(|ids| ids[i].as_str());
            let source = sources.get(i).and_then(|s| s.as_deref());
            let embed_text = format!("{}{}", self.passage_prefix, text);
            let content_hash = dense::content_hash_hex(&embed_text);

            let unchanged = match id {
                Some(id) => dense::has_same_hash(self.store.conn(), id, &content_hash)?,
                None => false,
            };

            let embedding = if unchanged {
                None
            } else {
                let mut vector = self
                    .embedder
                    .embed(&embed_text)
                    .with_context(|| format!("embedding failed for passage {i}"))?;
                unit_normalize(&mut vector);
                Some(vector)
            };

            planned.push(Planned {
                id,
                text,
                source,
                content_hash,
                embedding,
            });
        }

        let tx = self
            .store
            .conn_mut()
            .transaction()
            .context("failed to begin ingest transaction")?;

        for plan in &planned {
            let doc_id = store::upsert(&tx, plan.id, plan.text, plan.source)?;
            if let Some(embedding) = &plan.embedding {
                dense::upsert_embedding(&tx, &doc_id, &plan.content_hash, embedding)?;
            }
        }

        tx.commit().context("failed to commit ingest transaction")?;

        debug!(count = texts.len(), "ingested batch");
        Ok(texts.len())
    }

    /// Run dense and sparse searches, fuse with RRF, and truncate to
    /// `top_k`.
    ///
    /// The two searches have no data dependency on each other; they are
    /// serialized here only because they share one connection. A
    /// query-time embedder failure degrades to sparse-only fusion (see
    /// [`HybridResponse::dense_ok`]); storage errors propagate.
    ///
    /// # Errors
    ///
    /// Returns an error if either index scan fails.
    pub fn hybrid_search(&self, query: &str, params: &SearchParams) -> Result<HybridResponse> {
        let sparse_hits = sparse::search(self.store.conn(), query, params.k_sparse, &self.bm25)
            .context("sparse search failed")?;

        let dense_hits = match self.embed_query(query) {
            Ok(query_embedding) => Some(
                dense::search(self.store.conn(), &query_embedding, params.k_dense)
                    .context("dense search failed")?,
            ),
            Err(err) => {
                warn!("dense layer unavailable, falling back to sparse-only fusion: {err}");
                None
            }
        };
        let dense_ok = dense_hits.is_some();
        let dense_hits = dense_hits.unwrap_or_default();

        let dense_ids: Vec<&str> = dense_hits.iter().map(|h| h.doc_id.as_str()).collect();
        let sparse_ids: Vec<&str> = sparse_hits.iter().map(|h| h.doc_id.as_str()).collect();

        // Payload lookup across both hit lists; an id surviving fusion is
        // present in at least one of them.
        let mut payloads: HashMap<&str, (&str, Option<&str>)> = HashMap::new();
        for hit in &dense_hits {
            payloads.insert(hit.doc_id.as_str(), (hit.text.as_str(), hit.source.as_deref()));
        }
        for hit in &sparse_hits {
            payloads
                .entry(hit.doc_id.as_str())
                .or_insert((hit.text.as_str(), hit.source.as_deref()));
        }

        let fused = rrf_fuse(&[&dense_ids, &sparse_ids], params.rrf_k);

        let mut results = Vec::with_capacity(fused.len().min(params.top_k));
        for (doc_id, fused_score) in fused.into_iter().take(params.top_k) {
            let Some((text, source)) = payloads.get(doc_id.as_str()).copied() else {
                continue;
            };
            results.push(ScoredResult {
                dense_rank: find_rank(&dense_ids, &doc_id),
                sparse_rank: find_rank(&sparse_ids, &doc_id),
                doc_id,
                text: text.to_owned(),
                source: source.map(str::to_owned),
                fused_score,
            });
        }

        debug!(
            dense = dense_ids.len(),
            sparse = sparse_ids.len(),
            fused = results.len(),
            dense_ok,
            "hybrid search complete"
        );

        Ok(HybridResponse { results, dense_ok })
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vector = self
            .embedder
            .embed(&format!("{}{}", self.query_prefix, query))
            .context("query embedding failed")?;
        unit_normalize(&mut vector);
        Ok(vector)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use anyhow::anyhow;
    use sift_core::store::Store;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_retriever() -> Retriever {
        let store = Store::open_in_memory().expect("open in-memory store");
        Retriever::new(
            store,
            Box::new(HashEmbedder::default()),
            &ProjectConfig::default(),
        )
    }

    fn owned(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| (*s).to_string()).collect()
    }

    /// Embedder that fails after a configurable number of calls.
    struct FlakyEmbedder {
        inner: HashEmbedder,
        calls: AtomicUsize,
        fail_after: usize,
    }

    impl FlakyEmbedder {
        fn failing_after(fail_after: usize) -> Self {
            Self {
                inner: HashEmbedder::default(),
                calls: AtomicUsize::new(0),
                fail_after,
            }
        }
    }

    impl Embedder for FlakyEmbedder {
        fn dim(&self) -> usize {
            self.inner.dim()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
                return Err(anyhow!("backend went away"));
            }
            self.inner.embed(text)
        }
    }

    #[test]
    fn ingest_empty_batch_is_zero() {
        let mut retriever = test_retriever();
        assert_eq!(retriever.ingest(&[], &[], None).unwrap(), 0);
    }

    #[test]
    fn ingest_writes_both_tables() {
        let mut retriever = test_retriever();
        let n = retriever
            .ingest(
                &owned(&["first passage", "second passage"]),
                &[Some("a.txt".into()), None],
                None,
            )
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(store::count(retriever.store().conn()).unwrap(), 2);
        assert_eq!(store::count_embeddings(retriever.store().conn()).unwrap(), 2);
        assert!(store::indexes_in_sync(retriever.store().conn()).unwrap());
    }

    #[test]
    fn ingest_rejects_mismatched_sources() {
        let mut retriever = test_retriever();
        let err = retriever
            .ingest(&owned(&["one", "two"]), &[Some("only.txt".into())], None)
            .unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn ingest_rejects_mismatched_ids() {
        let mut retriever = test_retriever();
        let ids = owned(&["d1"]);
        let err = retriever
            .ingest(&owned(&["one", "two"]), &[], Some(&ids))
            .unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn failed_batch_leaves_store_untouched() {
        let store = Store::open_in_memory().expect("open in-memory store");
        let mut retriever = Retriever::new(
            store,
            Box::new(FlakyEmbedder::failing_after(1)),
            &ProjectConfig::default(),
        );

        let err = retriever
            .ingest(&owned(&["will embed", "will not embed"]), &[], None)
            .unwrap_err();
        assert!(err.to_string().contains("passage 1"));

        assert_eq!(store::count(retriever.store().conn()).unwrap(), 0);
        assert_eq!(store::count_embeddings(retriever.store().conn()).unwrap(), 0);
    }

    #[test]
    fn failed_batch_preserves_earlier_batches() {
        let store = Store::open_in_memory().expect("open in-memory store");
        let mut retriever = Retriever::new(
            store,
            Box::new(FlakyEmbedder::failing_after(1)),
            &ProjectConfig::default(),
        );

        let ids = owned(&["keep"]);
        retriever
            .ingest(&owned(&["stays put"]), &[], Some(&ids))
            .unwrap();

        retriever
            .ingest(&owned(&["boom"]), &[], None)
            .unwrap_err();

        assert_eq!(store::count(retriever.store().conn()).unwrap(), 1);
        assert!(
            store::get(retriever.store().conn(), "keep")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn unchanged_content_skips_re_embedding() {
        let store = Store::open_in_memory().expect("open in-memory store");
        // Two embed calls allowed: the first ingest uses one; the repeat
        // must not need another.
        let mut retriever = Retriever::new(
            store,
            Box::new(FlakyEmbedder::failing_after(1)),
            &ProjectConfig::default(),
        );

        let ids = owned(&["d1"]);
        retriever
            .ingest(&owned(&["same text"]), &[], Some(&ids))
            .unwrap();
        // Would fail if it re-embedded.
        retriever
            .ingest(&owned(&["same text"]), &[], Some(&ids))
            .unwrap();

        assert_eq!(store::count(retriever.store().conn()).unwrap(), 1);
    }

    #[test]
    fn query_time_embedder_failure_degrades_to_sparse() {
        let store = Store::open_in_memory().expect("open in-memory store");
        // Two successful calls cover ingest; the query call fails.
        let mut retriever = Retriever::new(
            store,
            Box::new(FlakyEmbedder::failing_after(2)),
            &ProjectConfig::default(),
        );

        retriever
            .ingest(&owned(&["the cat sat", "dogs bark loudly"]), &[], None)
            .unwrap();

        let response = retriever
            .hybrid_search("cat", &SearchParams::default())
            .unwrap();

        assert!(!response.dense_ok);
        assert_eq!(response.results.len(), 1);
        assert!(response.results[0].dense_rank.is_none());
        assert_eq!(response.results[0].sparse_rank, Some(1));
    }

    #[test]
    fn results_carry_provenance() {
        let mut retriever = test_retriever();
        let ids = owned(&["d1"]);
        retriever
            .ingest(
                &owned(&["a passage about cats"]),
                &[Some("cats.md".into())],
                Some(&ids),
            )
            .unwrap();

        let response = retriever
            .hybrid_search("cats", &SearchParams::default())
            .unwrap();

        assert!(response.dense_ok);
        let top = &response.results[0];
        assert_eq!(top.doc_id, "d1");
        assert_eq!(top.source.as_deref(), Some("cats.md"));
        assert!(top.fused_score > 0.0);
        assert_eq!(top.dense_rank, Some(1));
        assert_eq!(top.sparse_rank, Some(1));
    }

    #[test]
    fn empty_query_is_tolerated() {
        let mut retriever = test_retriever();
        retriever
            .ingest(&owned(&["something stored"]), &[], None)
            .unwrap();

        let response = retriever
            .hybrid_search("", &SearchParams::default())
            .unwrap();

        // Sparse is empty; dense still ran over the zero-vector query.
        assert!(response.dense_ok);
        for result in &response.results {
            assert!(result.sparse_rank.is_none());
        }
    }
}
