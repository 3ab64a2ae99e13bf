//! Sparse lexical search: BM25 recomputed over the full corpus per query.
//!
//! The corpus scan is one SQL statement, which is also the consistency
//! snapshot: a concurrent ingest lands entirely before or entirely after
//! the scan. Term statistics (document frequency, average length) are
//! rebuilt from that snapshot on every call rather than maintained
//! incrementally — a deliberate simplicity trade-off that is fine up to
//! tens of thousands of passages. A corpus past that size wants an
//! inverted index with postings updated on ingest; the scoring formula and
//! this function's contract would not change.

use crate::tokenizer::tokenize;
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

/// BM25 constants.
///
/// `k1` controls term-frequency saturation, `b` document-length
/// normalization. The defaults are the standard Okapi choices.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// A single lexical hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparseHit {
    pub doc_id: String,
    pub text: String,
    pub source: Option<String>,
    pub score: f32,
}

/// Score every stored document against `query`, best first, at most `k`.
///
/// Documents matching none of the query terms are excluded, never padded
/// in to fill `k`. An empty corpus or a query that tokenizes to nothing
/// yields an empty result. Equal scores order by doc id ascending.
///
/// # Errors
///
/// Returns an error if the corpus scan fails.
pub fn search(
    conn: &Connection,
    query: &str,
    k: usize,
    params: &Bm25Params,
) -> Result<Vec<SparseHit>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    let query_terms = tokenize(query);
    if query_terms.is_empty() {
        return Ok(Vec::new());
    }

    let docs = scan_corpus(conn)?;
    if docs.is_empty() {
        return Ok(Vec::new());
    }

    let stats = CorpusStats::build(&docs, &query_terms);

    let mut hits = Vec::new();
    for doc in &docs {
        let score = stats.score(doc, &query_terms, params);
        if score > 0.0 {
            hits.push(SparseHit {
                doc_id: doc.doc_id.clone(),
                text: doc.text.clone(),
                source: doc.source.clone(),
                score,
            });
        }
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    hits.truncate(k);

    tracing::debug!(candidates = hits.len(), "sparse search scored corpus");
    Ok(hits)
}

struct ScannedDoc {
    doc_id: String,
    text: String,
    source: Option<String>,
    term_counts: HashMap<String, usize>,
    len: f32,
}

fn scan_corpus(conn: &Connection) -> Result<Vec<ScannedDoc>> {
    let mut stmt = conn
        .prepare("SELECT doc_id, text, source FROM docs ORDER BY rowid ASC")
        .context("failed to prepare corpus scan")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .context("failed to execute corpus scan")?;

    let mut docs = Vec::new();
    for row in rows {
        let (doc_id, text, source) = row.context("failed to read corpus row")?;
        let tokens = tokenize(&text);
        let len = tokens.len() as f32;
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        for token in tokens {
            *term_counts.entry(token).or_insert(0) += 1;
        }
        docs.push(ScannedDoc {
            doc_id,
            text,
            source,
            term_counts,
            len,
        });
    }

    Ok(docs)
}

/// Corpus-level statistics rebuilt per query from the scan snapshot.
struct CorpusStats {
    total_docs: usize,
    doc_freqs: HashMap<String, usize>,
    avg_doc_len: f32,
}

impl CorpusStats {
    fn build(docs: &[ScannedDoc], query_terms: &[String]) -> Self {
        let total_docs = docs.len();
        let avg_doc_len = if total_docs == 0 {
            0.0
        } else {
            docs.iter().map(|d| d.len).sum::<f32>() / total_docs as f32
        };

        let mut doc_freqs = HashMap::new();
        for term in query_terms {
            if doc_freqs.contains_key(term) {
                continue;
            }
            let df = docs
                .iter()
                .filter(|d| d.term_counts.contains_key(term))
                .count();
            doc_freqs.insert(term.clone(), df);
        }

        Self {
            total_docs,
            doc_freqs,
            avg_doc_len,
        }
    }

    /// Smoothed IDF: `ln((N - df + 0.5) / (df + 0.5) + 1)`.
    fn idf(&self, term: &str) -> f32 {
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        let n = self.total_docs as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn score(&self, doc: &ScannedDoc, query_terms: &[String], params: &Bm25Params) -> f32 {
        let mut score = 0.0;
        let avg_len = self.avg_doc_len.max(1.0);

        for term in query_terms {
            let tf = doc.term_counts.get(term).copied().unwrap_or(0) as f32;
            if tf == 0.0 {
                continue;
            }

            let tf_component = (tf * (params.k1 + 1.0))
                / (tf + params.k1 * (1.0 - params.b + params.b * doc.len / avg_len));
            score += self.idf(term) * tf_component;
        }

        score
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
