//! BM25 lexical index
//!
//! Posting statistics are maintained in-crate rather than delegated to a
//! search library so that scoring follows the documented formulas exactly
//! and stays auditable: tokenization is lower-cased whitespace splitting
//! with no stemming or stop words, and ties are broken by insertion order.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::ChunkRef;

/// BM25 tuning parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f32,
    /// Document length normalization
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Lower-case whitespace tokenization, the only policy the index supports
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Per-chunk posting data
#[derive(Debug, Clone)]
struct ChunkPostings {
    id: ChunkRef,
    term_freqs: AHashMap<String, u32>,
    token_count: usize,
}

/// BM25 index over the whole chunk set
///
/// Rebuilt wholesale on every corpus mutation; statistics (document
/// frequencies, average length, idf table) are therefore always consistent
/// with the indexed chunks by the time the index can be queried again.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    params: Bm25Params,
    /// Chunks in insertion order; search iterates this order so that equal
    /// scores keep a deterministic ranking
    chunks: Vec<ChunkPostings>,
    positions: AHashMap<ChunkRef, usize>,
    idf: AHashMap<String, f32>,
    avg_len: f32,
}

impl LexicalIndex {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            chunks: Vec::new(),
            positions: AHashMap::new(),
            idf: AHashMap::new(),
            avg_len: 0.0,
        }
    }

    /// Clear all prior state and recompute statistics from `chunks`.
    ///
    /// An empty input yields an index that returns no results; it is not an
    /// error.
    pub fn rebuild<I, S>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = (ChunkRef, S)>,
        S: AsRef<str>,
    {
        self.chunks.clear();
        self.positions.clear();
        self.idf.clear();
        self.avg_len = 0.0;

        let mut doc_freqs: AHashMap<String, u32> = AHashMap::new();
        let mut total_tokens = 0usize;

        for (id, text) in chunks {
            let tokens = tokenize(text.as_ref());
            total_tokens += tokens.len();

            let mut term_freqs: AHashMap<String, u32> = AHashMap::new();
            for token in tokens.iter() {
                *term_freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }

            self.positions.insert(id, self.chunks.len());
            self.chunks.push(ChunkPostings {
                id,
                token_count: tokens.len(),
                term_freqs,
            });
        }

        let n = self.chunks.len();
        if n > 0 {
            self.avg_len = total_tokens as f32 / n as f32;
        }

        for (term, df) in doc_freqs {
            let idf = ((n as f32 - df as f32 + 0.5) / (df as f32 + 0.5) + 1.0).ln();
            self.idf.insert(term, idf);
        }
    }

    /// BM25 score of one chunk against pre-tokenized query terms.
    ///
    /// Tokens outside the vocabulary contribute zero; an unindexed chunk
    /// scores zero.
    pub fn score(&self, query_tokens: &[String], chunk: ChunkRef) -> f32 {
        match self.positions.get(&chunk) {
            Some(&pos) => self.score_at(query_tokens, pos),
            None => 0.0,
        }
    }

    fn score_at(&self, query_tokens: &[String], pos: usize) -> f32 {
        let chunk = &self.chunks[pos];
        let len_ratio = if self.avg_len > 0.0 {
            chunk.token_count as f32 / self.avg_len
        } else {
            0.0
        };

        let mut score = 0.0;
        for token in query_tokens {
            let Some(&idf) = self.idf.get(token) else {
                continue;
            };
            let tf = chunk.term_freqs.get(token).copied().unwrap_or(0) as f32;
            let k1 = self.params.k1;
            let b = self.params.b;
            score += idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_ratio));
        }
        score
    }

    /// Score every indexed chunk and return the `k` highest.
    ///
    /// Zero-scoring chunks participate, so top-k is filled up to the
    /// available chunk count; the sort is stable, keeping insertion order
    /// among equal scores.
    pub fn search(&self, query: &str, k: usize) -> Vec<(ChunkRef, f32)> {
        if self.chunks.is_empty() {
            return Vec::new();
        }

        let query_tokens = tokenize(query);

        let mut scored: Vec<(ChunkRef, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(pos, chunk)| (chunk.id, self.score_at(&query_tokens, pos)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Corpus average chunk length in tokens
    pub fn avg_len(&self) -> f32 {
        self.avg_len
    }
}

impl Default for LexicalIndex {
    fn default() -> Self {
        Self::new(Bm25Params::default())
    }
}
