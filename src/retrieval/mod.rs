//! Hybrid retrieval
//!
//! Lexical and semantic searches run independently and their rankings are
//! merged by weighted score fusion into one ordered passage list.

mod fusion;
mod hybrid;

pub use fusion::{fuse_scores, FusionError, FusionWeights};
pub use hybrid::{HybridRetriever, RetrieveError};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::index::ChunkRef;

/// A retrieved passage with its fused relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// Chunk identity
    pub id: ChunkRef,

    /// Passage text
    pub text: String,

    /// Fused relevance score, higher is better
    pub score: f32,

    /// Provenance metadata carried from ingestion
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ScoredPassage {
    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            self.text.clone()
        } else {
            let cut: String = self.text.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

/// Configuration for hybrid retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results returned per query
    pub top_k: usize,
    /// Each side retrieves `top_k * search_multiplier` candidates before fusion
    pub search_multiplier: usize,
    /// Weight of the lexical ranking in fusion
    pub lexical_weight: f32,
    /// Weight of the semantic ranking in fusion
    pub semantic_weight: f32,
    /// BM25 term frequency saturation
    pub bm25_k1: f32,
    /// BM25 length normalization
    pub bm25_b: f32,
    /// HNSW search parameter (higher = better recall, slower search)
    pub hnsw_ef_search: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            search_multiplier: 2,
            lexical_weight: 0.4,
            semantic_weight: 0.6,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            hnsw_ef_search: 200,
        }
    }
}
