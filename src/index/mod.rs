//! Corpus indexing
//!
//! Two indexes over the same chunk set, sharing `ChunkRef` identities:
//! - `LexicalIndex` maintains BM25 posting statistics
//! - `VectorIndex` wraps an HNSW graph over dense embeddings

mod lexical;
mod vector;

pub use lexical::{tokenize, Bm25Params, LexicalIndex};
pub use vector::{DistanceMetric, VectorIndex, VectorIndexError};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of an indexed passage: source document plus position within it.
///
/// Identifiers are always caller-supplied; neither index infers them from
/// insertion position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRef {
    /// Identity of the source document
    pub doc_id: u64,
    /// Position of this chunk within the document
    pub chunk_id: u64,
}

impl ChunkRef {
    pub fn new(doc_id: u64, chunk_id: u64) -> Self {
        Self { doc_id, chunk_id }
    }

    /// Stable composite key used by the document metadata store
    pub fn storage_key(&self) -> String {
        format!("doc_{}_chunk_{}", self.doc_id, self.chunk_id)
    }
}

impl fmt::Display for ChunkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.doc_id, self.chunk_id)
    }
}

/// A passage of corpus text, immutable once indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk identity
    pub id: ChunkRef,

    /// Passage text
    pub text: String,

    /// Character count of the text
    pub length: usize,

    /// Opaque provenance mapping (source, year, jurisdiction, ...)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl DocumentChunk {
    pub fn new(
        id: ChunkRef,
        text: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        let text = text.into();
        let length = text.chars().count();
        Self {
            id,
            text,
            length,
            metadata,
        }
    }
}

/// Configuration for the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Vector dimension (must match the embedding provider)
    pub vector_dim: usize,
    /// Distance metric for nearest-neighbor search
    pub metric: DistanceMetric,
    /// HNSW construction parameter (higher = better recall, slower build)
    pub hnsw_ef_construction: usize,
    /// HNSW M parameter (number of connections per layer)
    pub hnsw_m: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            vector_dim: 384,
            metric: DistanceMetric::Euclidean,
            hnsw_ef_construction: 200,
            hnsw_m: 16,
        }
    }
}
