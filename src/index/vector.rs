//! HNSW vector index for similarity search
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ChunkRef;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// Distance metric used for nearest-neighbor search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance, converted to similarity as `1 / (1 + d)`
    Euclidean,
    /// Inner product on (typically normalized) vectors, used directly
    InnerProduct,
}

/// The graph is monomorphized per distance type, so the metric is fixed at
/// construction.
enum AnnGraph {
    Euclidean(Hnsw<'static, f32, DistL2>),
    InnerProduct(Hnsw<'static, f32, DistDot>),
}

/// HNSW vector index wrapper
///
/// One embedding per chunk, stored in insertion order; internal ordinals are
/// inverted back to `ChunkRef` identities on search.
pub struct VectorIndex {
    graph: AnnGraph,
    dimension: usize,
    metric: DistanceMetric,
    /// Ordinal -> chunk identity, in insertion order
    ids: Vec<ChunkRef>,
}

/// Estimated element count passed to the HNSW allocator; inserts beyond it
/// still succeed.
const CAPACITY_HINT: usize = 100_000;
const MAX_LAYERS: usize = 16;

impl VectorIndex {
    /// Create a new vector index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `metric` - Distance metric
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `m` - HNSW M parameter (number of connections per layer)
    pub fn new(dimension: usize, metric: DistanceMetric, ef_construction: usize, m: usize) -> Self {
        let graph = match metric {
            DistanceMetric::Euclidean => AnnGraph::Euclidean(Hnsw::<f32, DistL2>::new(
                m,
                CAPACITY_HINT,
                MAX_LAYERS,
                ef_construction,
                DistL2,
            )),
            DistanceMetric::InnerProduct => AnnGraph::InnerProduct(Hnsw::<f32, DistDot>::new(
                m,
                CAPACITY_HINT,
                MAX_LAYERS,
                ef_construction,
                DistDot,
            )),
        };

        Self {
            graph,
            dimension,
            metric,
            ids: Vec::new(),
        }
    }

    /// Append one embedding under the given chunk identity.
    ///
    /// Dimensionality mismatch is a configuration error, never a silent
    /// truncation.
    pub fn add(&mut self, id: ChunkRef, embedding: &[f32]) -> Result<(), VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let data = embedding.to_vec();
        let ordinal = self.ids.len();
        match &mut self.graph {
            AnnGraph::Euclidean(hnsw) => hnsw.insert((&data, ordinal)),
            AnnGraph::InnerProduct(hnsw) => hnsw.insert((&data, ordinal)),
        }
        self.ids.push(id);

        Ok(())
    }

    /// Append multiple embeddings
    pub fn add_batch(&mut self, items: &[(ChunkRef, Vec<f32>)]) -> Result<(), VectorIndexError> {
        for (id, embedding) in items {
            self.add(*id, embedding)?;
        }
        Ok(())
    }

    /// Search for the `k` nearest neighbors of `query`.
    ///
    /// Returns at most `min(k, indexed_count)` pairs of (chunk, similarity),
    /// highest similarity first. An empty index yields an empty list.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(ChunkRef, f32)>, VectorIndexError> {
        if self.ids.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.ids.len());
        let neighbours = match &self.graph {
            AnnGraph::Euclidean(hnsw) => hnsw.search(query, k, ef_search),
            AnnGraph::InnerProduct(hnsw) => hnsw.search(query, k, ef_search),
        };

        let results = neighbours
            .into_iter()
            .map(|n| {
                let similarity = match self.metric {
                    // Bounded similarity in (0, 1], higher is closer
                    DistanceMetric::Euclidean => 1.0 / (1.0 + n.distance),
                    // DistDot reports 1 - dot, so invert back
                    DistanceMetric::InnerProduct => 1.0 - n.distance,
                };
                (self.ids[n.d_id], similarity)
            })
            .collect();

        Ok(results)
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Configured distance metric
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
