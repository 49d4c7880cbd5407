//! Hybrid retriever combining the lexical and vector indexes

use ahash::AHashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::index::{
    Bm25Params, ChunkRef, DocumentChunk, IndexConfig, LexicalIndex, VectorIndex, VectorIndexError,
};
use crate::retrieval::{fuse_scores, FusionError, FusionWeights, RetrievalConfig, ScoredPassage};

#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("Ingestion batch mismatch: {chunks} chunks but {embeddings} embeddings")]
    BatchMismatch { chunks: usize, embeddings: usize },

    #[error("Vector index error: {0}")]
    Vector(#[from] VectorIndexError),

    #[error("Fusion error: {0}")]
    Fusion(#[from] FusionError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Corpus chunks plus an identity lookup, guarded as one unit
struct Corpus {
    chunks: Vec<DocumentChunk>,
    by_id: AHashMap<ChunkRef, usize>,
}

/// Hybrid retriever
///
/// Owns both indexes and the chunk store. Reads take shared locks so
/// concurrent searches never block each other; ingestion takes the write
/// side of every lock and republishes consistent statistics before any
/// reader can observe the new corpus.
pub struct HybridRetriever {
    lexical: RwLock<LexicalIndex>,
    vector: RwLock<VectorIndex>,
    corpus: RwLock<Corpus>,
    weights: FusionWeights,
    config: RetrievalConfig,
}

impl HybridRetriever {
    /// Create an empty retriever
    pub fn new(config: RetrievalConfig, index_config: &IndexConfig) -> Result<Self, RetrieveError> {
        let weights = FusionWeights::new(config.lexical_weight, config.semantic_weight)?;
        let lexical = LexicalIndex::new(Bm25Params {
            k1: config.bm25_k1,
            b: config.bm25_b,
        });
        let vector = VectorIndex::new(
            index_config.vector_dim,
            index_config.metric,
            index_config.hnsw_ef_construction,
            index_config.hnsw_m,
        );

        Ok(Self {
            lexical: RwLock::new(lexical),
            vector: RwLock::new(vector),
            corpus: RwLock::new(Corpus {
                chunks: Vec::new(),
                by_id: AHashMap::new(),
            }),
            weights,
            config,
        })
    }

    /// Ingest a batch of chunks with their embeddings.
    ///
    /// The same ordered identities are pushed into both indexes; the batch is
    /// validated up front so a failure (count or dimensionality mismatch)
    /// leaves neither index advanced past the other.
    pub async fn add_documents(
        &self,
        chunks: Vec<DocumentChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize, RetrieveError> {
        if chunks.len() != embeddings.len() {
            return Err(RetrieveError::BatchMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut vector = self.vector.write().await;
        for embedding in &embeddings {
            if embedding.len() != vector.dimension() {
                return Err(VectorIndexError::InvalidDimension {
                    expected: vector.dimension(),
                    actual: embedding.len(),
                }
                .into());
            }
        }

        let mut corpus = self.corpus.write().await;
        let mut lexical = self.lexical.write().await;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            vector.add(chunk.id, embedding)?;
            let pos = corpus.chunks.len();
            corpus.by_id.insert(chunk.id, pos);
            corpus.chunks.push(chunk.clone());
        }

        // Batch rebuild: document frequencies and the average length are
        // recomputed before any reader can score against the new corpus
        lexical.rebuild(corpus.chunks.iter().map(|c| (c.id, c.text.as_str())));

        debug!(
            added = chunks.len(),
            total = corpus.chunks.len(),
            "ingested chunk batch"
        );

        Ok(chunks.len())
    }

    /// Hybrid search: both indexes queried independently, rankings fused.
    pub async fn search(
        &self,
        query: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPassage>, RetrieveError> {
        if query.trim().is_empty() {
            return Err(RetrieveError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }

        let padded = k.saturating_mul(self.config.search_multiplier.max(1));

        let (lexical_results, semantic_results) = tokio::join!(
            self.lexical_search(query, padded),
            self.semantic_search(query_embedding, padded)
        );
        let semantic_results = semantic_results?;

        let fused = fuse_scores(&lexical_results, &semantic_results, &self.weights, k);

        Ok(self.hydrate(fused).await)
    }

    async fn lexical_search(&self, query: &str, limit: usize) -> Vec<(ChunkRef, f32)> {
        let lexical = self.lexical.read().await;
        lexical.search(query, limit)
    }

    async fn semantic_search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(ChunkRef, f32)>, RetrieveError> {
        let vector = self.vector.read().await;
        Ok(vector.search(query_embedding, limit, self.config.hnsw_ef_search)?)
    }

    /// Resolve fused identities back to passage text and metadata
    async fn hydrate(&self, fused: Vec<(ChunkRef, f32)>) -> Vec<ScoredPassage> {
        let corpus = self.corpus.read().await;
        fused
            .into_iter()
            .filter_map(|(id, score)| {
                corpus.by_id.get(&id).map(|&pos| {
                    let chunk = &corpus.chunks[pos];
                    ScoredPassage {
                        id,
                        text: chunk.text.clone(),
                        score,
                        metadata: chunk.metadata.clone(),
                    }
                })
            })
            .collect()
    }

    /// Number of indexed chunks
    pub async fn len(&self) -> usize {
        self.corpus.read().await.chunks.len()
    }

    /// Check if the corpus is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Normalized fusion weights in effect
    pub fn weights(&self) -> FusionWeights {
        self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chunk(doc: u64, seq: u64, text: &str) -> DocumentChunk {
        DocumentChunk::new(ChunkRef::new(doc, seq), text, HashMap::new())
    }

    fn retriever(dim: usize) -> HybridRetriever {
        let index_config = IndexConfig {
            vector_dim: dim,
            ..IndexConfig::default()
        };
        HybridRetriever::new(RetrievalConfig::default(), &index_config).unwrap()
    }

    #[tokio::test]
    async fn test_empty_corpus_search_is_empty() {
        let r = retriever(4);
        let results = r.search("cheating", &[0.0; 4], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_batch_count_mismatch_rejected() {
        let r = retriever(4);
        let err = r
            .add_documents(vec![chunk(0, 0, "a"), chunk(0, 1, "b")], vec![vec![0.0; 4]])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieveError::BatchMismatch { .. }));
        assert!(r.is_empty().await);
    }

    #[tokio::test]
    async fn test_bad_dimension_leaves_both_indexes_unadvanced() {
        let r = retriever(4);
        let err = r
            .add_documents(
                vec![chunk(0, 0, "good"), chunk(0, 1, "bad")],
                vec![vec![0.1; 4], vec![0.1; 3]],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieveError::Vector(_)));
        assert_eq!(r.len().await, 0);
        assert_eq!(r.lexical.read().await.len(), 0);
        assert_eq!(r.vector.read().await.len(), 0);
    }

    #[tokio::test]
    async fn test_lexical_only_match_surfaces() {
        let r = retriever(4);
        r.add_documents(
            vec![
                chunk(0, 0, "Section 420 deals with cheating."),
                chunk(0, 1, "Contract law governs agreements."),
            ],
            vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]],
        )
        .await
        .unwrap();

        // Query embedding far from both stored vectors; lexical signal decides
        let results = r.search("cheating", &[0.0, 0.0, 1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].id, ChunkRef::new(0, 0));
    }

    #[tokio::test]
    async fn test_search_returns_passage_text() {
        let r = retriever(4);
        r.add_documents(
            vec![chunk(2, 0, "Murder carries a life sentence.")],
            vec![vec![0.5, 0.5, 0.0, 0.0]],
        )
        .await
        .unwrap();

        let results = r.search("sentence", &[0.5, 0.5, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "Murder carries a life sentence.");
        assert!(results[0].score > 0.0);
    }
}
