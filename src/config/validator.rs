//! Configuration validation

use super::Config;
use crate::error::{JurisError, Result, ValidationError};

/// Validates a configuration, collecting every violation before failing
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "must be at least 1",
            ));
        }
        if config.retrieval.search_multiplier == 0 {
            errors.push(ValidationError::new(
                "retrieval.search_multiplier",
                "must be at least 1",
            ));
        }
        if config.retrieval.lexical_weight < 0.0 || config.retrieval.semantic_weight < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.lexical_weight/semantic_weight",
                "weights must be non-negative",
            ));
        }
        if config.retrieval.lexical_weight + config.retrieval.semantic_weight <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.lexical_weight/semantic_weight",
                "weights must sum to a positive value",
            ));
        }
        if config.retrieval.bm25_k1 < 0.0 {
            errors.push(ValidationError::new(
                "retrieval.bm25_k1",
                "must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&config.retrieval.bm25_b) {
            errors.push(ValidationError::new(
                "retrieval.bm25_b",
                "must be within [0, 1]",
            ));
        }

        if config.indexing.vector_dim == 0 {
            errors.push(ValidationError::new(
                "indexing.vector_dim",
                "must be at least 1",
            ));
        }
        if config.indexing.vector_dim != config.embedding.dimension {
            errors.push(ValidationError::new(
                "indexing.vector_dim",
                format!(
                    "must match embedding.dimension ({} != {})",
                    config.indexing.vector_dim, config.embedding.dimension
                ),
            ));
        }
        if config.indexing.hnsw_m == 0 || config.indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m/hnsw_ef_construction",
                "HNSW parameters must be at least 1",
            ));
        }

        if config.memory.session_max_turns == 0 {
            errors.push(ValidationError::new(
                "memory.session_max_turns",
                "must be at least 1",
            ));
        }
        if config.memory.session_ttl_secs <= 0 {
            errors.push(ValidationError::new(
                "memory.session_ttl_secs",
                "must be positive",
            ));
        }

        if !(0.0..=1.0).contains(&config.cache.reuse_threshold) {
            errors.push(ValidationError::new(
                "cache.reuse_threshold",
                "must be within [0, 1]",
            ));
        }
        if config.cache.max_age_days <= 0 {
            errors.push(ValidationError::new(
                "cache.max_age_days",
                "must be positive",
            ));
        }
        match config.cache.backend.as_str() {
            "memory" => {}
            "sqlite" => {
                if config.cache.db_path.is_none() {
                    errors.push(ValidationError::new(
                        "cache.db_path",
                        "required when cache.backend is 'sqlite'",
                    ));
                }
            }
            other => {
                errors.push(ValidationError::new(
                    "cache.backend",
                    format!("unknown backend '{}', expected 'memory' or 'sqlite'", other),
                ));
            }
        }

        if config.ingest.chunk_size == 0 {
            errors.push(ValidationError::new(
                "ingest.chunk_size",
                "must be at least 1",
            ));
        }
        if config.ingest.chunk_overlap >= config.ingest.chunk_size {
            errors.push(ValidationError::new(
                "ingest.chunk_overlap",
                "must be smaller than ingest.chunk_size",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "must be at least 1",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(JurisError::ConfigValidation { errors })
        }
    }
}
