use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::llm::GenerationError;
use crate::retrieval::RetrieveError;

/// Main error type for the juris engine
#[derive(Error, Debug)]
pub enum JurisError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Malformed or out-of-domain query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Lexical and vector indexes diverged, or an ingestion batch was rejected
    #[error("Index inconsistency: {0}")]
    IndexInconsistency(String),

    /// Retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrieveError),

    /// Embedding collaborator errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Generation collaborator errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Session not found in the registry
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Database errors from the SQLite memory backend
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for juris operations
pub type Result<T> = std::result::Result<T, JurisError>;
