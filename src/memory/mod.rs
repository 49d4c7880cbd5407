//! Two-tier memory
//!
//! Short-term: a bounded, per-session log of recent conversation turns with
//! lazy TTL expiry. Long-term: a persistent response cache and document
//! metadata store behind a pluggable backend (in-memory or SQLite).

mod long_term;
mod registry;
mod short_term;
mod sqlite;

pub use long_term::{
    query_fingerprint, CachedResponse, DocumentRecord, InMemoryBackend, LongTermMemory,
    MemoryBackend,
};
pub use registry::{SessionHandle, SessionRegistry};
pub use short_term::{ConversationTurn, SessionMemory};
pub use sqlite::SqliteBackend;

use serde::{Deserialize, Serialize};

/// Configuration for session memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum turns retained per session
    pub session_max_turns: usize,
    /// Idle seconds before a session counts as expired
    pub session_ttl_secs: i64,
    /// Turns included when building conversational context
    pub context_lookback: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            session_max_turns: 10,
            session_ttl_secs: 3600,
            context_lookback: 5,
        }
    }
}

/// Configuration for the long-term response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cached answers are reused only above this confidence
    pub reuse_threshold: f32,
    /// Age in days after which `purge` removes records
    pub max_age_days: i64,
    /// Backend selector: "memory" or "sqlite"
    pub backend: String,
    /// Database path for the sqlite backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<std::path::PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reuse_threshold: 0.8,
            max_age_days: 30,
            backend: "memory".to_string(),
            db_path: None,
        }
    }
}
