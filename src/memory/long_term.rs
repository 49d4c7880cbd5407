//! Persistent long-term memory: response cache and document metadata

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;

/// Deterministic fingerprint of a normalized query, used as the cache key.
///
/// Normalization lower-cases and collapses whitespace so trivially restated
/// queries share a fingerprint.
pub fn query_fingerprint(query: &str) -> String {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

/// A cached answer with provenance, never mutated in place
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Generated answer text
    pub response: String,
    /// Source passages the answer was built from, in rank order
    pub sources: Vec<String>,
    /// Confidence in [0, 1]; gates reuse at the orchestrator
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

/// Per-chunk provenance record, written once at ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub metadata: HashMap<String, serde_json::Value>,
    pub stored_at: DateTime<Utc>,
}

/// Storage seam for the long-term tier.
///
/// Backends must tolerate concurrent lookups and stores; last-write-wins is
/// acceptable, torn records are not.
pub trait MemoryBackend: Send + Sync {
    fn put_response(&self, fingerprint: &str, record: &CachedResponse) -> Result<()>;
    fn get_response(&self, fingerprint: &str) -> Result<Option<CachedResponse>>;
    fn purge_responses_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn put_document(&self, key: &str, record: &DocumentRecord) -> Result<()>;
    fn get_document(&self, key: &str) -> Result<Option<DocumentRecord>>;

    fn response_count(&self) -> Result<usize>;
    fn document_count(&self) -> Result<usize>;
}

/// Long-term memory facade over a pluggable backend
pub struct LongTermMemory {
    backend: Box<dyn MemoryBackend>,
}

impl LongTermMemory {
    pub fn new(backend: Box<dyn MemoryBackend>) -> Self {
        Self { backend }
    }

    /// In-memory backed store, the default for tests and demos
    pub fn in_memory() -> Self {
        Self::new(Box::<InMemoryBackend>::default())
    }

    /// Upsert a cached answer; any prior record for the fingerprint is
    /// replaced wholesale
    pub fn store_response(
        &self,
        fingerprint: &str,
        response: impl Into<String>,
        sources: Vec<String>,
        confidence: f32,
    ) -> Result<()> {
        let record = CachedResponse {
            response: response.into(),
            sources,
            confidence,
            created_at: Utc::now(),
        };
        self.backend.put_response(fingerprint, &record)
    }

    /// Absence is a normal negative result, not an error
    pub fn lookup_response(&self, fingerprint: &str) -> Result<Option<CachedResponse>> {
        self.backend.get_response(fingerprint)
    }

    /// Delete every cached response older than `age`; returns how many went
    pub fn purge_older_than(&self, age: Duration) -> Result<usize> {
        self.backend.purge_responses_before(Utc::now() - age)
    }

    pub fn store_document_metadata(
        &self,
        key: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        let record = DocumentRecord {
            metadata,
            stored_at: Utc::now(),
        };
        self.backend.put_document(key, &record)
    }

    pub fn document_metadata(&self, key: &str) -> Result<Option<DocumentRecord>> {
        self.backend.get_document(key)
    }

    pub fn response_count(&self) -> Result<usize> {
        self.backend.response_count()
    }

    pub fn document_count(&self) -> Result<usize> {
        self.backend.document_count()
    }
}

/// Map-based backend; one valid persistence choice among others
#[derive(Default)]
pub struct InMemoryBackend {
    responses: RwLock<AHashMap<String, CachedResponse>>,
    documents: RwLock<AHashMap<String, DocumentRecord>>,
}

impl MemoryBackend for InMemoryBackend {
    fn put_response(&self, fingerprint: &str, record: &CachedResponse) -> Result<()> {
        self.responses
            .write()
            .unwrap()
            .insert(fingerprint.to_string(), record.clone());
        Ok(())
    }

    fn get_response(&self, fingerprint: &str) -> Result<Option<CachedResponse>> {
        Ok(self.responses.read().unwrap().get(fingerprint).cloned())
    }

    fn purge_responses_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut responses = self.responses.write().unwrap();
        let before = responses.len();
        responses.retain(|_, record| record.created_at >= cutoff);
        Ok(before - responses.len())
    }

    fn put_document(&self, key: &str, record: &DocumentRecord) -> Result<()> {
        self.documents
            .write()
            .unwrap()
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    fn get_document(&self, key: &str) -> Result<Option<DocumentRecord>> {
        Ok(self.documents.read().unwrap().get(key).cloned())
    }

    fn response_count(&self) -> Result<usize> {
        Ok(self.responses.read().unwrap().len())
    }

    fn document_count(&self) -> Result<usize> {
        Ok(self.documents.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_normalizes_case_and_whitespace() {
        assert_eq!(
            query_fingerprint("What is  Cheating?"),
            query_fingerprint("what is cheating?")
        );
        assert_ne!(
            query_fingerprint("what is cheating?"),
            query_fingerprint("what is theft?")
        );
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let ltm = LongTermMemory::in_memory();
        assert!(ltm.lookup_response("missing").unwrap().is_none());
    }

    #[test]
    fn test_store_is_upsert() {
        let ltm = LongTermMemory::in_memory();
        let fp = query_fingerprint("what is cheating?");

        ltm.store_response(&fp, "first answer", vec![], 0.5).unwrap();
        ltm.store_response(&fp, "second answer", vec!["src".to_string()], 0.9)
            .unwrap();

        let record = ltm.lookup_response(&fp).unwrap().unwrap();
        assert_eq!(record.response, "second answer");
        assert_eq!(record.sources, vec!["src"]);
        assert_eq!(ltm.response_count().unwrap(), 1);
    }

    #[test]
    fn test_purge_removes_only_old_records() {
        let ltm = LongTermMemory::in_memory();
        ltm.store_response("fresh", "answer", vec![], 0.9).unwrap();

        // Nothing is older than a day yet
        assert_eq!(ltm.purge_older_than(Duration::days(1)).unwrap(), 0);
        // Everything is older than "now minus negative age"
        assert_eq!(ltm.purge_older_than(Duration::seconds(-10)).unwrap(), 1);
        assert_eq!(ltm.response_count().unwrap(), 0);
    }

    #[test]
    fn test_document_metadata_roundtrip() {
        let ltm = LongTermMemory::in_memory();
        let mut meta = HashMap::new();
        meta.insert("source".to_string(), serde_json::json!("IPC"));

        ltm.store_document_metadata("doc_0_chunk_0", meta).unwrap();
        let record = ltm.document_metadata("doc_0_chunk_0").unwrap().unwrap();
        assert_eq!(record.metadata["source"], serde_json::json!("IPC"));
        assert_eq!(ltm.document_count().unwrap(), 1);
    }
}
