//! End-to-end pipeline tests with stub collaborators

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use juris::config::Config;
use juris::embedding::HashedEmbedder;
use juris::llm::{GenerationError, ResponseGenerator};
use juris::memory::{query_fingerprint, InMemoryBackend};
use juris::pipeline::{
    RagPipeline, GENERATION_FAILED_RESPONSE, NO_RESULTS_RESPONSE, OUT_OF_DOMAIN_RESPONSE,
};

/// Counts invocations; optionally fails every call
struct StubGenerator {
    calls: AtomicUsize,
    fail: bool,
}

impl StubGenerator {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResponseGenerator for StubGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(GenerationError::Backend("stub failure".to_string()))
        } else {
            Ok("stub answer".to_string())
        }
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.indexing.vector_dim = 32;
    config.embedding.dimension = 32;
    config
}

fn pipeline_with(generator: Arc<StubGenerator>) -> RagPipeline {
    RagPipeline::new(
        test_config(),
        Arc::new(HashedEmbedder::new(32)),
        generator,
        Box::<InMemoryBackend>::default(),
    )
    .unwrap()
}

fn sample_documents() -> Vec<String> {
    vec![
        "Section 420 deals with cheating and prescribes imprisonment up to seven years."
            .to_string(),
        "Contract law governs agreements between private parties.".to_string(),
    ]
}

#[tokio::test]
async fn out_of_domain_query_short_circuits() {
    let generator = Arc::new(StubGenerator::new(false));
    let pipeline = pipeline_with(generator.clone());
    pipeline
        .ingest_documents(&sample_documents(), None)
        .await
        .unwrap();

    let outcome = pipeline
        .process_query("pizza", Some("s1"))
        .await
        .unwrap();

    assert!(outcome.out_of_domain);
    assert_eq!(outcome.response, OUT_OF_DOMAIN_RESPONSE);
    assert_eq!(generator.calls(), 0);
    // Rejected queries do not pollute the cache or the session log
    assert_eq!(pipeline.long_term().response_count().unwrap(), 0);
    assert!(pipeline.sessions().get("s1").is_none());
}

#[tokio::test]
async fn fresh_query_generates_and_caches() {
    let generator = Arc::new(StubGenerator::new(false));
    let pipeline = pipeline_with(generator.clone());
    pipeline
        .ingest_documents(&sample_documents(), None)
        .await
        .unwrap();

    let query = "What is the penalty for cheating under Section 420?";
    let outcome = pipeline.process_query(query, Some("s1")).await.unwrap();

    assert!(!outcome.served_from_cache);
    assert_eq!(outcome.response, "stub answer");
    assert_eq!(generator.calls(), 1);
    assert!(!outcome.sources.is_empty());

    let cached = pipeline
        .long_term()
        .lookup_response(&query_fingerprint(query))
        .unwrap()
        .unwrap();
    assert_eq!(cached.response, "stub answer");
    assert!((cached.confidence - outcome.confidence).abs() < 1e-6);
}

#[tokio::test]
async fn reuse_gate_respects_threshold() {
    let generator = Arc::new(StubGenerator::new(false));
    let pipeline = pipeline_with(generator.clone());
    pipeline
        .ingest_documents(&sample_documents(), None)
        .await
        .unwrap();

    let query = "What does the law say about cheating?";
    let fp = query_fingerprint(query);

    // A 0.79-confidence record must never be served as a hit
    pipeline
        .long_term()
        .store_response(&fp, "stale answer", vec![], 0.79)
        .unwrap();

    let outcome = pipeline.process_query(query, None).await.unwrap();
    assert!(!outcome.served_from_cache);
    assert_eq!(generator.calls(), 1);
    // The low-confidence record was overwritten by the fresh pass
    let record = pipeline.long_term().lookup_response(&fp).unwrap().unwrap();
    assert_ne!(record.response, "stale answer");

    // A 0.81-confidence record is served verbatim, no retrieval or generation
    pipeline
        .long_term()
        .store_response(&fp, "good cached answer", vec!["src".to_string()], 0.81)
        .unwrap();

    let outcome = pipeline.process_query(query, None).await.unwrap();
    assert!(outcome.served_from_cache);
    assert_eq!(outcome.response, "good cached answer");
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn empty_retrieval_is_not_cached() {
    let generator = Arc::new(StubGenerator::new(false));
    let pipeline = pipeline_with(generator.clone());
    // No documents ingested

    let outcome = pipeline
        .process_query("What is the penalty for cheating?", Some("s1"))
        .await
        .unwrap();

    assert_eq!(outcome.response, NO_RESULTS_RESPONSE);
    assert_eq!(generator.calls(), 0);
    assert_eq!(pipeline.long_term().response_count().unwrap(), 0);
}

#[tokio::test]
async fn generation_failure_yields_fixed_response_without_caching() {
    let generator = Arc::new(StubGenerator::new(true));
    let pipeline = pipeline_with(generator.clone());
    pipeline
        .ingest_documents(&sample_documents(), None)
        .await
        .unwrap();

    let outcome = pipeline
        .process_query("What is the penalty for cheating?", Some("s1"))
        .await
        .unwrap();

    assert_eq!(outcome.response, GENERATION_FAILED_RESPONSE);
    assert_eq!(generator.calls(), 1);
    assert_eq!(pipeline.long_term().response_count().unwrap(), 0);
}

#[tokio::test]
async fn every_completed_pass_records_one_turn() {
    let generator = Arc::new(StubGenerator::new(false));
    let pipeline = pipeline_with(generator.clone());
    pipeline
        .ingest_documents(&sample_documents(), None)
        .await
        .unwrap();

    let query = "What is the penalty for cheating under the law?";
    pipeline.process_query(query, Some("s1")).await.unwrap();
    // Second pass is a cache hit; it still records exactly one turn
    pipeline.process_query(query, Some("s1")).await.unwrap();

    let session = pipeline.sessions().get("s1").unwrap();
    assert_eq!(session.lock().unwrap().len(), 2);

    let context = pipeline.session_context("s1").unwrap();
    assert!(context.contains("User: What is the penalty for cheating under the law?"));
}

#[tokio::test]
async fn ingestion_writes_metadata_records() {
    let generator = Arc::new(StubGenerator::new(false));
    let pipeline = pipeline_with(generator);

    let mut meta = std::collections::HashMap::new();
    meta.insert("source".to_string(), serde_json::json!("IPC"));
    let chunks = pipeline
        .ingest_documents(&sample_documents(), Some(&[meta.clone(), meta]))
        .await
        .unwrap();
    assert!(chunks >= 2);

    let stats = pipeline.stats().await.unwrap();
    assert_eq!(stats.indexed_chunks, chunks);
    assert_eq!(stats.document_records, chunks);

    let record = pipeline
        .long_term()
        .document_metadata("doc_0_chunk_0")
        .unwrap()
        .unwrap();
    assert_eq!(record.metadata["source"], serde_json::json!("IPC"));
}

#[tokio::test]
async fn clear_session_empties_history() {
    let generator = Arc::new(StubGenerator::new(false));
    let pipeline = pipeline_with(generator);
    pipeline
        .ingest_documents(&sample_documents(), None)
        .await
        .unwrap();

    pipeline
        .process_query("Is this contract breach actionable?", Some("s1"))
        .await
        .unwrap();
    assert!(pipeline.clear_session("s1"));

    let session = pipeline.sessions().get("s1").unwrap();
    assert_eq!(session.lock().unwrap().len(), 0);
    assert!(!pipeline.clear_session("missing"));
}
