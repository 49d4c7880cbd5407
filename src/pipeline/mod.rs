//! Request orchestration
//!
//! Per-query control flow: Validate -> Categorize -> CacheLookup ->
//! {CacheHit | Retrieve -> Generate} -> RecordTurn -> Respond. The
//! orchestrator is the only place internal failures are converted into
//! user-facing responses; indexes and caches below it signal absence, not
//! errors, for ordinary misses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{ChunkRef, DocumentChunk};
use crate::ingest::{DocumentChunker, TextCleaner};
use crate::llm::{PromptTemplates, ResponseGenerator};
use crate::memory::{query_fingerprint, LongTermMemory, MemoryBackend, SessionRegistry};
use crate::query::{QueryCategorizer, QueryCategory, QueryEnricher, QueryValidator};
use crate::retrieval::HybridRetriever;

/// Fixed response for out-of-domain queries
pub const OUT_OF_DOMAIN_RESPONSE: &str = "I'm sorry, but your question does not appear to be \
     related to legal matters. Please ask a legal question and I'll be happy to help.";

/// Fixed response when retrieval finds nothing
pub const NO_RESULTS_RESPONSE: &str =
    "No relevant legal documents were found for your question.";

/// Fixed response when the generation collaborator fails
pub const GENERATION_FAILED_RESPONSE: &str =
    "I ran into a problem while preparing an answer. Please try again.";

/// Outcome of one pass through the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub query: String,
    pub response: String,
    pub category: QueryCategory,
    pub category_confidence: f32,
    /// Source passages behind the answer, in rank order
    pub sources: Vec<String>,
    /// Confidence of the answer (mean fused score of its passages)
    pub confidence: f32,
    pub served_from_cache: bool,
    /// Query was rejected before touching any index or cache
    pub out_of_domain: bool,
    pub session_id: Option<String>,
}

/// Aggregate counters for observability
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub indexed_chunks: usize,
    pub cached_responses: usize,
    pub document_records: usize,
    pub active_sessions: usize,
}

/// The retrieval-augmented QA pipeline
pub struct RagPipeline {
    validator: QueryValidator,
    categorizer: QueryCategorizer,
    enricher: QueryEnricher,
    cleaner: TextCleaner,
    chunker: DocumentChunker,
    retriever: HybridRetriever,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn ResponseGenerator>,
    long_term: LongTermMemory,
    sessions: SessionRegistry,
    config: Config,
    next_doc_id: AtomicU64,
}

impl RagPipeline {
    /// Assemble a pipeline from its collaborators.
    ///
    /// The embedding provider's dimension must match the configured vector
    /// dimension; that mismatch is a construction error, not a per-query one.
    pub fn new(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn ResponseGenerator>,
        backend: Box<dyn MemoryBackend>,
    ) -> Result<Self> {
        if embedder.dimension() != config.indexing.vector_dim {
            return Err(crate::JurisError::IndexInconsistency(format!(
                "embedding provider dimension {} does not match configured vector dimension {}",
                embedder.dimension(),
                config.indexing.vector_dim
            )));
        }

        let retriever = HybridRetriever::new(config.retrieval.clone(), &config.indexing)?;
        let sessions = SessionRegistry::new(
            config.memory.session_max_turns,
            chrono::Duration::seconds(config.memory.session_ttl_secs),
        );
        let chunker = DocumentChunker::new(
            config.ingest.chunk_strategy,
            config.ingest.chunk_size,
            config.ingest.chunk_overlap,
        );

        info!(
            model = embedder.model_name(),
            dim = embedder.dimension(),
            "pipeline initialized"
        );

        Ok(Self {
            validator: QueryValidator::new(),
            categorizer: QueryCategorizer::new(),
            enricher: QueryEnricher::new(),
            cleaner: TextCleaner::new(),
            chunker,
            retriever,
            embedder,
            generator,
            long_term: LongTermMemory::new(backend),
            sessions,
            config,
            next_doc_id: AtomicU64::new(0),
        })
    }

    /// Ingest raw documents: clean, chunk, embed, and index.
    ///
    /// Each document's chunks land in both indexes under the same
    /// identities before any metadata record is written, so a rejected
    /// batch leaves no trace.
    pub async fn ingest_documents(
        &self,
        documents: &[String],
        metadata: Option<&[HashMap<String, serde_json::Value>]>,
    ) -> Result<usize> {
        let mut chunks = Vec::new();
        let mut texts = Vec::new();

        for (offset, document) in documents.iter().enumerate() {
            let doc_id = self.next_doc_id.fetch_add(1, Ordering::SeqCst);
            let cleaned = self.cleaner.clean(document);

            for (chunk_idx, piece) in self.chunker.chunk(&cleaned).into_iter().enumerate() {
                let id = ChunkRef::new(doc_id, chunk_idx as u64);

                let mut chunk_meta: HashMap<String, serde_json::Value> = HashMap::new();
                chunk_meta.insert("doc_id".to_string(), serde_json::json!(doc_id));
                chunk_meta.insert("chunk_id".to_string(), serde_json::json!(chunk_idx));
                chunk_meta.insert("chunk_length".to_string(), serde_json::json!(piece.len()));
                if let Some(meta_list) = metadata {
                    if let Some(doc_meta) = meta_list.get(offset) {
                        chunk_meta.extend(doc_meta.clone());
                    }
                }

                texts.push(piece.clone());
                chunks.push(DocumentChunk::new(id, piece, chunk_meta));
            }
        }

        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(&texts)?;

        let added = self.retriever.add_documents(chunks.clone(), embeddings).await?;

        for chunk in &chunks {
            self.long_term
                .store_document_metadata(&chunk.id.storage_key(), chunk.metadata.clone())?;
        }

        info!(documents = documents.len(), chunks = added, "ingestion complete");
        Ok(added)
    }

    /// Process one query end to end.
    pub async fn process_query(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> Result<QueryOutcome> {
        debug!(query, "processing query");

        // Validate: rejection short-circuits without touching index or cache
        if !self.validator.is_in_domain(query) {
            warn!(query, "query rejected as out of domain");
            return Ok(QueryOutcome {
                query: query.to_string(),
                response: OUT_OF_DOMAIN_RESPONSE.to_string(),
                category: QueryCategory::Other,
                category_confidence: 0.0,
                sources: Vec::new(),
                confidence: 0.0,
                served_from_cache: false,
                out_of_domain: true,
                session_id: session_id.map(str::to_string),
            });
        }

        let (category, category_confidence) = self.categorizer.categorize(query);
        let enriched = self.enricher.enrich(query);
        debug!(
            category = %category,
            jurisdiction = enriched.jurisdiction.as_str(),
            "query classified"
        );

        let fingerprint = query_fingerprint(query);
        let cached = self.long_term.lookup_response(&fingerprint)?;

        let reusable = cached
            .filter(|record| record.confidence > self.config.cache.reuse_threshold);

        let (response, sources, confidence, served_from_cache) = match reusable {
            Some(record) => {
                info!(fingerprint = fingerprint.as_str(), "serving cached response");
                (record.response, record.sources, record.confidence, true)
            }
            None => {
                let (response, sources, confidence) =
                    self.retrieve_and_generate(query, category, &fingerprint).await?;
                (response, sources, confidence, false)
            }
        };

        // Record exactly one turn for the completed pass
        if let Some(id) = session_id {
            let session = self.sessions.get_or_create(id);
            session
                .lock()
                .unwrap()
                .add_turn(query, response.as_str(), Some(category));
        }

        Ok(QueryOutcome {
            query: query.to_string(),
            response,
            category,
            category_confidence,
            sources,
            confidence,
            served_from_cache,
            out_of_domain: false,
            session_id: session_id.map(str::to_string),
        })
    }

    /// Fresh retrieval + generation, entered only on a cache miss or a
    /// low-confidence hit. No side effects happen before the final cache
    /// store, so abandoned queries leave everything consistent.
    async fn retrieve_and_generate(
        &self,
        query: &str,
        category: QueryCategory,
        fingerprint: &str,
    ) -> Result<(String, Vec<String>, f32)> {
        let query_embedding = match self.embedder.embed(query) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(query, error = %e, "query embedding failed");
                return Ok((GENERATION_FAILED_RESPONSE.to_string(), Vec::new(), 0.0));
            }
        };

        let passages = self
            .retriever
            .search(query, &query_embedding, self.config.retrieval.top_k)
            .await?;

        if passages.is_empty() {
            // A no-answer is not cached as a positive result
            info!(query, "retrieval returned no passages");
            return Ok((NO_RESULTS_RESPONSE.to_string(), Vec::new(), 0.0));
        }

        let context = passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = PromptTemplates::for_category(category, query, &context);

        let answer = match self.generator.generate(&prompt) {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!(query, "generator returned an empty answer");
                return Ok((GENERATION_FAILED_RESPONSE.to_string(), Vec::new(), 0.0));
            }
            Err(e) => {
                warn!(query, error = %e, "generation failed");
                return Ok((GENERATION_FAILED_RESPONSE.to_string(), Vec::new(), 0.0));
            }
        };

        // Confidence is the mean fused score of the passages the answer was
        // built from, clamped into the cache's [0, 1] contract
        let mean_score =
            passages.iter().map(|p| p.score).sum::<f32>() / passages.len() as f32;
        let confidence = mean_score.clamp(0.0, 1.0);

        let sources: Vec<String> = passages.into_iter().map(|p| p.text).collect();
        self.long_term
            .store_response(fingerprint, answer.as_str(), sources.clone(), confidence)?;

        Ok((answer, sources, confidence))
    }

    /// Formatted conversational context for a session, if it exists
    pub fn session_context(&self, session_id: &str) -> Option<String> {
        let session = self.sessions.get(session_id)?;
        let session = session.lock().unwrap();
        Some(session.get_context(self.config.memory.context_lookback))
    }

    /// Drop all turns for a session
    pub fn clear_session(&self, session_id: &str) -> bool {
        match self.sessions.get(session_id) {
            Some(session) => {
                session.lock().unwrap().clear();
                true
            }
            None => false,
        }
    }

    /// Remove idle sessions past their TTL
    pub fn expire_idle_sessions(&self) -> usize {
        self.sessions.expire_idle()
    }

    /// Periodic maintenance: drop cached responses older than the configured
    /// maximum age
    pub fn purge_stale_cache(&self) -> Result<usize> {
        self.long_term
            .purge_older_than(chrono::Duration::days(self.config.cache.max_age_days))
    }

    /// Long-term memory accessor
    pub fn long_term(&self) -> &LongTermMemory {
        &self.long_term
    }

    /// Session registry accessor
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub async fn stats(&self) -> Result<PipelineStats> {
        Ok(PipelineStats {
            indexed_chunks: self.retriever.len().await,
            cached_responses: self.long_term.response_count()?,
            document_records: self.long_term.document_count()?,
            active_sessions: self.sessions.len(),
        })
    }
}
