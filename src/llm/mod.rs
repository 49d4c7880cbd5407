//! Response generation
//!
//! The language model is an external collaborator behind
//! [`ResponseGenerator`]; failures are recoverable errors the pipeline
//! converts into a fixed user-facing response. Prompt construction is
//! category-specific.

use thiserror::Error;

use crate::query::QueryCategory;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation backend failed: {0}")]
    Backend(String),

    #[error("Generation produced an empty answer")]
    EmptyAnswer,
}

/// Trait for answer generation backends
pub trait ResponseGenerator: Send + Sync {
    /// Generate an answer for the fully rendered prompt
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Prompt templates for the supported query categories
pub struct PromptTemplates;

impl PromptTemplates {
    pub fn qa(query: &str, context: &str) -> String {
        format!(
            "You are a legal expert AI assistant. Answer the following legal query based on the provided context.\n\n\
             Context:\n{context}\n\n\
             Query: {query}\n\n\
             Provide a comprehensive, accurate answer citing relevant legal principles and case law where applicable."
        )
    }

    pub fn comparison(context: &str) -> String {
        format!(
            "You are a legal expert. Analyze and compare the following legal cases or laws.\n\n\
             {context}\n\n\
             Provide a detailed comparison highlighting key similarities, differences, and implications."
        )
    }

    pub fn summary(context: &str) -> String {
        format!(
            "You are a legal expert. Summarize the following legal case or information concisely.\n\n\
             {context}\n\n\
             Provide a clear, concise summary highlighting key points, holdings, and implications."
        )
    }

    pub fn advice(query: &str, context: &str) -> String {
        format!(
            "You are a legal advisor. Based on the following information, provide legal guidance.\n\n\
             Query: {query}\n\n\
             Relevant Information:\n{context}\n\n\
             Provide practical legal guidance while noting that this is not a substitute for professional legal counsel."
        )
    }

    /// Pick the template matching the query category
    pub fn for_category(category: QueryCategory, query: &str, context: &str) -> String {
        match category {
            QueryCategory::CaseComparison => Self::comparison(context),
            QueryCategory::CaseSummarization => Self::summary(context),
            QueryCategory::LegalAdvice => Self::advice(query, context),
            QueryCategory::DataRetrieval
            | QueryCategory::SimilarCaseFinding
            | QueryCategory::Other => Self::qa(query, context),
        }
    }
}

/// Offline generator that answers verbatim from the retrieved context.
///
/// Useful where no model backend is configured (demos, tests): it returns
/// the leading portion of the context the prompt carried.
pub struct ExtractiveGenerator {
    max_chars: usize,
}

impl ExtractiveGenerator {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(600)
    }
}

impl ResponseGenerator for ExtractiveGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        // The context block sits between the first and last blank lines of
        // every template
        let context = prompt.split("\n\n").nth(1).unwrap_or(prompt).trim();

        if context.is_empty() {
            return Err(GenerationError::EmptyAnswer);
        }

        let excerpt: String = context.chars().take(self.max_chars).collect();
        Ok(format!("Based on the indexed materials: {excerpt}"))
    }
}
