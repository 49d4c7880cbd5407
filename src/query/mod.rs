//! Query processing
//!
//! Stateless classifiers consumed by the pipeline before retrieval:
//! domain validation, categorization, and enrichment.

mod categorizer;
mod enricher;
mod validator;

pub use categorizer::{QueryCategorizer, QueryCategory};
pub use enricher::{EnrichedQuery, QueryEnricher};
pub use validator::QueryValidator;
