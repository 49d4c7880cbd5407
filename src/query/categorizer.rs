//! Keyword-based query categorization

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of query categories.
///
/// `Other` absorbs anything the keyword sets do not recognize, so pipeline
/// branching over categories stays exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    CaseComparison,
    CaseSummarization,
    DataRetrieval,
    SimilarCaseFinding,
    LegalAdvice,
    Other,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::CaseComparison => "case_comparison",
            QueryCategory::CaseSummarization => "case_summarization",
            QueryCategory::DataRetrieval => "data_retrieval",
            QueryCategory::SimilarCaseFinding => "similar_case_finding",
            QueryCategory::LegalAdvice => "legal_advice",
            QueryCategory::Other => "other",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const COMPARISON_KEYWORDS: &[&str] = &[
    "compare",
    "versus",
    "vs",
    "difference",
    "contrast",
    "distinguish",
    "comparison",
    "different",
];

const SUMMARIZATION_KEYWORDS: &[&str] = &[
    "summarize",
    "summary",
    "overview",
    "explain",
    "what is",
    "tell me about",
    "describe",
    "details",
    "information",
];

const DATA_RETRIEVAL_KEYWORDS: &[&str] = &[
    "penalty",
    "punishment",
    "fine",
    "section",
    "article",
    "provision",
    "requirement",
    "law",
    "act",
    "statute",
    "what are",
    "list",
    "define",
];

const SIMILAR_CASE_KEYWORDS: &[&str] = &[
    "similar",
    "like",
    "analogous",
    "precedent",
    "related",
    "comparable",
    "find",
    "search",
    "look for",
];

const ADVICE_KEYWORDS: &[&str] = &[
    "should",
    "can i",
    "am i",
    "what should",
    "how to",
    "advice",
    "help",
    "would",
    "could",
    "might",
    "liable",
    "responsible",
    "what if",
];

/// Categorizes queries by keyword density
#[derive(Debug, Default, Clone)]
pub struct QueryCategorizer;

impl QueryCategorizer {
    pub fn new() -> Self {
        Self
    }

    fn keyword_sets() -> [(QueryCategory, &'static [&'static str]); 5] {
        [
            (QueryCategory::CaseComparison, COMPARISON_KEYWORDS),
            (QueryCategory::CaseSummarization, SUMMARIZATION_KEYWORDS),
            (QueryCategory::DataRetrieval, DATA_RETRIEVAL_KEYWORDS),
            (QueryCategory::SimilarCaseFinding, SIMILAR_CASE_KEYWORDS),
            (QueryCategory::LegalAdvice, ADVICE_KEYWORDS),
        ]
    }

    fn score(query_lower: &str, keywords: &[&str]) -> f32 {
        let matches = keywords.iter().filter(|kw| query_lower.contains(*kw)).count();
        matches as f32 / keywords.len() as f32
    }

    /// Best-matching category and its confidence; `(Other, 0.0)` when no
    /// keyword set matches at all
    pub fn categorize(&self, query: &str) -> (QueryCategory, f32) {
        let query_lower = query.to_lowercase();

        let mut best = (QueryCategory::Other, 0.0f32);
        for (category, keywords) in Self::keyword_sets() {
            let score = Self::score(&query_lower, keywords);
            if score > best.1 {
                best = (category, score);
            }
        }
        best
    }

    /// All categories whose confidence clears `threshold`, highest first
    pub fn multi_category_detect(&self, query: &str, threshold: f32) -> Vec<(QueryCategory, f32)> {
        let query_lower = query.to_lowercase();

        let mut results: Vec<(QueryCategory, f32)> = Self::keyword_sets()
            .into_iter()
            .map(|(category, keywords)| (category, Self::score(&query_lower, keywords)))
            .filter(|(_, score)| *score >= threshold)
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_query() {
        let c = QueryCategorizer::new();
        let (category, confidence) = c.categorize("Compare the difference between these rulings");
        assert_eq!(category, QueryCategory::CaseComparison);
        assert!(confidence > 0.0);
    }

    #[test]
    fn test_advice_query() {
        let c = QueryCategorizer::new();
        let (category, _) = c.categorize("Should I be worried, am I liable for this?");
        assert_eq!(category, QueryCategory::LegalAdvice);
    }

    #[test]
    fn test_unrecognized_query_is_other() {
        let c = QueryCategorizer::new();
        let (category, confidence) = c.categorize("zxcvb qwerty");
        assert_eq!(category, QueryCategory::Other);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_multi_category_sorted() {
        let c = QueryCategorizer::new();
        let results = c.multi_category_detect("compare the penalty under this section", 0.01);
        assert!(results.len() >= 2);
        assert!(results.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
