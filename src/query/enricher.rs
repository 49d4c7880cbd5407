//! Query enrichment: jurisdiction, legal domain, and entity extraction

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Enriched view of a query, attached to outcomes for observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedQuery {
    pub original_query: String,
    pub query_length: usize,
    pub jurisdiction: String,
    pub legal_domains: Vec<String>,
    /// Section/article numbers referenced in the query
    pub statute_refs: Vec<String>,
    /// "X v. Y" style case citations
    pub case_citations: Vec<String>,
    pub key_terms: Vec<String>,
}

const KEY_TERMS: &[&str] = &[
    "plaintiff",
    "defendant",
    "appellant",
    "respondent",
    "petitioner",
    "liability",
    "damages",
    "injunction",
    "subpoena",
    "deposition",
    "discovery",
    "negligence",
    "breach",
    "contract",
    "tort",
    "defamation",
    "slander",
    "libel",
    "fraud",
    "misrepresentation",
    "conviction",
    "acquittal",
    "appeal",
    "writ",
];

/// Enriches queries with jurisdiction, domain, and entity metadata
pub struct QueryEnricher {
    statute_re: Regex,
    citation_re: Regex,
    domain_keywords: HashMap<&'static str, Vec<&'static str>>,
}

impl Default for QueryEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEnricher {
    pub fn new() -> Self {
        let mut domain_keywords = HashMap::new();
        domain_keywords.insert(
            "criminal",
            vec!["crime", "criminal", "penal", "conviction", "sentence"],
        );
        domain_keywords.insert(
            "civil",
            vec!["civil", "tort", "contract", "damages", "liability"],
        );
        domain_keywords.insert(
            "constitutional",
            vec!["constitutional", "fundamental", "rights", "amendment"],
        );
        domain_keywords.insert(
            "corporate",
            vec!["corporate", "company", "shareholder", "director"],
        );
        domain_keywords.insert(
            "intellectual_property",
            vec!["patent", "trademark", "copyright"],
        );
        domain_keywords.insert(
            "family",
            vec!["marriage", "divorce", "custody", "inheritance", "succession"],
        );
        domain_keywords.insert(
            "labor",
            vec!["employment", "labor", "wage", "discrimination", "strike"],
        );

        Self {
            // "Section 420", "Article 21", "Sec. 154"
            statute_re: Regex::new(r"(?i)(?:section|article|sec|art)\s*\.?\s*(\d+[a-z]*)")
                .expect("statute regex is valid"),
            // "John v. Smith"
            citation_re: Regex::new(r"([A-Z][a-z]+)\s+(?:v\.|versus)\s+([A-Z][a-z]+)")
                .expect("citation regex is valid"),
            domain_keywords,
        }
    }

    pub fn enrich(&self, query: &str) -> EnrichedQuery {
        let query_lower = query.to_lowercase();

        EnrichedQuery {
            original_query: query.to_string(),
            query_length: query.chars().count(),
            jurisdiction: self.detect_jurisdiction(&query_lower),
            legal_domains: self.detect_domains(&query_lower),
            statute_refs: self
                .statute_re
                .captures_iter(query)
                .map(|c| c[1].to_string())
                .collect(),
            case_citations: self
                .citation_re
                .captures_iter(query)
                .map(|c| format!("{} v {}", &c[1], &c[2]))
                .collect(),
            key_terms: KEY_TERMS
                .iter()
                .filter(|t| query_lower.contains(*t))
                .map(|t| t.to_string())
                .collect(),
        }
    }

    fn detect_jurisdiction(&self, query_lower: &str) -> String {
        if query_lower.contains("india") || query_lower.contains("ipc") {
            "India".to_string()
        } else if query_lower.contains("united states") || query_lower.contains(" us ") {
            "United States".to_string()
        } else if query_lower.contains("united kingdom")
            || query_lower.contains(" uk ")
            || query_lower.contains("england")
        {
            "United Kingdom".to_string()
        } else if query_lower.contains("australia") {
            "Australia".to_string()
        } else if query_lower.contains("canada") {
            "Canada".to_string()
        } else {
            "General".to_string()
        }
    }

    fn detect_domains(&self, query_lower: &str) -> Vec<String> {
        let mut domains: Vec<String> = self
            .domain_keywords
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| query_lower.contains(kw)))
            .map(|(domain, _)| domain.to_string())
            .collect();
        domains.sort();

        if domains.is_empty() {
            domains.push("general_legal".to_string());
        }
        domains
    }
}
