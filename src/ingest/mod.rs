//! Document ingestion utilities
//!
//! Pure text transforms applied once per document before indexing:
//! cleaning/normalization and splitting into passages. No side effects.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Cleans and normalizes raw document text
pub struct TextCleaner {
    whitespace_re: Regex,
    disallowed_re: Regex,
    sec_re: Regex,
    art_re: Regex,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            whitespace_re: Regex::new(r"\s+").expect("whitespace regex is valid"),
            // Keep word characters, whitespace, and common legal punctuation
            disallowed_re: Regex::new(r"[^\w\s.,:;\-()/]").expect("filter regex is valid"),
            sec_re: Regex::new(r"Sec\.?\s*(\d+)").expect("section regex is valid"),
            art_re: Regex::new(r"Art\.?\s*(\d+)").expect("article regex is valid"),
        }
    }

    /// Collapse whitespace, drop stray characters, trim
    pub fn clean(&self, text: &str) -> String {
        let collapsed = self.whitespace_re.replace_all(text, " ");
        let filtered = self.disallowed_re.replace_all(&collapsed, "");
        filtered.trim().to_string()
    }

    /// Expand abbreviated statute references ("Sec. 420" -> "Section 420")
    pub fn normalize_citations(&self, text: &str) -> String {
        let text = self.sec_re.replace_all(text, "Section $1");
        let text = self.art_re.replace_all(&text, "Article $1");
        text.into_owned()
    }
}

/// Splitting strategy for [`DocumentChunker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Accumulate sentences up to the size limit, with sentence-boundary overlap
    Sentence,
    /// Accumulate blank-line-separated paragraphs up to the size limit
    Paragraph,
}

/// Splits cleaned documents into passages for indexing
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    strategy: ChunkStrategy,
    chunk_size: usize,
    overlap: usize,
}

impl DocumentChunker {
    /// `chunk_size` and `overlap` are approximate character budgets
    pub fn new(strategy: ChunkStrategy, chunk_size: usize, overlap: usize) -> Self {
        Self {
            strategy,
            chunk_size,
            overlap,
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        match self.strategy {
            ChunkStrategy::Sentence => self.chunk_sentences(text),
            ChunkStrategy::Paragraph => self.chunk_paragraphs(text),
        }
    }

    fn chunk_sentences(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.len();

            if current_len + sentence_len > self.chunk_size && !current.is_empty() {
                chunks.push(current.join(" "));

                // Carry trailing sentences into the next chunk as overlap
                let mut overlap_sentences: Vec<&str> = Vec::new();
                let mut overlap_len = 0usize;
                for s in current.iter().rev() {
                    if overlap_len + s.len() > self.overlap {
                        break;
                    }
                    overlap_len += s.len();
                    overlap_sentences.insert(0, s);
                }

                current = overlap_sentences;
                current.push(sentence);
                current_len = overlap_len + sentence_len;
            } else {
                current.push(sentence);
                current_len += sentence_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }

    fn chunk_paragraphs(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0usize;

        for para in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
            let para_len = para.len();

            if current_len + para_len > self.chunk_size && !current.is_empty() {
                chunks.push(current.join("\n\n"));
                current = vec![para];
                current_len = para_len;
            } else {
                current.push(para);
                current_len += para_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join("\n\n"));
        }

        chunks
    }
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(ChunkStrategy::Sentence, 512, 50)
    }
}

/// Split on sentence terminators followed by whitespace, keeping the
/// terminator with its sentence
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_was_terminator = false;

    for (idx, ch) in text.char_indices() {
        if prev_was_terminator && ch.is_whitespace() {
            let sentence = text[start..idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = idx;
        }
        prev_was_terminator = matches!(ch, '.' | '!' | '?');
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_collapses_whitespace() {
        let cleaner = TextCleaner::new();
        assert_eq!(
            cleaner.clean("  hello\n\n  world\t again "),
            "hello world again"
        );
    }

    #[test]
    fn test_clean_keeps_legal_punctuation() {
        let cleaner = TextCleaner::new();
        let cleaned = cleaner.clean("Section 420 (cheating): fine, or jail; see s/420-A.");
        assert!(cleaned.contains("(cheating):"));
        assert!(cleaned.contains("s/420-A."));
    }

    #[test]
    fn test_normalize_citations() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.normalize_citations("Sec. 420"), "Section 420");
        assert_eq!(cleaner.normalize_citations("Art 21"), "Article 21");
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("One. Two! Three? Four");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn test_sentence_chunks_respect_size() {
        let chunker = DocumentChunker::new(ChunkStrategy::Sentence, 40, 0);
        let chunks = chunker.chunk("First sentence here. Second sentence here. Third one.");
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = DocumentChunker::default();
        let chunks = chunker.chunk("A short text.");
        assert_eq!(chunks, vec!["A short text."]);
    }

    #[test]
    fn test_paragraph_chunking() {
        let chunker = DocumentChunker::new(ChunkStrategy::Paragraph, 20, 0);
        let chunks = chunker.chunk("first paragraph\n\nsecond paragraph\n\nthird");
        assert!(chunks.len() >= 2);
    }
}
