//! Session-scoped short-term memory

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::query::QueryCategory;

/// One completed query/response exchange, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub response: String,
    pub category: Option<QueryCategory>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        category: Option<QueryCategory>,
    ) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            category,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded conversation log for one session.
///
/// Owned by exactly one session; expiry is checked lazily on access rather
/// than by a background timer.
#[derive(Debug, Clone)]
pub struct SessionMemory {
    max_turns: usize,
    ttl: Duration,
    history: VecDeque<ConversationTurn>,
    metadata: HashMap<String, serde_json::Value>,
}

impl SessionMemory {
    pub fn new(max_turns: usize, ttl: Duration) -> Self {
        Self {
            max_turns,
            ttl,
            history: VecDeque::with_capacity(max_turns),
            metadata: HashMap::new(),
        }
    }

    /// Append a turn, dropping the oldest when the bound is exceeded
    pub fn add_turn(
        &mut self,
        query: impl Into<String>,
        response: impl Into<String>,
        category: Option<QueryCategory>,
    ) {
        self.history
            .push_back(ConversationTurn::new(query, response, category));

        while self.history.len() > self.max_turns {
            self.history.pop_front();
        }
    }

    /// The most recent `lookback` turns as alternating query/response lines,
    /// oldest of the window first
    pub fn get_context(&self, lookback: usize) -> String {
        let skip = self.history.len().saturating_sub(lookback);

        let mut lines = Vec::new();
        for turn in self.history.iter().skip(skip) {
            lines.push(format!("User: {}", turn.query));
            lines.push(format!("Assistant: {}", turn.response));
        }
        lines.join("\n")
    }

    /// True iff the session has history and has been idle past its TTL
    pub fn is_expired(&self) -> bool {
        match self.history.back() {
            Some(last) => Utc::now() - last.timestamp > self.ttl,
            None => false,
        }
    }

    /// Drop all turns and session metadata
    pub fn clear(&mut self) {
        self.history.clear();
        self.metadata.clear();
    }

    pub fn history(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(max_turns: usize) -> SessionMemory {
        SessionMemory::new(max_turns, Duration::seconds(3600))
    }

    #[test]
    fn test_fifo_bound() {
        let mut m = memory(3);
        for i in 0..8 {
            m.add_turn(format!("q{i}"), format!("r{i}"), None);
        }

        assert_eq!(m.len(), 3);
        let queries: Vec<_> = m.history().map(|t| t.query.clone()).collect();
        assert_eq!(queries, vec!["q5", "q6", "q7"]);
    }

    #[test]
    fn test_context_window() {
        let mut m = memory(10);
        m.add_turn("first", "one", None);
        m.add_turn("second", "two", None);
        m.add_turn("third", "three", None);

        let context = m.get_context(2);
        assert_eq!(
            context,
            "User: second\nAssistant: two\nUser: third\nAssistant: three"
        );
    }

    #[test]
    fn test_context_with_fewer_turns_than_lookback() {
        let mut m = memory(10);
        m.add_turn("only", "turn", None);
        assert_eq!(m.get_context(5), "User: only\nAssistant: turn");
    }

    #[test]
    fn test_empty_session_not_expired() {
        let m = memory(5);
        assert!(!m.is_expired());
    }

    #[test]
    fn test_idle_session_expires() {
        let mut m = SessionMemory::new(5, Duration::seconds(-1));
        m.add_turn("q", "r", None);
        // Negative TTL: the turn just recorded is already past its deadline
        assert!(m.is_expired());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut m = memory(5);
        m.add_turn("q", "r", None);
        m.set_metadata("jurisdiction", serde_json::json!("India"));
        m.clear();

        assert!(m.is_empty());
        assert!(m.get_metadata("jurisdiction").is_none());
        assert!(!m.is_expired());
    }
}
