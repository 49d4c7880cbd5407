//! Session registry
//!
//! Explicit owner of all live sessions, passed by handle instead of living
//! as ambient global state. Each session's memory sits behind its own mutex
//! so concurrent requests for the same session serialize their appends and
//! the turn log keeps FIFO order.

use ahash::AHashMap;
use chrono::Duration;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::memory::SessionMemory;

/// Shared handle to one session's memory
pub type SessionHandle = Arc<Mutex<SessionMemory>>;

/// Registry of live sessions with a defined lifecycle:
/// create, get, expire, destroy
pub struct SessionRegistry {
    max_turns: usize,
    ttl: Duration,
    sessions: RwLock<AHashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(max_turns: usize, ttl: Duration) -> Self {
        Self {
            max_turns,
            ttl,
            sessions: RwLock::new(AHashMap::new()),
        }
    }

    /// Create a session under a fresh id and return it with its handle
    pub fn create(&self) -> (String, SessionHandle) {
        let id = Uuid::new_v4().to_string();
        let handle = self.get_or_create(&id);
        (id, handle)
    }

    /// Existing handle for `id`, if the session is live
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    /// Handle for `id`, creating the session on first use
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        if let Some(handle) = self.get(id) {
            return handle;
        }

        let mut sessions = self.sessions.write().unwrap();
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session = id, "creating session");
                Arc::new(Mutex::new(SessionMemory::new(self.max_turns, self.ttl)))
            })
            .clone()
    }

    /// Drop the session outright; returns whether it existed
    pub fn destroy(&self, id: &str) -> bool {
        self.sessions.write().unwrap().remove(id).is_some()
    }

    /// Remove every session whose TTL has lapsed; returns how many went.
    ///
    /// Expiry is evaluated lazily here, not by a background timer.
    pub fn expire_idle(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|id, handle| {
            let expired = handle.lock().unwrap().is_expired();
            if expired {
                tracing::debug!(session = id.as_str(), "expiring idle session");
            }
            !expired
        });
        before - sessions.len()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(ttl_secs: i64) -> SessionRegistry {
        SessionRegistry::new(10, Duration::seconds(ttl_secs))
    }

    #[test]
    fn test_create_and_get() {
        let r = registry(3600);
        let (id, _handle) = r.create();
        assert!(r.get(&id).is_some());
        assert!(r.get("unknown").is_none());
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let r = registry(3600);
        let a = r.get_or_create("s1");
        let b = r.get_or_create("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_destroy() {
        let r = registry(3600);
        let (id, _) = r.create();
        assert!(r.destroy(&id));
        assert!(!r.destroy(&id));
        assert!(r.is_empty());
    }

    #[test]
    fn test_expire_idle_removes_only_expired() {
        let r = registry(-1);
        let idle = r.get_or_create("idle");
        idle.lock().unwrap().add_turn("q", "r", None);

        // A session with no turns never expires
        r.get_or_create("empty");

        assert_eq!(r.expire_idle(), 1);
        assert!(r.get("idle").is_none());
        assert!(r.get("empty").is_some());
    }

    #[test]
    fn test_same_session_appends_are_serialized() {
        let r = registry(3600);
        let handle = r.get_or_create("shared");

        let mut joins = Vec::new();
        for i in 0..4 {
            let handle = handle.clone();
            joins.push(std::thread::spawn(move || {
                handle
                    .lock()
                    .unwrap()
                    .add_turn(format!("q{i}"), format!("r{i}"), None);
            }));
        }
        for join in joins {
            join.join().unwrap();
        }

        assert_eq!(handle.lock().unwrap().len(), 4);
    }
}
