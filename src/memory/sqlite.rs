//! SQLite-backed long-term memory with migrations

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

use crate::error::{JurisError, Result};
use crate::memory::{CachedResponse, DocumentRecord, MemoryBackend};

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

const MIGRATIONS: &[&str] = &[
    // v1: cached responses keyed by query fingerprint
    "CREATE TABLE responses (
        fingerprint TEXT PRIMARY KEY,
        response TEXT NOT NULL,
        sources TEXT NOT NULL,
        confidence REAL NOT NULL,
        created_at TEXT NOT NULL
    );",
    // v2: per-chunk provenance records
    "CREATE TABLE documents (
        key TEXT PRIMARY KEY,
        metadata TEXT NOT NULL,
        stored_at TEXT NOT NULL
    );",
];

/// Durable [`MemoryBackend`] over pooled SQLite connections
pub struct SqliteBackend {
    pool: DbPool,
}

impl SqliteBackend {
    /// Open (or create) the database at `db_path` and bring the schema up to
    /// date
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JurisError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(16)
            .build(manager)
            .map_err(|e| JurisError::Config(format!("Failed to create connection pool: {}", e)))?;

        {
            let conn = pool
                .get()
                .map_err(|e| JurisError::Config(format!("Failed to get connection: {}", e)))?;

            // WAL for concurrent readers during stores
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
        }

        let backend = Self { pool };
        backend.migrate()?;

        Ok(backend)
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| JurisError::Config(format!("Failed to get connection: {}", e)))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (idx, migration) in MIGRATIONS.iter().enumerate() {
            let version = idx as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);
                conn.execute_batch(migration)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }
}

fn parse_timestamp(raw: &str, context: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| JurisError::Config(format!("Corrupt {} timestamp '{}': {}", context, raw, e)))
}

impl MemoryBackend for SqliteBackend {
    fn put_response(&self, fingerprint: &str, record: &CachedResponse) -> Result<()> {
        let conn = self.get_conn()?;
        let sources = serde_json::to_string(&record.sources).map_err(|e| JurisError::Json {
            source: e,
            context: "Failed to serialize response sources".to_string(),
        })?;

        conn.execute(
            "INSERT INTO responses (fingerprint, response, sources, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(fingerprint) DO UPDATE SET
                 response = excluded.response,
                 sources = excluded.sources,
                 confidence = excluded.confidence,
                 created_at = excluded.created_at",
            params![
                fingerprint,
                record.response,
                sources,
                record.confidence as f64,
                record.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn get_response(&self, fingerprint: &str) -> Result<Option<CachedResponse>> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                "SELECT response, sources, confidence, created_at
                 FROM responses WHERE fingerprint = ?1",
                params![fingerprint],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((response, sources, confidence, created_at)) => {
                let sources: Vec<String> =
                    serde_json::from_str(&sources).map_err(|e| JurisError::Json {
                        source: e,
                        context: "Failed to deserialize response sources".to_string(),
                    })?;
                Ok(Some(CachedResponse {
                    response,
                    sources,
                    confidence: confidence as f32,
                    created_at: parse_timestamp(&created_at, "response")?,
                }))
            }
            None => Ok(None),
        }
    }

    fn purge_responses_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.get_conn()?;
        let removed = conn.execute(
            "DELETE FROM responses WHERE created_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(removed)
    }

    fn put_document(&self, key: &str, record: &DocumentRecord) -> Result<()> {
        let conn = self.get_conn()?;
        let metadata = serde_json::to_string(&record.metadata).map_err(|e| JurisError::Json {
            source: e,
            context: "Failed to serialize document metadata".to_string(),
        })?;

        conn.execute(
            "INSERT INTO documents (key, metadata, stored_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 metadata = excluded.metadata,
                 stored_at = excluded.stored_at",
            params![key, metadata, record.stored_at.to_rfc3339()],
        )?;

        Ok(())
    }

    fn get_document(&self, key: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                "SELECT metadata, stored_at FROM documents WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((metadata, stored_at)) => {
                let metadata = serde_json::from_str(&metadata).map_err(|e| JurisError::Json {
                    source: e,
                    context: "Failed to deserialize document metadata".to_string(),
                })?;
                Ok(Some(DocumentRecord {
                    metadata,
                    stored_at: parse_timestamp(&stored_at, "document")?,
                }))
            }
            None => Ok(None),
        }
    }

    fn response_count(&self) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn document_count(&self) -> Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn backend() -> (SqliteBackend, TempDir) {
        let temp = TempDir::new().unwrap();
        let backend = SqliteBackend::new(&temp.path().join("memory.db")).unwrap();
        (backend, temp)
    }

    #[test]
    fn test_response_roundtrip() {
        let (backend, _temp) = backend();

        let record = CachedResponse {
            response: "answer".to_string(),
            sources: vec!["passage one".to_string(), "passage two".to_string()],
            confidence: 0.85,
            created_at: Utc::now(),
        };
        backend.put_response("fp1", &record).unwrap();

        let loaded = backend.get_response("fp1").unwrap().unwrap();
        assert_eq!(loaded.response, "answer");
        assert_eq!(loaded.sources, record.sources);
        assert!((loaded.confidence - 0.85).abs() < 1e-6);
        assert_eq!(loaded.created_at, record.created_at);
    }

    #[test]
    fn test_upsert_replaces() {
        let (backend, _temp) = backend();

        let first = CachedResponse {
            response: "old".to_string(),
            sources: vec![],
            confidence: 0.2,
            created_at: Utc::now(),
        };
        let second = CachedResponse {
            response: "new".to_string(),
            sources: vec![],
            confidence: 0.9,
            created_at: Utc::now(),
        };

        backend.put_response("fp", &first).unwrap();
        backend.put_response("fp", &second).unwrap();

        let loaded = backend.get_response("fp").unwrap().unwrap();
        assert_eq!(loaded.response, "new");
        assert_eq!(backend.response_count().unwrap(), 1);
    }

    #[test]
    fn test_miss_is_none() {
        let (backend, _temp) = backend();
        assert!(backend.get_response("nope").unwrap().is_none());
        assert!(backend.get_document("nope").unwrap().is_none());
    }

    #[test]
    fn test_purge_by_age() {
        let (backend, _temp) = backend();

        let old = CachedResponse {
            response: "old".to_string(),
            sources: vec![],
            confidence: 0.5,
            created_at: Utc::now() - chrono::Duration::days(60),
        };
        let fresh = CachedResponse {
            response: "fresh".to_string(),
            sources: vec![],
            confidence: 0.5,
            created_at: Utc::now(),
        };
        backend.put_response("old", &old).unwrap();
        backend.put_response("fresh", &fresh).unwrap();

        let removed = backend
            .purge_responses_before(Utc::now() - chrono::Duration::days(30))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(backend.get_response("old").unwrap().is_none());
        assert!(backend.get_response("fresh").unwrap().is_some());
    }

    #[test]
    fn test_document_roundtrip() {
        let (backend, _temp) = backend();

        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), serde_json::json!("IPC"));
        metadata.insert("year".to_string(), serde_json::json!(1860));

        let record = DocumentRecord {
            metadata,
            stored_at: Utc::now(),
        };
        backend.put_document("doc_0_chunk_1", &record).unwrap();

        let loaded = backend.get_document("doc_0_chunk_1").unwrap().unwrap();
        assert_eq!(loaded.metadata["year"], serde_json::json!(1860));
        assert_eq!(backend.document_count().unwrap(), 1);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memory.db");

        {
            let backend = SqliteBackend::new(&path).unwrap();
            let record = CachedResponse {
                response: "persisted".to_string(),
                sources: vec![],
                confidence: 0.9,
                created_at: Utc::now(),
            };
            backend.put_response("fp", &record).unwrap();
        }

        let backend = SqliteBackend::new(&path).unwrap();
        assert_eq!(
            backend.get_response("fp").unwrap().unwrap().response,
            "persisted"
        );
    }
}
