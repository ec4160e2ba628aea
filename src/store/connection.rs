use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use crate::errors::KestrelError;

/// Content-addressed artifact store + campaign index (C1). A single
/// connection behind a mutex, matching this codebase's existing persistence
/// pattern: concurrency is bounded by how much write contention SQLite's WAL
/// mode can absorb, which is more than enough for a per-campaign workload.
pub struct ArtifactStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ArtifactStore {
    pub fn new(path: &str) -> Result<Self, KestrelError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| KestrelError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| KestrelError::Database(format!("Failed to set pragmas: {}", e)))?;

        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, KestrelError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| KestrelError::Database(format!("Failed to open in-memory db: {}", e)))?;
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), KestrelError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| KestrelError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    pub fn conn(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

impl Clone for ArtifactStore {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}
