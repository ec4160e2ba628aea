use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::KestrelError;
use super::connection::ArtifactStore;

/// Artifact type discriminators, matching the `scans/{type}/{scan_id}` key
/// layout described in SPEC_FULL §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactType {
    Recon,
    Scan,
    Exploit,
}

impl ArtifactType {
    fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Recon => "recon",
            ArtifactType::Scan => "scan",
            ArtifactType::Exploit => "exploit",
        }
    }
}

impl ArtifactStore {
    /// Property 6: `get(type, put(type, id, bytes)) == bytes`.
    pub fn put<T: Serialize>(&self, artifact_type: ArtifactType, scan_id: &str, value: &T) -> Result<(), KestrelError> {
        let body = serde_json::to_string(value)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artifacts (artifact_type, scan_id, body, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(artifact_type, scan_id) DO UPDATE SET body = excluded.body, created_at = excluded.created_at",
            rusqlite::params![artifact_type.as_str(), scan_id, body, Utc::now().to_rfc3339()],
        )
        .map_err(|e| KestrelError::Database(format!("Failed to write artifact: {}", e)))?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, artifact_type: ArtifactType, scan_id: &str) -> Result<T, KestrelError> {
        let conn = self.conn.lock().unwrap();
        let body: String = conn
            .query_row(
                "SELECT body FROM artifacts WHERE artifact_type = ?1 AND scan_id = ?2",
                rusqlite::params![artifact_type.as_str(), scan_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    KestrelError::NotFound(format!("artifact {:?}/{}", artifact_type, scan_id))
                }
                other => KestrelError::Database(format!("Failed to read artifact: {}", other)),
            })?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn exists(&self, artifact_type: ArtifactType, scan_id: &str) -> Result<bool, KestrelError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM artifacts WHERE artifact_type = ?1 AND scan_id = ?2",
                rusqlite::params![artifact_type.as_str(), scan_id],
                |row| row.get(0),
            )
            .map_err(|e| KestrelError::Database(format!("Failed to check artifact existence: {}", e)))?;
        Ok(count > 0)
    }

    pub fn list(&self, artifact_type: ArtifactType, prefix: &str) -> Result<Vec<String>, KestrelError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT scan_id FROM artifacts WHERE artifact_type = ?1 AND scan_id LIKE ?2 || '%'")
            .map_err(|e| KestrelError::Database(format!("Failed to prepare list query: {}", e)))?;
        let rows = stmt
            .query_map(rusqlite::params![artifact_type.as_str(), prefix], |row| row.get(0))
            .map_err(|e| KestrelError::Database(format!("Failed to list artifacts: {}", e)))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(|e| KestrelError::Database(format!("Failed to read artifact row: {}", e)))?);
        }
        Ok(ids)
    }

    pub fn delete(&self, artifact_type: ArtifactType, scan_id: &str) -> Result<(), KestrelError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM artifacts WHERE artifact_type = ?1 AND scan_id = ?2",
            rusqlite::params![artifact_type.as_str(), scan_id],
        )
        .map_err(|e| KestrelError::Database(format!("Failed to delete artifact: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Blueprint;
    use chrono::Utc;

    #[test]
    fn put_then_get_round_trips() {
        let store = ArtifactStore::in_memory().unwrap();
        let bp = Blueprint::empty("c1", Utc::now());
        store.put(ArtifactType::Recon, "c1", &bp).unwrap();
        let fetched: Blueprint = store.get(ArtifactType::Recon, "c1").unwrap();
        assert_eq!(fetched.campaign_id, "c1");
    }

    #[test]
    fn get_missing_returns_not_found() {
        let store = ArtifactStore::in_memory().unwrap();
        let result: Result<Blueprint, _> = store.get(ArtifactType::Recon, "missing");
        assert!(matches!(result, Err(KestrelError::NotFound(_))));
    }

    #[test]
    fn exists_reflects_writes() {
        let store = ArtifactStore::in_memory().unwrap();
        assert!(!store.exists(ArtifactType::Scan, "c1").unwrap());
        store.put(ArtifactType::Scan, "c1", &serde_json::json!({"ok": true})).unwrap();
        assert!(store.exists(ArtifactType::Scan, "c1").unwrap());
    }

    #[test]
    fn put_overwrites_existing_key() {
        let store = ArtifactStore::in_memory().unwrap();
        store.put(ArtifactType::Scan, "c1", &1).unwrap();
        store.put(ArtifactType::Scan, "c1", &2).unwrap();
        let v: i32 = store.get(ArtifactType::Scan, "c1").unwrap();
        assert_eq!(v, 2);
    }
}
