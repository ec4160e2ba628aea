use chrono::{DateTime, Utc};

use crate::errors::KestrelError;
use crate::models::{Campaign, CampaignStage};
use super::connection::ArtifactStore;

fn stage_to_str(stage: CampaignStage) -> &'static str {
    match stage {
        CampaignStage::Created => "CREATED",
        CampaignStage::Recon => "RECON",
        CampaignStage::Scan => "SCAN",
        CampaignStage::Exploit => "EXPLOIT",
        CampaignStage::Done => "DONE",
        CampaignStage::Failed => "FAILED",
    }
}

fn stage_from_str(s: &str) -> CampaignStage {
    match s {
        "RECON" => CampaignStage::Recon,
        "SCAN" => CampaignStage::Scan,
        "EXPLOIT" => CampaignStage::Exploit,
        "DONE" => CampaignStage::Done,
        "FAILED" => CampaignStage::Failed,
        _ => CampaignStage::Created,
    }
}

impl ArtifactStore {
    pub fn create_campaign(&self, campaign: &Campaign) -> Result<(), KestrelError> {
        let tags = serde_json::to_string(&campaign.tags)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO campaigns (id, target_url, stage, recon_artifact_id, scan_artifact_id, exploit_artifact_id, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                campaign.id,
                campaign.target_url,
                stage_to_str(campaign.stage),
                campaign.recon_artifact_id,
                campaign.scan_artifact_id,
                campaign.exploit_artifact_id,
                tags,
                campaign.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| KestrelError::Database(format!("Failed to create campaign: {}", e)))?;
        Ok(())
    }

    pub fn exists_campaign(&self, id: &str) -> Result<bool, KestrelError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM campaigns WHERE id = ?1", rusqlite::params![id], |row| row.get(0))
            .map_err(|e| KestrelError::Database(format!("Failed to check campaign existence: {}", e)))?;
        Ok(count > 0)
    }

    pub fn get_campaign(&self, id: &str) -> Result<Campaign, KestrelError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, target_url, stage, recon_artifact_id, scan_artifact_id, exploit_artifact_id, tags, created_at
             FROM campaigns WHERE id = ?1",
            rusqlite::params![id],
            |row| {
                let tags_json: String = row.get(6)?;
                let created_at: String = row.get(7)?;
                Ok(Campaign {
                    id: row.get(0)?,
                    target_url: row.get(1)?,
                    stage: stage_from_str(&row.get::<_, String>(2)?),
                    recon_artifact_id: row.get(3)?,
                    scan_artifact_id: row.get(4)?,
                    exploit_artifact_id: row.get(5)?,
                    tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                    created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
                })
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => KestrelError::NotFound(format!("campaign {}", id)),
            other => KestrelError::Database(format!("Failed to read campaign: {}", other)),
        })
    }

    /// Advance the campaign's stage. Only permits monotonic advancement (or a
    /// transition to Failed from any stage).
    pub fn advance_stage(&self, id: &str, stage: CampaignStage) -> Result<(), KestrelError> {
        let current = self.get_campaign(id)?;
        if !current.stage.can_advance_to(stage) {
            return Err(KestrelError::Internal(format!(
                "cannot advance campaign {} from {:?} to {:?}",
                id, current.stage, stage
            )));
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE campaigns SET stage = ?1 WHERE id = ?2",
            rusqlite::params![stage_to_str(stage), id],
        )
        .map_err(|e| KestrelError::Database(format!("Failed to advance campaign stage: {}", e)))?;
        Ok(())
    }

    pub fn list_campaigns(&self, limit: usize, offset: usize) -> Result<Vec<Campaign>, KestrelError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, target_url, stage, recon_artifact_id, scan_artifact_id, exploit_artifact_id, tags, created_at
                 FROM campaigns ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            )
            .map_err(|e| KestrelError::Database(format!("Failed to prepare campaign list query: {}", e)))?;
        let rows = stmt
            .query_map(rusqlite::params![limit as i64, offset as i64], |row| {
                let tags_json: String = row.get(6)?;
                let created_at: String = row.get(7)?;
                Ok(Campaign {
                    id: row.get(0)?,
                    target_url: row.get(1)?,
                    stage: stage_from_str(&row.get::<_, String>(2)?),
                    recon_artifact_id: row.get(3)?,
                    scan_artifact_id: row.get(4)?,
                    exploit_artifact_id: row.get(5)?,
                    tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                    created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
                })
            })
            .map_err(|e| KestrelError::Database(format!("Failed to list campaigns: {}", e)))?;
        let mut campaigns = Vec::new();
        for row in rows {
            campaigns.push(row.map_err(|e| KestrelError::Database(format!("Failed to read campaign row: {}", e)))?);
        }
        Ok(campaigns)
    }

    pub fn set_artifact_id(&self, id: &str, artifact_type: super::artifacts::ArtifactType, artifact_id: &str) -> Result<(), KestrelError> {
        let column = match artifact_type {
            super::artifacts::ArtifactType::Recon => "recon_artifact_id",
            super::artifacts::ArtifactType::Scan => "scan_artifact_id",
            super::artifacts::ArtifactType::Exploit => "exploit_artifact_id",
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("UPDATE campaigns SET {} = ?1 WHERE id = ?2", column),
            rusqlite::params![artifact_id, id],
        )
        .map_err(|e| KestrelError::Database(format!("Failed to set artifact id: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_round_trips() {
        let store = ArtifactStore::in_memory().unwrap();
        let campaign = Campaign::new("c1", "https://target.example", Utc::now());
        store.create_campaign(&campaign).unwrap();
        let fetched = store.get_campaign("c1").unwrap();
        assert_eq!(fetched.target_url, "https://target.example");
        assert_eq!(fetched.stage, CampaignStage::Created);
    }

    #[test]
    fn advance_stage_moves_forward() {
        let store = ArtifactStore::in_memory().unwrap();
        store.create_campaign(&Campaign::new("c1", "https://target.example", Utc::now())).unwrap();
        store.advance_stage("c1", CampaignStage::Recon).unwrap();
        assert_eq!(store.get_campaign("c1").unwrap().stage, CampaignStage::Recon);
    }

    #[test]
    fn advance_stage_rejects_regression() {
        let store = ArtifactStore::in_memory().unwrap();
        store.create_campaign(&Campaign::new("c1", "https://target.example", Utc::now())).unwrap();
        store.advance_stage("c1", CampaignStage::Scan).unwrap();
        assert!(store.advance_stage("c1", CampaignStage::Recon).is_err());
    }

    #[test]
    fn list_campaigns_orders_newest_first() {
        let store = ArtifactStore::in_memory().unwrap();
        store.create_campaign(&Campaign::new("c1", "https://target.example", Utc::now() - chrono::Duration::seconds(10))).unwrap();
        store.create_campaign(&Campaign::new("c2", "https://target.example", Utc::now())).unwrap();
        let campaigns = store.list_campaigns(10, 0).unwrap();
        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[0].id, "c2");
    }
}
