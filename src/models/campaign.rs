use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a campaign. Advances monotonically; never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStage {
    Created,
    Recon,
    Scan,
    Exploit,
    Done,
    Failed,
}

impl CampaignStage {
    /// Returns the rank of this stage in the monotonic ordering, for assertions
    /// that a stage transition never regresses.
    pub fn rank(&self) -> u8 {
        match self {
            CampaignStage::Created => 0,
            CampaignStage::Recon => 1,
            CampaignStage::Scan => 2,
            CampaignStage::Exploit => 3,
            CampaignStage::Done => 4,
            CampaignStage::Failed => 4,
        }
    }

    pub fn can_advance_to(&self, next: CampaignStage) -> bool {
        next.rank() >= self.rank() || next == CampaignStage::Failed
    }
}

/// A single red-team campaign against one target endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub stage: CampaignStage,
    pub recon_artifact_id: Option<String>,
    pub scan_artifact_id: Option<String>,
    pub exploit_artifact_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Campaign {
    pub fn new(id: impl Into<String>, target_url: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            target_url: target_url.into(),
            created_at,
            stage: CampaignStage::Created,
            recon_artifact_id: None,
            scan_artifact_id: None,
            exploit_artifact_id: None,
            tags: Vec::new(),
        }
    }

    /// Invariant: an artifact id is set iff the corresponding phase completed.
    pub fn artifact_consistent(&self) -> bool {
        match self.stage {
            CampaignStage::Created => self.recon_artifact_id.is_none(),
            CampaignStage::Recon => true,
            CampaignStage::Scan | CampaignStage::Exploit | CampaignStage::Done => {
                self.recon_artifact_id.is_some() && self.scan_artifact_id.is_some()
            }
            CampaignStage::Failed => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_rank_is_monotonic() {
        assert!(CampaignStage::Created.rank() < CampaignStage::Recon.rank());
        assert!(CampaignStage::Recon.rank() < CampaignStage::Scan.rank());
        assert!(CampaignStage::Scan.rank() < CampaignStage::Exploit.rank());
        assert!(CampaignStage::Exploit.rank() < CampaignStage::Done.rank());
    }

    #[test]
    fn failed_always_reachable() {
        assert!(CampaignStage::Scan.can_advance_to(CampaignStage::Failed));
        assert!(CampaignStage::Created.can_advance_to(CampaignStage::Failed));
    }

    #[test]
    fn cannot_regress_stage() {
        assert!(!CampaignStage::Exploit.can_advance_to(CampaignStage::Recon));
    }

    #[test]
    fn new_campaign_has_no_artifacts() {
        let c = Campaign::new("c1", "https://target.example", Utc::now());
        assert!(c.artifact_consistent());
        assert_eq!(c.stage, CampaignStage::Created);
    }

    #[test]
    fn serialization_uses_screaming_snake_case() {
        let json = serde_json::to_string(&CampaignStage::Exploit).unwrap();
        assert_eq!(json, "\"EXPLOIT\"");
    }
}
