use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Static mapping of confidence band to severity, per SPEC_FULL C9.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Severity::Critical
        } else if confidence >= 0.7 {
            Severity::High
        } else if confidence >= 0.4 {
            Severity::Medium
        } else if confidence > 0.0 {
            Severity::Low
        } else {
            Severity::None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulPayload {
    pub payload: String,
    pub target_response: String,
    pub detector_name: String,
    pub detector_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityCluster {
    pub vulnerability_type: String,
    pub category: String,
    pub severity: Severity,
    pub confidence: f64,
    pub affected_component: String,
    pub successful_payloads: Vec<SuccessfulPayload>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl VulnerabilityCluster {
    /// Build a cluster from its payloads, deriving confidence/severity per
    /// the invariant: confidence == max(detector_score) across payloads.
    pub fn from_payloads(
        vulnerability_type: impl Into<String>,
        category: impl Into<String>,
        affected_component: impl Into<String>,
        successful_payloads: Vec<SuccessfulPayload>,
    ) -> Self {
        let confidence = successful_payloads
            .iter()
            .map(|p| p.detector_score)
            .fold(0.0_f64, f64::max)
            .clamp(0.0, 1.0);
        Self {
            vulnerability_type: vulnerability_type.into(),
            category: category.into(),
            severity: Severity::from_confidence(confidence),
            confidence,
            affected_component: affected_component.into(),
            successful_payloads,
            metadata: std::collections::HashMap::new(),
        }
    }

    pub fn satisfies_confidence_invariant(&self) -> bool {
        let expected = self
            .successful_payloads
            .iter()
            .map(|p| p.detector_score)
            .fold(0.0_f64, f64::max);
        (self.confidence - expected).abs() < 1e-9 && (0.0..=1.0).contains(&self.confidence)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanPlan {
    pub selected_probes: Vec<String>,
    pub rationale: std::collections::HashMap<String, String>,
    pub generations_per_probe: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub campaign_id: String,
    pub clusters: Vec<VulnerabilityCluster>,
    pub plan: ScanPlan,
}

impl VulnerabilityReport {
    pub fn empty(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            clusters: Vec::new(),
            plan: ScanPlan::default(),
        }
    }

    pub fn strongest_cluster(&self) -> Option<&VulnerabilityCluster> {
        self.clusters.iter().max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
    }
}
