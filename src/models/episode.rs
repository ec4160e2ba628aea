use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseFingerprint {
    pub defense_response_text: String,
    pub failed_technique_names: Vec<String>,
    pub target_domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulTechnique {
    pub converter_chain: Vec<String>,
    pub framing: Option<String>,
    pub final_prompt: String,
}

/// A stored record of a successful exploit iteration, indexed by its
/// DefenseFingerprint for future similarity queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassEpisode {
    pub episode_id: String,
    pub campaign_id: String,
    pub created_at: DateTime<Utc>,
    pub defense_fingerprint: DefenseFingerprint,
    pub successful_technique: SuccessfulTechnique,
    pub jailbreak_score: f64,
    pub why_it_worked: String,
    pub key_insight: String,
    pub iteration_count: u32,
    pub target_description: String,
}

impl BypassEpisode {
    /// Invariant: only episodes whose attack succeeded are stored, and a
    /// stored episode's failed-technique list must not contain its own
    /// successful chain.
    pub fn is_valid(&self, success_threshold: f64) -> bool {
        if self.jailbreak_score < success_threshold {
            return false;
        }
        let chain_key = self.successful_technique.converter_chain.join(">");
        !self
            .defense_fingerprint
            .failed_technique_names
            .iter()
            .any(|t| *t == chain_key)
    }
}

/// Per-technique aggregate statistics computed over a set of similarity
/// matches, used to build a `HistoricalInsight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueStat {
    pub converter_chain: Vec<String>,
    pub frequency: u32,
    pub mean_similarity: f64,
    pub mean_jailbreak_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalInsight {
    pub technique_stats: Vec<TechniqueStat>,
    pub recommended_chain: Option<Vec<String>>,
    pub recommended_framing: Option<String>,
    pub confidence: f64,
}

impl HistoricalInsight {
    pub fn empty() -> Self {
        Self { technique_stats: Vec::new(), recommended_chain: None, recommended_framing: None, confidence: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(score: f64, chain: Vec<&str>, failed: Vec<&str>) -> BypassEpisode {
        BypassEpisode {
            episode_id: "e1".into(),
            campaign_id: "c1".into(),
            created_at: Utc::now(),
            defense_fingerprint: DefenseFingerprint {
                defense_response_text: "I cannot help with that.".into(),
                failed_technique_names: failed.into_iter().map(String::from).collect(),
                target_domain: "customer-support".into(),
            },
            successful_technique: SuccessfulTechnique {
                converter_chain: chain.into_iter().map(String::from).collect(),
                framing: Some("role_play".into()),
                final_prompt: "...".into(),
            },
            jailbreak_score: score,
            why_it_worked: "the framing bypassed the refusal heuristic".into(),
            key_insight: "role_play + base64 defeats keyword filters".into(),
            iteration_count: 3,
            target_description: "support bot".into(),
        }
    }

    #[test]
    fn rejects_below_threshold_scores() {
        let e = episode(0.5, vec!["base64"], vec![]);
        assert!(!e.is_valid(0.8));
    }

    #[test]
    fn rejects_self_referential_failed_technique() {
        let e = episode(0.9, vec!["base64", "leetspeak"], vec!["base64>leetspeak"]);
        assert!(!e.is_valid(0.8));
    }

    #[test]
    fn accepts_valid_episode() {
        let e = episode(0.9, vec!["base64"], vec!["rot13"]);
        assert!(e.is_valid(0.8));
    }
}
