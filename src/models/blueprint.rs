use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::similarity::is_similar;

/// A tool/parameter signature parsed out of a freeform recon observation of
/// the form `name(p1: T1, p2: T2, ...)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub constraints: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedTool {
    pub name: String,
    pub parameters: Vec<ToolParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthStructure {
    #[serde(rename = "type")]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub known_vulnerabilities: Vec<String>,
}

/// The categories a raw recon observation can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationCategory {
    SystemPrompt,
    Tools,
    Authorization,
    Infrastructure,
}

pub const ALL_OBSERVATION_CATEGORIES: [ObservationCategory; 4] = [
    ObservationCategory::SystemPrompt,
    ObservationCategory::Tools,
    ObservationCategory::Authorization,
    ObservationCategory::Infrastructure,
];

/// The reconnaissance artifact: everything learned about a target before
/// scanning begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub campaign_id: String,
    pub timestamp: DateTime<Utc>,
    pub system_prompt_fragments: Vec<String>,
    pub detected_tools: Vec<DetectedTool>,
    pub infrastructure: HashMap<String, String>,
    pub auth_structure: AuthStructure,
    pub raw_observations: HashMap<ObservationCategory, Vec<String>>,
}

impl Blueprint {
    pub fn empty(campaign_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            timestamp,
            system_prompt_fragments: Vec::new(),
            detected_tools: Vec::new(),
            infrastructure: HashMap::new(),
            auth_structure: AuthStructure::default(),
            raw_observations: HashMap::new(),
        }
    }

    /// Attempt to record an observation under `category`. Returns `true` if it
    /// was stored (non-empty, not an exact duplicate, below the similarity
    /// threshold against every prior observation in the same category).
    pub fn take_note(&mut self, category: ObservationCategory, observation: &str, similarity_threshold: f64) -> bool {
        let observation = observation.trim();
        if observation.is_empty() {
            return false;
        }
        let bucket = self.raw_observations.entry(category).or_default();
        for existing in bucket.iter() {
            if existing == observation || is_similar(existing, observation, similarity_threshold) {
                return false;
            }
        }
        bucket.push(observation.to_string());
        true
    }

    pub fn observation_count(&self, category: ObservationCategory) -> usize {
        self.raw_observations.get(&category).map(|v| v.len()).unwrap_or(0)
    }

    /// All pairs within each category must be below `threshold` similarity.
    pub fn satisfies_similarity_invariant(&self, threshold: f64) -> bool {
        for bucket in self.raw_observations.values() {
            for i in 0..bucket.len() {
                for j in (i + 1)..bucket.len() {
                    if is_similar(&bucket[i], &bucket[j], threshold) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Parse a freeform tool observation of the form `name(p1: T1, p2: T2, ...)`.
/// Returns `None` if the string does not match that shape.
pub fn parse_tool_signature(observation: &str) -> Option<DetectedTool> {
    let open = observation.find('(')?;
    let close = observation.rfind(')')?;
    if close < open {
        return None;
    }
    let name = observation[..open].trim();
    if name.is_empty() {
        return None;
    }
    let args = &observation[open + 1..close];
    let mut parameters = Vec::new();
    for part in args.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (pname, ptype) = match part.split_once(':') {
            Some((n, t)) => (n.trim().to_string(), t.trim().to_string()),
            None => (part.to_string(), "unknown".to_string()),
        };
        parameters.push(ToolParameter {
            name: pname,
            param_type: ptype,
            constraints: None,
            required: true,
        });
    }
    Some(DetectedTool { name: name.to_string(), parameters })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_note_rejects_empty() {
        let mut bp = Blueprint::empty("c1", Utc::now());
        assert!(!bp.take_note(ObservationCategory::Tools, "   ", 0.8));
    }

    #[test]
    fn take_note_rejects_exact_duplicate() {
        let mut bp = Blueprint::empty("c1", Utc::now());
        assert!(bp.take_note(ObservationCategory::SystemPrompt, "You are a helpful assistant.", 0.8));
        assert!(!bp.take_note(ObservationCategory::SystemPrompt, "You are a helpful assistant.", 0.8));
        assert_eq!(bp.observation_count(ObservationCategory::SystemPrompt), 1);
    }

    #[test]
    fn take_note_rejects_near_duplicate_above_threshold() {
        let mut bp = Blueprint::empty("c1", Utc::now());
        assert!(bp.take_note(ObservationCategory::Tools, "line one\nline two\nline three", 0.8));
        assert!(!bp.take_note(ObservationCategory::Tools, "line one\nline two\nline three\nline four".repeat(1).as_str(), 0.6));
    }

    #[test]
    fn satisfies_similarity_invariant_on_distinct_observations() {
        let mut bp = Blueprint::empty("c1", Utc::now());
        bp.take_note(ObservationCategory::Infrastructure, "model_family: gpt-4", 0.8);
        bp.take_note(ObservationCategory::Infrastructure, "database: postgres", 0.8);
        assert!(bp.satisfies_similarity_invariant(0.8));
    }

    #[test]
    fn parses_tool_signature_with_types() {
        let tool = parse_tool_signature("lookup_order(order_id: string, include_history: bool)").unwrap();
        assert_eq!(tool.name, "lookup_order");
        assert_eq!(tool.parameters.len(), 2);
        assert_eq!(tool.parameters[0].name, "order_id");
        assert_eq!(tool.parameters[0].param_type, "string");
    }

    #[test]
    fn parses_tool_signature_with_no_args() {
        let tool = parse_tool_signature("ping()").unwrap();
        assert_eq!(tool.name, "ping");
        assert!(tool.parameters.is_empty());
    }

    #[test]
    fn rejects_non_signature_text() {
        assert!(parse_tool_signature("just some freeform note").is_none());
    }
}
