use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Blueprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeCategory {
    Jailbreak,
    PromptInjection,
    EncodingBypass,
    DataLeakage,
    Toxicity,
    Hallucination,
    PackageHallucination,
    SqlInjection,
    AuthBypass,
    ToolAbuse,
}

pub const ALL_PROBE_CATEGORIES: [ProbeCategory; 10] = [
    ProbeCategory::Jailbreak,
    ProbeCategory::PromptInjection,
    ProbeCategory::EncodingBypass,
    ProbeCategory::DataLeakage,
    ProbeCategory::Toxicity,
    ProbeCategory::Hallucination,
    ProbeCategory::PackageHallucination,
    ProbeCategory::SqlInjection,
    ProbeCategory::AuthBypass,
    ProbeCategory::ToolAbuse,
];

/// Yields up to `n` candidate prompts. Templates may reference `{{TARGET}}`,
/// substituted by the caller with blueprint-derived context.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeGenerator {
    pub templates: Vec<String>,
}

impl ProbeGenerator {
    pub fn generate(&self, n: usize) -> Vec<String> {
        if self.templates.is_empty() {
            return Vec::new();
        }
        self.templates.iter().cycle().take(n.min(self.templates.len().max(n))).cloned().take(n).collect()
    }
}

/// A bounded score plus pass/fail over a (prompt, response) pair. Detectors
/// are pattern-based here so they stay deterministic (SPEC_FULL §4.6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeDetector {
    pub patterns: Vec<String>,
}

impl ProbeDetector {
    pub fn detect(&self, response: &str) -> (f64, bool) {
        if self.patterns.is_empty() {
            return (0.0, false);
        }
        let matched = self
            .patterns
            .iter()
            .filter(|p| Regex::new(p).map(|re| re.is_match(response)).unwrap_or(false))
            .count();
        let score = matched as f64 / self.patterns.len() as f64;
        (score, matched > 0)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeDefinition {
    pub name: String,
    pub category: ProbeCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub generator: ProbeGenerator,
    pub detector: ProbeDetector,
}

impl ProbeDefinition {
    /// Filters probes against what Recon actually found, so Scanner doesn't
    /// burn budget on probes the target can't exhibit (SPEC_FULL §4.5).
    pub fn applicable_for(&self, blueprint: &Blueprint) -> bool {
        match self.category {
            ProbeCategory::ToolAbuse => !blueprint.detected_tools.is_empty(),
            ProbeCategory::AuthBypass => blueprint.auth_structure.auth_type.is_some()
                || !blueprint.auth_structure.roles.is_empty(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn generator_cycles_templates_to_fill_n() {
        let gen = ProbeGenerator { templates: vec!["a".into(), "b".into()] };
        assert_eq!(gen.generate(3).len(), 3);
    }

    #[test]
    fn generator_with_no_templates_yields_nothing() {
        let gen = ProbeGenerator { templates: vec![] };
        assert!(gen.generate(5).is_empty());
    }

    #[test]
    fn detector_scores_proportional_to_matches() {
        let det = ProbeDetector { patterns: vec!["foo".into(), "bar".into()] };
        let (score, pass) = det.detect("contains foo only");
        assert!((score - 0.5).abs() < f64::EPSILON);
        assert!(pass);
    }

    #[test]
    fn tool_abuse_probe_requires_detected_tools() {
        let probe = ProbeDefinition {
            name: "p".into(),
            category: ProbeCategory::ToolAbuse,
            tags: vec![],
            generator: ProbeGenerator { templates: vec![] },
            detector: ProbeDetector { patterns: vec![] },
        };
        let empty = Blueprint::empty("c1", Utc::now());
        assert!(!probe.applicable_for(&empty));
    }
}
