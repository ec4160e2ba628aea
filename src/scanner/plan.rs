use std::collections::HashMap;

use serde_json::{json, Value};

use crate::config::ScanApproach;
use crate::errors::KestrelError;
use crate::models::{Blueprint, ScanPlan};
use crate::probes::ProbeCatalog;

pub fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "selected_probes": { "type": "array", "items": { "type": "string" } },
            "rationale": { "type": "object" },
            "generations_per_probe": { "type": "integer", "minimum": 1 }
        },
        "required": ["selected_probes", "generations_per_probe"]
    })
}

pub fn parse_plan(value: &Value, catalog: &ProbeCatalog) -> Result<ScanPlan, KestrelError> {
    let selected_raw: Vec<String> = value
        .get("selected_probes")
        .and_then(Value::as_array)
        .ok_or_else(|| KestrelError::OutputValidation("scan plan missing 'selected_probes'".into()))?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let selected_probes: Vec<String> = selected_raw.into_iter().filter(|name| catalog.get(name).is_some()).collect();

    if selected_probes.is_empty() {
        return Err(KestrelError::OutputValidation("scan plan selected no known probes".into()));
    }

    let generations_per_probe = value
        .get("generations_per_probe")
        .and_then(Value::as_u64)
        .unwrap_or(2)
        .max(1) as u32;

    let rationale = value
        .get("rationale")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(ScanPlan { selected_probes, rationale, generations_per_probe })
}

/// The plan used when LLM planning times out or fails, per SPEC_FULL §4.9:
/// every probe the blueprint makes applicable, capped at the approach's
/// probe budget.
pub fn default_plan(catalog: &ProbeCatalog, blueprint: &Blueprint, approach: ScanApproach) -> ScanPlan {
    let (_min, max) = approach.probe_budget();
    let applicable = catalog.applicable(blueprint);
    let selected_probes: Vec<String> = applicable.iter().take(max as usize).map(|p| p.name.clone()).collect();

    let mut rationale: HashMap<String, String> = HashMap::new();
    for name in &selected_probes {
        rationale.insert(name.clone(), "applicable to blueprint; selected by static fallback plan".to_string());
    }

    ScanPlan { selected_probes, rationale, generations_per_probe: 2 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn default_plan_respects_approach_budget() {
        let catalog = ProbeCatalog::load(None).unwrap();
        let blueprint = Blueprint::empty("c1", Utc::now());
        let plan = default_plan(&catalog, &blueprint, ScanApproach::Quick);
        let (_, max) = ScanApproach::Quick.probe_budget();
        assert!(plan.selected_probes.len() as u32 <= max);
    }

    #[test]
    fn parse_plan_drops_unknown_probe_names() {
        let catalog = ProbeCatalog::load(None).unwrap();
        let value = json!({
            "selected_probes": ["dan_roleplay", "not_a_real_probe"],
            "generations_per_probe": 3
        });
        let plan = parse_plan(&value, &catalog).unwrap();
        assert_eq!(plan.selected_probes, vec!["dan_roleplay".to_string()]);
        assert_eq!(plan.generations_per_probe, 3);
    }

    #[test]
    fn parse_plan_rejects_all_unknown_probes() {
        let catalog = ProbeCatalog::load(None).unwrap();
        let value = json!({ "selected_probes": ["bogus"], "generations_per_probe": 1 });
        assert!(parse_plan(&value, &catalog).is_err());
    }
}
