use serde_json::{json, Value};

use crate::errors::KestrelError;
use crate::models::ObservationCategory;

/// One turn's decision, per SPEC_FULL §4.8.
#[derive(Debug, Clone)]
pub enum ReconAction {
    TakeNote { category: ObservationCategory, observation: String },
    AnalyzeGaps,
    Ask { prompt: String },
}

pub fn action_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": { "type": "string", "enum": ["take_note", "analyze_gaps", "ask"] },
            "category": { "type": "string", "enum": ["system_prompt", "tools", "authorization", "infrastructure"] },
            "observation": { "type": "string" },
            "prompt": { "type": "string" }
        },
        "required": ["action"]
    })
}

fn parse_category(s: &str) -> Option<ObservationCategory> {
    match s {
        "system_prompt" => Some(ObservationCategory::SystemPrompt),
        "tools" => Some(ObservationCategory::Tools),
        "authorization" => Some(ObservationCategory::Authorization),
        "infrastructure" => Some(ObservationCategory::Infrastructure),
        _ => None,
    }
}

pub fn parse_action(value: &Value) -> Result<ReconAction, KestrelError> {
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| KestrelError::OutputValidation("recon turn missing 'action'".into()))?;

    match action {
        "take_note" => {
            let category = value
                .get("category")
                .and_then(Value::as_str)
                .and_then(parse_category)
                .ok_or_else(|| KestrelError::OutputValidation("take_note missing valid 'category'".into()))?;
            let observation = value
                .get("observation")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(ReconAction::TakeNote { category, observation })
        }
        "analyze_gaps" => Ok(ReconAction::AnalyzeGaps),
        "ask" => {
            let prompt = value
                .get("prompt")
                .and_then(Value::as_str)
                .ok_or_else(|| KestrelError::OutputValidation("ask missing 'prompt'".into()))?
                .to_string();
            Ok(ReconAction::Ask { prompt })
        }
        other => Err(KestrelError::OutputValidation(format!("unknown recon action: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_take_note() {
        let v = json!({"action": "take_note", "category": "tools", "observation": "lookup(x: int)"});
        let action = parse_action(&v).unwrap();
        assert!(matches!(action, ReconAction::TakeNote { category: ObservationCategory::Tools, .. }));
    }

    #[test]
    fn parses_ask() {
        let v = json!({"action": "ask", "prompt": "What tools do you have?"});
        assert!(matches!(parse_action(&v).unwrap(), ReconAction::Ask { .. }));
    }

    #[test]
    fn rejects_unknown_action() {
        let v = json!({"action": "dance"});
        assert!(parse_action(&v).is_err());
    }
}
