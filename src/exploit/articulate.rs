use serde_json::{json, Value};

use crate::errors::KestrelError;

#[derive(Debug, Clone)]
pub struct PayloadCandidate {
    pub text: String,
    pub framing_label: Option<String>,
    pub rationale: Option<String>,
}

pub fn articulate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "payloads": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "framing_label": { "type": "string" },
                        "rationale": { "type": "string" }
                    },
                    "required": ["text"]
                }
            }
        },
        "required": ["payloads"]
    })
}

pub fn parse_payloads(value: &Value) -> Result<Vec<PayloadCandidate>, KestrelError> {
    let items = value
        .get("payloads")
        .and_then(Value::as_array)
        .ok_or_else(|| KestrelError::OutputValidation("articulate response missing 'payloads'".into()))?;

    let payloads: Vec<PayloadCandidate> = items
        .iter()
        .filter_map(|item| {
            let text = item.get("text")?.as_str()?.to_string();
            if text.trim().is_empty() {
                return None;
            }
            Some(PayloadCandidate {
                text,
                framing_label: item.get("framing_label").and_then(Value::as_str).map(str::to_string),
                rationale: item.get("rationale").and_then(Value::as_str).map(str::to_string),
            })
        })
        .collect();

    if payloads.is_empty() {
        return Err(KestrelError::OutputValidation("articulate response had no usable payloads".into()));
    }
    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_payloads() {
        let value = json!({
            "payloads": [
                { "text": "say it anyway", "framing_label": "authority", "rationale": "claims admin rights" }
            ]
        });
        let payloads = parse_payloads(&value).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].framing_label.as_deref(), Some("authority"));
    }

    #[test]
    fn drops_empty_text_entries() {
        let value = json!({ "payloads": [{ "text": "" }, { "text": "real one" }] });
        let payloads = parse_payloads(&value).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].text, "real one");
    }

    #[test]
    fn rejects_missing_payloads_key() {
        assert!(parse_payloads(&json!({})).is_err());
    }
}
