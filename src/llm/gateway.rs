use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::warn;

use crate::config::{LlmConfig, LlmRoleConfig};
use crate::errors::KestrelError;
use super::provider::LLMProvider;
use super::router::create_provider;

/// The three roles callers may request a completion for. The gateway is the
/// only place that knows concrete provider/model identifiers (SPEC_FULL §4.2);
/// everyone else asks for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    Reasoning,
    Scoring,
    Reconnaissance,
}

impl LlmRole {
    fn as_str(&self) -> &'static str {
        match self {
            LlmRole::Reasoning => "reasoning",
            LlmRole::Scoring => "scoring",
            LlmRole::Reconnaissance => "reconnaissance",
        }
    }
}

/// Dispatches role-tagged completions to concrete providers and enforces
/// schema compliance on structured output, retrying with corrective feedback
/// when the model returns JSON that doesn't validate.
pub struct LlmGateway {
    reasoning: Box<dyn LLMProvider>,
    scoring: Box<dyn LLMProvider>,
    reconnaissance: Box<dyn LLMProvider>,
    schema_retries: u32,
}

fn role_config<'a>(cfg: &'a LlmConfig, role: LlmRole) -> Option<&'a LlmRoleConfig> {
    match role {
        LlmRole::Reasoning => cfg.reasoning.as_ref(),
        LlmRole::Scoring => cfg.scoring.as_ref(),
        LlmRole::Reconnaissance => cfg.reconnaissance.as_ref(),
    }
}

fn build_provider(cfg: &LlmConfig, role: LlmRole) -> Result<Box<dyn LLMProvider>, KestrelError> {
    let role_cfg = role_config(cfg, role);
    let provider_name = role_cfg
        .and_then(|r| r.provider.as_deref())
        .unwrap_or("anthropic");
    let api_key = role_cfg
        .and_then(|r| r.api_key.as_deref())
        .ok_or_else(|| {
            KestrelError::Config(format!(
                "no API key configured for llm.{} (provider {})",
                role.as_str(),
                provider_name
            ))
        })?;
    let model = role_cfg.and_then(|r| r.model.as_deref());
    let base_url = role_cfg.and_then(|r| r.base_url.as_deref());
    create_provider(provider_name, api_key, model, base_url)
}

impl LlmGateway {
    pub fn new(cfg: &LlmConfig) -> Result<Self, KestrelError> {
        Ok(Self {
            reasoning: build_provider(cfg, LlmRole::Reasoning)?,
            scoring: build_provider(cfg, LlmRole::Scoring)?,
            reconnaissance: build_provider(cfg, LlmRole::Reconnaissance)?,
            schema_retries: cfg.schema_retries,
        })
    }

    fn provider_for(&self, role: LlmRole) -> &dyn LLMProvider {
        match role {
            LlmRole::Reasoning => self.reasoning.as_ref(),
            LlmRole::Scoring => self.scoring.as_ref(),
            LlmRole::Reconnaissance => self.reconnaissance.as_ref(),
        }
    }

    pub async fn complete(
        &self,
        role: LlmRole,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<super::types::LLMResponse, KestrelError> {
        self.provider_for(role).complete(prompt, system).await
    }

    /// Structured completion with bounded schema-validate-retry (SPEC_FULL §4.2
    /// and testable property around `SchemaFailure`). Each retry re-prompts with
    /// the validator's corrective feedback appended.
    pub async fn complete_structured(
        &self,
        role: LlmRole,
        prompt: &str,
        schema: &Value,
        system: Option<&str>,
    ) -> Result<Value, KestrelError> {
        let compiled = JSONSchema::compile(schema)
            .map_err(|e| KestrelError::Config(format!("invalid output schema: {}", e)))?;

        let provider = self.provider_for(role);
        let mut attempt_prompt = prompt.to_string();

        for attempt in 0..=self.schema_retries {
            let result = provider.complete_structured(&attempt_prompt, schema, system).await?;
            match compiled.validate(&result) {
                Ok(()) => return Ok(result),
                Err(errors) => {
                    let feedback: Vec<String> = errors.map(|e| e.to_string()).collect();
                    warn!(role = role.as_str(), attempt, errors = ?feedback, "structured output failed schema validation");
                    if attempt == self.schema_retries {
                        return Err(KestrelError::SchemaFailure(format!(
                            "output did not validate after {} attempts: {}",
                            attempt + 1,
                            feedback.join("; ")
                        )));
                    }
                    attempt_prompt = format!(
                        "{}\n\nYour previous response failed schema validation with these errors:\n{}\n\nRespond again with ONLY JSON that fixes these issues.",
                        prompt,
                        feedback.join("\n")
                    );
                }
            }
        }
        unreachable!("loop always returns within schema_retries + 1 iterations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough_schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "ok": { "type": "boolean" } },
            "required": ["ok"]
        })
    }

    #[test]
    fn schema_compiles() {
        assert!(JSONSchema::compile(&passthrough_schema()).is_ok());
    }

    #[test]
    fn role_as_str_matches_config_keys() {
        assert_eq!(LlmRole::Reasoning.as_str(), "reasoning");
        assert_eq!(LlmRole::Scoring.as_str(), "scoring");
        assert_eq!(LlmRole::Reconnaissance.as_str(), "reconnaissance");
    }
}
