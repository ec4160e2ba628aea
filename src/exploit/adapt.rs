use crate::config::KbConfig;
use crate::models::{AdaptationAction, AdaptationDecision, FailureAnalysis, FailureCause, HistoricalInsight};

/// Default action set per failure cause (SPEC_FULL §4.10 node 7).
pub fn default_actions(cause: FailureCause) -> Vec<AdaptationAction> {
    use AdaptationAction::*;
    match cause {
        FailureCause::Blocked => vec![EscalateObfuscation, ChangeConverters, UseBypassKb],
        FailureCause::NoImpact => vec![ChangeFraming, RegeneratePayloads, AddContext],
        FailureCause::PartialSuccess => vec![RetryWithSuffix, ChangeFraming],
        FailureCause::RateLimited => vec![ReducePayloadCount],
        FailureCause::Error => vec![ChangeConverters],
    }
}

/// Builds the iteration's `AdaptationDecision`. `kb_insight` is only present
/// when `use_bypass_kb` is in the action set and C11 was actually queried;
/// it overrides the recommended chain/framing when its confidence clears
/// `KbConfig.override_confidence`, and is otherwise merely advisory (left
/// unused by the caller, who falls through to chain discovery instead).
pub fn decide(failure: &FailureAnalysis, current_framing: Option<&str>, kb_insight: Option<&HistoricalInsight>, kb_config: &KbConfig) -> AdaptationDecision {
    let actions = default_actions(failure.cause);

    let kb_override = kb_insight.filter(|insight| actions.contains(&AdaptationAction::UseBypassKb) && insight.confidence > kb_config.override_confidence);

    let framing = match failure.cause {
        FailureCause::NoImpact | FailureCause::PartialSuccess => {
            kb_override.and_then(|i| i.recommended_framing.clone()).or_else(|| current_framing.map(str::to_string))
        }
        _ => current_framing.map(str::to_string),
    };

    let next_chain = kb_override.and_then(|i| i.recommended_chain.clone()).unwrap_or_default();

    AdaptationDecision { actions, framing, next_chain }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb_config() -> KbConfig {
        KbConfig { min_similarity: 0.6, top_k: 5, override_confidence: 0.7, embedding_dim: 64 }
    }

    #[test]
    fn blocked_maps_to_escalation_and_kb_lookup() {
        let actions = default_actions(FailureCause::Blocked);
        assert!(actions.contains(&AdaptationAction::EscalateObfuscation));
        assert!(actions.contains(&AdaptationAction::UseBypassKb));
    }

    #[test]
    fn rate_limited_maps_to_reduced_payload_count_only() {
        assert_eq!(default_actions(FailureCause::RateLimited), vec![AdaptationAction::ReducePayloadCount]);
    }

    #[test]
    fn kb_insight_overrides_chain_above_threshold() {
        let failure = FailureAnalysis { cause: FailureCause::Blocked, evidence: vec![], confidence: 0.9 };
        let insight = HistoricalInsight {
            technique_stats: vec![],
            recommended_chain: Some(vec!["base64_encode".into()]),
            recommended_framing: Some("role_play".into()),
            confidence: 0.85,
        };
        let decision = decide(&failure, None, Some(&insight), &kb_config());
        assert_eq!(decision.next_chain, vec!["base64_encode".to_string()]);
    }

    #[test]
    fn kb_insight_below_threshold_is_ignored() {
        let failure = FailureAnalysis { cause: FailureCause::Blocked, evidence: vec![], confidence: 0.9 };
        let insight = HistoricalInsight { technique_stats: vec![], recommended_chain: Some(vec!["rot13".into()]), recommended_framing: None, confidence: 0.5 };
        let decision = decide(&failure, None, Some(&insight), &kb_config());
        assert!(decision.next_chain.is_empty());
    }

    #[test]
    fn no_impact_without_kb_insight_keeps_current_framing() {
        let failure = FailureAnalysis { cause: FailureCause::NoImpact, evidence: vec![], confidence: 0.5 };
        let decision = decide(&failure, Some("authority"), None, &kb_config());
        assert_eq!(decision.framing.as_deref(), Some("authority"));
    }
}
