use serde::{Deserialize, Serialize};

use super::scoring::CompositeScore;

/// Why an iteration failed to reach the success threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    NoImpact,
    Blocked,
    PartialSuccess,
    RateLimited,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub cause: FailureCause,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// One of the adaptation actions an iteration's analysis may choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationAction {
    ChangeFraming,
    EscalateObfuscation,
    UseBypassKb,
    RetryWithSuffix,
    SimplifyPayload,
    ChangeObjective,
    AddContext,
    ReducePayloadCount,
    ChangeConverters,
    RegeneratePayloads,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationDecision {
    pub actions: Vec<AdaptationAction>,
    pub framing: Option<String>,
    pub next_chain: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration_index: u32,
    pub payloads: Vec<String>,
    pub converted_payloads: Vec<String>,
    pub responses: Vec<String>,
    pub composite_score: CompositeScore,
    pub failure_analysis: Option<FailureAnalysis>,
    pub adaptation_decision: Option<AdaptationDecision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploitResult {
    pub campaign_id: String,
    pub is_successful: bool,
    pub best_score: f64,
    pub best_iteration: u32,
    pub iterations_run: u32,
    pub final_chain: Vec<String>,
    pub iteration_history: Vec<IterationRecord>,
    pub winning_episode_id: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

impl ExploitResult {
    /// Property 3/4: a successful result has exactly one successful iteration
    /// record, it's the best one, and iterations_run matches history length.
    pub fn satisfies_success_invariant(&self) -> bool {
        if !self.is_successful {
            return self.iteration_history.len() as u32 == self.iterations_run;
        }
        let successes: Vec<&IterationRecord> = self
            .iteration_history
            .iter()
            .filter(|r| r.composite_score.is_successful)
            .collect();
        successes.len() == 1
            && successes[0].iteration_index == self.best_iteration
            && !successes[0].converted_payloads.is_empty()
            && self.iteration_history.len() as u32 == self.iterations_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scoring::{ScorerKind, ScorerOutput, ScorerWeights};

    fn score(is_successful: bool) -> CompositeScore {
        CompositeScore::compute(
            vec![ScorerOutput { kind: ScorerKind::Jailbreak, score: if is_successful { 0.95 } else { 0.1 }, rationale: "".into() }],
            &ScorerWeights::default(),
            &[ScorerKind::Jailbreak],
            0.8,
        )
    }

    #[test]
    fn successful_result_has_exactly_one_success() {
        let result = ExploitResult {
            campaign_id: "c1".into(),
            is_successful: true,
            best_score: 0.95,
            best_iteration: 1,
            iterations_run: 2,
            final_chain: vec!["base64".into()],
            iteration_history: vec![
                IterationRecord { iteration_index: 0, payloads: vec!["p".into()], converted_payloads: vec!["p".into()], responses: vec!["r".into()], composite_score: score(false), failure_analysis: None, adaptation_decision: None },
                IterationRecord { iteration_index: 1, payloads: vec!["p2".into()], converted_payloads: vec!["p2".into()], responses: vec!["r2".into()], composite_score: score(true), failure_analysis: None, adaptation_decision: None },
            ],
            winning_episode_id: Some("e1".into()),
            cancelled: false,
        };
        assert!(result.satisfies_success_invariant());
    }

    #[test]
    fn failed_result_needs_no_success_iteration() {
        let result = ExploitResult {
            campaign_id: "c1".into(),
            is_successful: false,
            best_score: 0.1,
            best_iteration: 0,
            iterations_run: 1,
            final_chain: vec![],
            iteration_history: vec![
                IterationRecord { iteration_index: 0, payloads: vec!["p".into()], converted_payloads: vec!["p".into()], responses: vec!["r".into()], composite_score: score(false), failure_analysis: None, adaptation_decision: None },
            ],
            winning_episode_id: None,
            cancelled: false,
        };
        assert!(result.satisfies_success_invariant());
    }
}
