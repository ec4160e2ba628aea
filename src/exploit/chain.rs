use crate::models::FailureCause;

/// Single converters considered for escalation when no handcrafted or
/// KB-recommended chain applies. Order matters: it's the tie-break when
/// nothing else distinguishes two untried candidates.
const OBFUSCATION_WHITELIST: [&str; 5] = ["leetspeak", "zero_width_insert", "rot13", "unicode_escape", "base64_encode"];

fn handcrafted_chain(cause: FailureCause) -> Vec<String> {
    match cause {
        FailureCause::Blocked => vec!["leetspeak".into(), "base64_encode".into()],
        FailureCause::NoImpact => vec!["zero_width_insert".into()],
        FailureCause::PartialSuccess => vec!["rot13".into()],
        FailureCause::RateLimited | FailureCause::Error => vec![],
    }
}

/// Deterministic ranker over chain candidates (SPEC_FULL §4.10 node 8):
/// KB-recommended chain first, then a handcrafted chain keyed by the
/// current failure cause, then single-converter escalations from a fixed
/// whitelist, then the trivial (no-converter) chain. Already-tried chains
/// are skipped. `None` means every candidate, including the trivial chain,
/// has already been tried and the loop should halt.
pub fn discover_next_chain(cause: FailureCause, kb_recommendation: Option<Vec<String>>, tried: &[Vec<String>]) -> Option<Vec<String>> {
    let mut candidates: Vec<Vec<String>> = Vec::new();
    if let Some(chain) = kb_recommendation {
        candidates.push(chain);
    }
    candidates.push(handcrafted_chain(cause));
    for conv in OBFUSCATION_WHITELIST {
        candidates.push(vec![conv.to_string()]);
    }
    candidates.push(Vec::new());

    candidates.into_iter().find(|c| !tried.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kb_recommendation_wins_when_untried() {
        let chain = discover_next_chain(FailureCause::Blocked, Some(vec!["hex_encode".into()]), &[]);
        assert_eq!(chain, Some(vec!["hex_encode".to_string()]));
    }

    #[test]
    fn falls_through_to_handcrafted_chain_when_kb_already_tried() {
        let tried = vec![vec!["hex_encode".to_string()]];
        let chain = discover_next_chain(FailureCause::Blocked, Some(vec!["hex_encode".into()]), &tried);
        assert_eq!(chain, Some(vec!["leetspeak".to_string(), "base64_encode".to_string()]));
    }

    #[test]
    fn falls_through_to_whitelist_once_handcrafted_tried() {
        let tried = vec![vec!["leetspeak".to_string(), "base64_encode".to_string()]];
        let chain = discover_next_chain(FailureCause::Blocked, None, &tried);
        assert_eq!(chain, Some(vec!["leetspeak".to_string()]));
    }

    #[test]
    fn falls_back_to_trivial_chain_when_all_escalations_tried() {
        let mut tried: Vec<Vec<String>> = vec![vec!["leetspeak".to_string(), "base64_encode".to_string()]];
        tried.extend(OBFUSCATION_WHITELIST.iter().map(|c| vec![c.to_string()]));
        let chain = discover_next_chain(FailureCause::Blocked, None, &tried);
        assert_eq!(chain, Some(Vec::new()));
    }

    #[test]
    fn returns_none_once_trivial_chain_is_also_tried() {
        let mut tried: Vec<Vec<String>> = vec![vec!["leetspeak".to_string(), "base64_encode".to_string()], Vec::new()];
        tried.extend(OBFUSCATION_WHITELIST.iter().map(|c| vec![c.to_string()]));
        let chain = discover_next_chain(FailureCause::Blocked, None, &tried);
        assert_eq!(chain, None);
    }
}
