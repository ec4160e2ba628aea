/// The eleven attack vectors put in front of the reasoning LLM each turn
/// (SPEC_FULL §4.8).
pub const ATTACK_VECTORS: [&str; 11] = [
    "direct enumeration",
    "error elicitation",
    "feature probing",
    "boundary testing",
    "infrastructure inference",
    "reverse engineering",
    "authorization testing",
    "permission escalation",
    "context extraction",
    "bypass attempts",
    "pattern recognition",
];

pub fn attack_vectors_prompt_block() -> String {
    ATTACK_VECTORS
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{}. {}", i + 1, v))
        .collect::<Vec<_>>()
        .join("\n")
}
