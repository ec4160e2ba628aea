use serde::{Deserialize, Serialize};

/// Root configuration surface, per SPEC_FULL §6. Sections mirror the
/// `MAX_RECON_TURNS` / `SCAN_APPROACH` / `EXPLOIT_*` / `KB_*` naming illustrated
/// there, laid out as one typed struct per concern.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KestrelConfig {
    pub target: Option<TargetConfig>,
    pub recon: Option<ReconConfig>,
    pub scan: Option<ScanConfig>,
    pub exploit: Option<ExploitConfig>,
    pub kb: Option<KbConfig>,
    pub llm: Option<LlmConfig>,
    pub scheduler: Option<SchedulerConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    None,
    Bearer,
    ApiKey,
    Basic,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetAuth {
    pub kind: AuthKind,
    pub header_name: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for TargetAuth {
    fn default() -> Self {
        Self { kind: AuthKind::None, header_name: None, token: None, username: None, password: None }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetProtocol {
    #[default]
    Http,
    WebSocket,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    pub url: String,
    #[serde(default)]
    pub protocol: TargetProtocol,
    #[serde(default = "default_message_field")]
    pub message_field: String,
    #[serde(default)]
    pub auth: TargetAuth,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// When set, the WebSocket channel reuses one connection across sends
    /// instead of opening a fresh one per send. Ignored for the HTTP
    /// protocol.
    #[serde(default)]
    pub ws_session_id: Option<String>,
}

fn default_message_field() -> String {
    "message".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconDepth {
    Shallow,
    #[default]
    Standard,
    Aggressive,
}

impl ReconDepth {
    pub fn max_turns(&self) -> u32 {
        match self {
            ReconDepth::Shallow => 5,
            ReconDepth::Standard => 10,
            ReconDepth::Aggressive => 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub depth: ReconDepth,
    #[serde(default)]
    pub forbidden_keywords: Vec<String>,
    pub special_instructions: Option<String>,
    #[serde(default = "default_sim_dedup_threshold")]
    pub sim_dedup_threshold: f64,
    #[serde(default = "default_min_observations_per_category")]
    pub min_observations_per_category: usize,
    #[serde(default = "default_min_tools")]
    pub min_tools: usize,
    #[serde(default = "default_consecutive_error_limit")]
    pub consecutive_error_limit: u32,
}

fn default_sim_dedup_threshold() -> f64 {
    0.8
}
fn default_min_observations_per_category() -> usize {
    3
}
fn default_min_tools() -> usize {
    5
}
fn default_consecutive_error_limit() -> u32 {
    3
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            depth: ReconDepth::default(),
            forbidden_keywords: Vec::new(),
            special_instructions: None,
            sim_dedup_threshold: default_sim_dedup_threshold(),
            min_observations_per_category: default_min_observations_per_category(),
            min_tools: default_min_tools(),
            consecutive_error_limit: default_consecutive_error_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanApproach {
    Quick,
    #[default]
    Standard,
    Thorough,
}

impl ScanApproach {
    pub fn probe_budget(&self) -> (u32, u32) {
        match self {
            ScanApproach::Quick => (3, 5),
            ScanApproach::Standard => (5, 10),
            ScanApproach::Thorough => (10, 20),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub approach: ScanApproach,
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
    #[serde(default = "default_max_concurrent_generations")]
    pub max_concurrent_generations: usize,
    #[serde(default = "default_planning_timeout_secs")]
    pub planning_timeout_secs: u64,
}

fn default_max_concurrent_probes() -> usize {
    10
}
fn default_max_concurrent_generations() -> usize {
    2
}
fn default_planning_timeout_secs() -> u64 {
    10
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            approach: ScanApproach::default(),
            max_concurrent_probes: default_max_concurrent_probes(),
            max_concurrent_generations: default_max_concurrent_generations(),
            planning_timeout_secs: default_planning_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExploitConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_success_scorers")]
    pub success_scorers: Vec<String>,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f64,
    pub initial_framing_hint: Option<String>,
    pub initial_chain: Option<Vec<String>>,
    #[serde(default = "default_payloads_per_iteration")]
    pub payloads_per_iteration: u32,
    #[serde(default = "default_iteration_deadline_secs")]
    pub iteration_deadline_secs: u64,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_success_scorers() -> Vec<String> {
    vec!["jailbreak".to_string()]
}
fn default_success_threshold() -> f64 {
    0.8
}
fn default_payloads_per_iteration() -> u32 {
    3
}
fn default_iteration_deadline_secs() -> u64 {
    60
}

impl Default for ExploitConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            success_scorers: default_success_scorers(),
            success_threshold: default_success_threshold(),
            initial_framing_hint: None,
            initial_chain: None,
            payloads_per_iteration: default_payloads_per_iteration(),
            iteration_deadline_secs: default_iteration_deadline_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KbConfig {
    #[serde(default = "default_kb_min_similarity")]
    pub min_similarity: f64,
    #[serde(default = "default_kb_top_k")]
    pub top_k: usize,
    #[serde(default = "default_kb_override_confidence")]
    pub override_confidence: f64,
    #[serde(default = "default_kb_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_kb_min_similarity() -> f64 {
    0.6
}
fn default_kb_top_k() -> usize {
    5
}
fn default_kb_override_confidence() -> f64 {
    0.7
}
fn default_kb_embedding_dim() -> usize {
    256
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_kb_min_similarity(),
            top_k: default_kb_top_k(),
            override_confidence: default_kb_override_confidence(),
            embedding_dim: default_kb_embedding_dim(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LlmRoleConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub reasoning: Option<LlmRoleConfig>,
    pub scoring: Option<LlmRoleConfig>,
    pub reconnaissance: Option<LlmRoleConfig>,
    #[serde(default = "default_llm_timeout_secs")]
    pub reasoning_timeout_secs: u64,
    #[serde(default = "default_schema_retries")]
    pub schema_retries: u32,
}

fn default_llm_timeout_secs() -> u64 {
    30
}
fn default_schema_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            reasoning: None,
            scoring: None,
            reconnaissance: None,
            reasoning_timeout_secs: default_llm_timeout_secs(),
            schema_retries: default_schema_retries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_requests_per_second() -> f64 {
    2.0
}
fn default_burst() -> u32 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { requests_per_second: default_requests_per_second(), burst: default_burst() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    pub directory: Option<String>,
    pub format: Option<String>,
}
