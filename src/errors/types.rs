use thiserror::Error;

#[derive(Debug, Error)]
pub enum KestrelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("LLM structured output did not validate against schema: {0}")]
    SchemaFailure(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Billing/quota error: {0}")]
    Billing(String),

    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),

    #[error("Target request timed out: {0}")]
    TargetTimeout(String),

    #[error("Target refused the request: {0}")]
    TargetRefused(String),

    #[error("Converter failed: {0}")]
    ConverterFailure(String),

    #[error("Scan plan rejected by safety policy: {0}")]
    PolicyVeto(String),

    #[error("Scan degraded beyond recovery: {0}")]
    ScanDegraded(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Output validation error: {0}")]
    OutputValidation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Execution limit reached: {0}")]
    ExecutionLimit(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Operation cancelled")]
    Cancelled,
}
