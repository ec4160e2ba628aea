use super::types::KestrelError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl KestrelError {
    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            KestrelError::RateLimit(_) => ErrorClassification {
                error_type: "RateLimitError",
                retryable: true,
            },
            KestrelError::Billing(_) => ErrorClassification {
                error_type: "BillingError",
                retryable: true,
            },
            KestrelError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
            },
            KestrelError::Timeout(_) | KestrelError::TargetTimeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: true,
            },
            KestrelError::OutputValidation(_) => ErrorClassification {
                error_type: "OutputValidationError",
                retryable: true,
            },
            KestrelError::LLMApi(_) => ErrorClassification {
                error_type: "LLMApiError",
                retryable: true,
            },
            KestrelError::SchemaFailure(_) => ErrorClassification {
                error_type: "SchemaFailureError",
                retryable: true,
            },
            KestrelError::TargetUnreachable(_) => ErrorClassification {
                error_type: "TargetUnreachableError",
                retryable: true,
            },
            KestrelError::ConverterFailure(_) => ErrorClassification {
                error_type: "ConverterFailureError",
                retryable: false,
            },

            // Non-retryable errors
            KestrelError::Authentication(_) => ErrorClassification {
                error_type: "AuthenticationError",
                retryable: false,
            },
            KestrelError::Permission(_) => ErrorClassification {
                error_type: "PermissionError",
                retryable: false,
            },
            KestrelError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            KestrelError::InvalidTarget(_) => ErrorClassification {
                error_type: "InvalidTargetError",
                retryable: false,
            },
            KestrelError::ExecutionLimit(_) => ErrorClassification {
                error_type: "ExecutionLimitError",
                retryable: false,
            },
            KestrelError::TargetRefused(_) => ErrorClassification {
                error_type: "TargetRefusedError",
                retryable: false,
            },
            KestrelError::PolicyVeto(_) => ErrorClassification {
                error_type: "PolicyVetoError",
                retryable: false,
            },
            KestrelError::ScanDegraded(_) => ErrorClassification {
                error_type: "ScanDegradedError",
                retryable: false,
            },
            KestrelError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                retryable: false,
            },
            KestrelError::Cancelled => ErrorClassification {
                error_type: "CancelledError",
                retryable: false,
            },

            // Default: retryable
            KestrelError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },
            KestrelError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: true,
            },
            KestrelError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: true,
            },
            KestrelError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                retryable: true,
            },
            KestrelError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: true,
            },
            KestrelError::Prompt(_) => ErrorClassification {
                error_type: "PromptError",
                retryable: false,
            },
        }
    }
}
