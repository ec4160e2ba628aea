/// Replace a secret value with a fixed-width placeholder so logs and
/// artifacts never carry live credentials (SPEC_FULL §6).
pub fn redact_value(_value: &str) -> &'static str {
    "***redacted***"
}

/// Redact the `Authorization` header (and any header literally named
/// `api-key`/`x-api-key`) from a header map rendered for logging.
pub fn redact_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            let lower = k.to_ascii_lowercase();
            if lower == "authorization" || lower.contains("api-key") || lower.contains("apikey") {
                (k.clone(), redact_value(v).to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_authorization_header() {
        let headers = vec![("Authorization".to_string(), "Bearer sk-live-xyz".to_string())];
        let redacted = redact_headers(&headers);
        assert_eq!(redacted[0].1, "***redacted***");
    }

    #[test]
    fn leaves_unrelated_headers_alone() {
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let redacted = redact_headers(&headers);
        assert_eq!(redacted[0].1, "application/json");
    }

    #[test]
    fn redacts_api_key_header_case_insensitively() {
        let headers = vec![("X-Api-Key".to_string(), "secret123".to_string())];
        let redacted = redact_headers(&headers);
        assert_eq!(redacted[0].1, "***redacted***");
    }
}
