use std::path::Path;
use crate::errors::KestrelError;
use super::types::KestrelConfig;
use super::security::validate_security_patterns;

pub async fn parse_config(path: &Path) -> Result<KestrelConfig, KestrelError> {
    if !path.exists() {
        return Err(KestrelError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(KestrelError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;

    // Security pattern validation
    validate_security_patterns(&yaml)?;

    // Parse into typed config
    let config: KestrelConfig = serde_yaml::from_value(yaml)?;

    Ok(config)
}
