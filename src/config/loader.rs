//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{ClientConfig, API_BASE_URL_ENV};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides, then validate.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ClientConfig = toml::from_str(&content)?;
    finish(config)
}

/// Build a configuration from defaults plus environment overrides.
pub fn config_from_env() -> Result<ClientConfig, ConfigError> {
    finish(ClientConfig::default())
}

fn finish(mut config: ClientConfig) -> Result<ClientConfig, ConfigError> {
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config.security = config.security.normalized();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides from `lookup` (normally the process environment).
pub fn apply_overrides<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(API_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(base_url = %base_url, "Base URL taken from environment");
        config.api.base_url = base_url.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override() {
        let mut config = ClientConfig::default();
        apply_overrides(&mut config, |key| {
            (key == API_BASE_URL_ENV).then(|| " https://api.example.com ".to_string())
        });
        assert_eq!(config.api.base_url, "https://api.example.com");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = ClientConfig::default();
        apply_overrides(&mut config, |_| Some("  ".to_string()));
        assert_eq!(config.api.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_load_invalid_file_reports_validation() {
        let path = std::env::temp_dir()
            .join(format!("secure_client_cfg_{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[retries]\nmax_attempts = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("retries.max_attempts"));

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
