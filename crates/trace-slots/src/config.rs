//! Chain configuration loaded from YAML
//!
//! ```yaml
//! slots: [logging, validation, limiter, invoke]
//! logging:
//!   config_key_pattern: "{class}:{method}"
//!   log_errors: true
//! limiter:
//!   capacity: 100
//!   refill_per_sec: 50
//! ```

use crate::limiter::LimiterSettings;
use crate::logging::LoggingSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use trace_core::ChainError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG/IO: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CONFIG/YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CONFIG/LIMITER: {0}")]
    Limiter(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Slot names in execution order.
    pub slots: Vec<String>,
    pub logging: LoggingSettings,
    pub limiter: LimiterSettings,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            slots: vec!["logging".to_string(), "invoke".to_string()],
            logging: LoggingSettings::default(),
            limiter: LimiterSettings::default(),
        }
    }
}

impl TraceConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let limiter = &self.limiter;
        if !limiter.refill_per_sec.is_finite() || limiter.refill_per_sec < 0.0 {
            return Err(ConfigError::Limiter(format!(
                "refill_per_sec must be a non-negative number, got {}",
                limiter.refill_per_sec
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = TraceConfig::from_yaml_str(
            r#"
slots: [logging, limiter, invoke]
logging:
  config_key_pattern: "{method}"
  log_errors: true
limiter:
  capacity: 10
  refill_per_sec: 2.5
"#,
        )
        .unwrap();

        assert_eq!(config.slots, vec!["logging", "limiter", "invoke"]);
        assert!(config.logging.log_errors);
        assert_eq!(config.limiter.capacity, 10);
        assert_eq!(config.limiter.max_concurrent, None);
    }

    #[test]
    fn test_missing_sections_default() {
        let config = TraceConfig::from_yaml_str("slots: [validation]").unwrap();
        assert_eq!(config.logging.config_key_pattern, "{class}:{method}");
        assert_eq!(config.limiter.capacity, 0);
    }

    #[test]
    fn test_negative_refill_rejected() {
        let err = TraceConfig::from_yaml_str("limiter: { capacity: 1, refill_per_sec: -1 }")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Limiter(_)));
    }

    #[test]
    fn test_bad_yaml_rejected() {
        let err = TraceConfig::from_yaml_str("slots: {").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = TraceConfig::from_path("/nonexistent/trace.yaml").unwrap_err();
        assert!(err.to_string().starts_with("CONFIG/IO"));
    }
}
