//! Runtime configuration, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// What to do when an input references an output nobody declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Leave the input unconnected silently.
    Allow,
    /// Leave the input unconnected and log a warning.
    #[default]
    Warn,
    /// Fail the whole unpack.
    Deny,
}

/// Settings for the graph unpacker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackConfig {
    /// Last output id already in use; a fresh cursor assigns from the next one.
    pub starting_output_id: u64,

    /// Handling of input references that resolve to nothing.
    pub unresolved_inputs: UnresolvedPolicy,
}

/// Top-level configuration for the behaviour runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviourConfig {
    pub unpack: UnpackConfig,
}

impl BehaviourConfig {
    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BehaviourConfig::from_toml_str("").unwrap();
        assert_eq!(config, BehaviourConfig::default());
        assert_eq!(config.unpack.unresolved_inputs, UnresolvedPolicy::Warn);
        assert_eq!(config.unpack.starting_output_id, 0);
    }

    #[test]
    fn test_parse_unpack_section() {
        let config = BehaviourConfig::from_toml_str(
            r#"
            [unpack]
            starting_output_id = 100
            unresolved_inputs = "deny"
            "#,
        )
        .unwrap();

        assert_eq!(config.unpack.starting_output_id, 100);
        assert_eq!(config.unpack.unresolved_inputs, UnresolvedPolicy::Deny);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = BehaviourConfig::from_toml_str("[unpack]\nunresolved_inputs = \"sometimes\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = BehaviourConfig::load("/definitely/not/here/behaviour.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
