//! Session configuration.
//!
//! Read from TOML. Every section is optional; missing keys take the defaults
//! below.
//!
//! ```toml
//! [overloads]
//! policy = "fallback"
//!
//! [type_map]
//! integer = "System.Int32"
//! sequence = "System.Collections.Generic.IList"
//!
//! [extensions]
//! enabled = true
//! preload = ["System.Linq"]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub overloads: OverloadConfig,
    pub type_map: TypeMapConfig,
    pub extensions: ExtensionConfig,
}

/// What the overload selector does when no overload has the wanted arity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverloadPolicy {
    /// Warn and use the first overload in group order.
    #[default]
    Fallback,
    /// Fail with `OverloadNotFound`.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverloadConfig {
    pub policy: OverloadPolicy,
}

/// Dotted foreign type names produced by the type mapper.
/// `sequence` and `mapping` name generic definitions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TypeMapConfig {
    pub integer: String,
    pub wide_integer: String,
    pub float: String,
    pub text: String,
    pub sequence: String,
    pub mapping: String,
    pub object: String,
}

impl Default for TypeMapConfig {
    fn default() -> Self {
        TypeMapConfig {
            integer: "System.Int32".to_string(),
            wide_integer: "System.Int64".to_string(),
            float: "System.Double".to_string(),
            text: "System.String".to_string(),
            sequence: "System.Collections.Generic.IList".to_string(),
            mapping: "System.Collections.Generic.IDictionary".to_string(),
            object: "System.Object".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Install the extension member strategy.
    pub enabled: bool,
    /// Namespaces scanned for extension methods when the session is built.
    pub preload: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        ExtensionConfig {
            enabled: true,
            preload: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "failed to read {}: {}", path.display(), message)
            }
            ConfigError::Parse(message) => write!(f, "failed to parse session config: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SessionConfig {
    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<SessionConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<SessionConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = SessionConfig::from_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.overloads.policy, OverloadPolicy::Fallback);
        assert!(config.extensions.enabled);
        assert!(config.extensions.preload.is_empty());
        assert_eq!(config.type_map.integer, "System.Int32");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[overloads]
policy = "strict"

[type_map]
integer = "Core.I32"
sequence = "Core.Seq"

[extensions]
enabled = false
preload = ["System.Linq", "Demo.Extensions"]
"#;
        let config = SessionConfig::from_str(toml).unwrap();
        assert_eq!(config.overloads.policy, OverloadPolicy::Strict);
        assert_eq!(config.type_map.integer, "Core.I32");
        assert_eq!(config.type_map.sequence, "Core.Seq");
        // Unset keys in a present section keep their defaults.
        assert_eq!(config.type_map.text, "System.String");
        assert!(!config.extensions.enabled);
        assert_eq!(config.extensions.preload, vec!["System.Linq", "Demo.Extensions"]);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = SessionConfig::from_str("[overloads]\npolicy = \"loose\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse session config:"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SessionConfig::from_file(Path::new("/nonexistent/dynbind.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
