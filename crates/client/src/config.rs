//! Client configuration via `linkstore.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use linkstore_core::RetryPolicy;

use crate::error::ConfigError;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "linkstore.toml";

/// Client configuration loaded from `linkstore.toml`.
///
/// # Example
///
/// ```toml
/// op_timeout_ms = 2000
/// span_prefix = "linkstore_"
///
/// [retry]
/// max_attempts = 5
/// start_delay_ms = 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deadline applied to each backend call when the caller's context has
    /// none. `0` disables it.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    /// Prefix cut from operation paths when naming spans.
    #[serde(default = "default_span_prefix")]
    pub span_prefix: String,
    /// Suffix cut from operation paths when naming spans.
    #[serde(default)]
    pub span_suffix: String,
    /// Policy handed out by [`KeyDbFactory::retrier`](crate::KeyDbFactory::retrier).
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_op_timeout_ms() -> u64 {
    5000
}

fn default_span_prefix() -> String {
    "linkstore_".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            op_timeout_ms: default_op_timeout_ms(),
            span_prefix: default_span_prefix(),
            span_suffix: String::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Per-operation timeout, `None` when disabled.
    pub fn op_timeout(&self) -> Option<Duration> {
        match self.op_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Check values serde cannot constrain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let coefficient = self.retry.backoff_coefficient;
        if !coefficient.is_finite() || coefficient < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "retry.backoff_coefficient must be a finite number >= 1, got {}",
                coefficient
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate config text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            origin: "<string>".to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ClientConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            origin: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# linkstore client configuration
#
# Deadline for each backend call when the caller gives none (0 = disabled)
op_timeout_ms = 5000

# Span names are the operation's module path with these cut off
span_prefix = "linkstore_"
span_suffix = ""

# Retry policy for callers wrapping store operations
[retry]
max_attempts = 3
start_delay_ms = 1000
max_delay_ms = 10000
backoff_coefficient = 2.0
"#
    }
}
