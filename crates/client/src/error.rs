//! Configuration errors
//!
//! Runtime operations report [`linkstore_core::Error`]; only loading a
//! [`ClientConfig`](crate::ClientConfig) has its own error type.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load a client configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`ClientConfig`](crate::ClientConfig)
    #[error("failed to parse config '{origin}': {source}")]
    Parse {
        /// File path, or `<string>` for in-memory text
        origin: String,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },

    /// Config parsed but holds an unusable value
    #[error("invalid config: {0}")]
    Invalid(String),
}
