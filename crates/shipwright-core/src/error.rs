//! Error types for configuration.
//!
//! Each release operation carries its own error enum next to its code
//! (`ExtractError`, `PublishError`, ...).

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// A config file passed explicitly does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(Utf8PathBuf),

    /// A value parsed but cannot be used.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Dotted config key, e.g. `github.api_url`.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
