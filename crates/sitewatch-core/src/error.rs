//! Core error types for sitewatch.
//!
//! This module defines the central error type shared by the workspace crates.
//! Probe-level failures are not errors at this layer: they are recorded as
//! data in the site report by the scanner crate.

use thiserror::Error;

/// Central error type for sitewatch plumbing.
#[derive(Error, Debug)]
pub enum SitewatchError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage layout errors (directory creation, path resolution)
    #[error("storage error: {0}")]
    Storage(String),

    /// Validation errors (invalid URL, invalid domain)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// An explicitly named config file does not exist
    #[error("config file {} not found", .0.display())]
    NotFound(std::path::PathBuf),

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `SitewatchError`.
pub type Result<T> = std::result::Result<T, SitewatchError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
