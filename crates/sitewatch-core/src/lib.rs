//! Sitewatch Core - Foundation crate for the sitewatch site auditor.
//!
//! This crate provides shared types, error handling, configuration management
//! and the on-disk storage layout that all other sitewatch crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - `SiteDescriptor` and the `Domain` lineage key
//! - [`storage`] - Per-domain directory layout for versions and screenshots
//!
//! # Example
//!
//! ```rust
//! use sitewatch_core::{AppConfig, SiteDescriptor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let site = SiteDescriptor::parse("https://www.example.com")?;
//! assert_eq!(site.domain().as_str(), "example.com");
//! assert_eq!(config.probes.max_redirects, 10);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BatchConfig, CaptureConfig, ProbeConfig, StorageConfig};
pub use error::{ConfigError, ConfigResult, Result, SitewatchError};
pub use storage::{version_file_name, StorageLayout};
pub use types::{Domain, SiteDescriptor};
