//! Configuration management for sitewatch.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/sitewatch/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Probe timeouts and HTTP identity
    pub probes: ProbeConfig,
    /// Batch execution settings
    pub batch: BatchConfig,
    /// Where version lineages, screenshots and the database live
    pub storage: StorageConfig,
    /// Screenshot capture settings
    pub capture: CaptureConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_or_default(&Self::config_path()?)
    }

    /// Load configuration from an explicit path.
    ///
    /// # Errors
    /// Unlike [`AppConfig::load`], a missing file is an error
    /// (`ConfigError::NotFound`).
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if !config_path.is_file() {
            return Err(ConfigError::NotFound(config_path.to_path_buf()));
        }
        tracing::debug!("Loading config from {}", config_path.display());
        let contents = fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn load_or_default(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `SITEWATCH_TIMEOUT_SECS`: Override the per-call probe timeout
    /// - `SITEWATCH_CONCURRENCY`: Override the number of sites audited at once
    /// - `SITEWATCH_CAPTURE`: Enable or disable screenshots (true/false)
    /// - `SITEWATCH_STORAGE_DIR`: Override the storage root directory
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SITEWATCH_*` environment overrides in place.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("SITEWATCH_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.probes.timeout_secs = secs;
                tracing::debug!("Override probes.timeout_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("SITEWATCH_CONCURRENCY") {
            if let Ok(sites) = val.parse() {
                self.batch.concurrent_sites = sites;
                tracing::debug!("Override batch.concurrent_sites from env: {}", sites);
            }
        }

        if let Ok(val) = std::env::var("SITEWATCH_CAPTURE") {
            if let Ok(enabled) = val.parse() {
                self.capture.enabled = enabled;
                tracing::debug!("Override capture.enabled from env: {}", enabled);
            }
        }

        if let Ok(val) = std::env::var("SITEWATCH_STORAGE_DIR") {
            if !val.trim().is_empty() {
                tracing::debug!("Override storage.root_dir from env: {}", val);
                self.storage.root_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.probes.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probes.timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        if self.probes.max_redirects == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probes.max_redirects".to_string(),
                reason: "must allow at least one hop".to_string(),
            });
        }

        if self.batch.concurrent_sites == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch.concurrent_sites".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.capture.viewport_width == 0 || self.capture.viewport_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.viewport".to_string(),
                reason: "width and height must be non-zero".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to the default location.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/sitewatch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/sitewatch`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    /// Resolve the storage root: the configured directory or `<data_dir>/domains`.
    pub fn storage_root(&self) -> ConfigResult<PathBuf> {
        match &self.storage.root_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::data_dir()?.join("domains")),
        }
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("org", "sitewatch", "sitewatch").ok_or(ConfigError::NoConfigDir)
}

/// Probe timeouts and HTTP identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Timeout applied to every network call, in seconds
    pub timeout_secs: u64,
    /// Maximum number of redirect hops followed before the chain is rejected
    pub max_redirects: usize,
    /// User agent for ordinary probe requests
    pub user_agent: String,
    /// Desktop browser user agent used by the browser-like reachability method
    pub browser_user_agent: String,
    /// Whether the ICMP ping probe shells out to the system `ping`
    pub ping_enabled: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 10,
            user_agent: format!("sitewatch/{}", env!("CARGO_PKG_VERSION")),
            browser_user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ping_enabled: true,
        }
    }
}

/// Batch execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of site pipelines run at the same time
    pub concurrent_sites: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrent_sites: 4,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one sub-directory per domain
    pub root_dir: Option<PathBuf>,
    /// Database file name, relative to the root directory
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            database_file: "sitewatch.db".to_string(),
        }
    }
}

/// Screenshot capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture a homepage screenshot as the last pipeline step
    pub enabled: bool,
    /// Run the browser in headless mode
    pub headless: bool,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels (the captured fold)
    pub viewport_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Delay after navigation before the screenshot is taken
    pub settle_millis: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            navigation_timeout_secs: 30,
            settle_millis: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.probes.timeout_secs, 10);
        assert_eq!(config.probes.max_redirects, 10);
        assert_eq!(config.batch.concurrent_sites, 4);
        assert!(config.capture.enabled);
        assert!(config.capture.headless);
        assert_eq!(config.capture.viewport_width, 1280);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[probes]"));
        assert!(toml_str.contains("[batch]"));
        assert!(toml_str.contains("[capture]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.probes.user_agent, config.probes.user_agent);
    }

    #[test]
    fn test_config_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.probes.timeout_secs = 5;
        config.storage.root_dir = Some(tmp.path().join("sites"));

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.probes.timeout_secs, 5);
        assert_eq!(
            loaded.storage_root().expect("storage root"),
            tmp.path().join("sites")
        );
    }

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded =
            AppConfig::load_or_default(&tmp.path().join("absent.toml")).expect("load config");
        assert_eq!(loaded.batch.concurrent_sites, 4);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("absent.toml");

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(ref p) if *p == path));

        // A directory is not a config file either
        assert!(matches!(
            AppConfig::load_from(tmp.path()),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.batch.concurrent_sites = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = AppConfig::default();
        config.probes.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("SITEWATCH_TIMEOUT_SECS", "3");
        std::env::set_var("SITEWATCH_CONCURRENCY", "8");
        std::env::set_var("SITEWATCH_CAPTURE", "false");
        std::env::set_var("SITEWATCH_STORAGE_DIR", "/tmp/sitewatch-test");

        let mut config = AppConfig::default();
        config.apply_env();
        assert_eq!(config.probes.timeout_secs, 3);
        assert_eq!(config.batch.concurrent_sites, 8);
        assert!(!config.capture.enabled);
        assert_eq!(
            config.storage.root_dir,
            Some(PathBuf::from("/tmp/sitewatch-test"))
        );

        std::env::remove_var("SITEWATCH_TIMEOUT_SECS");
        std::env::remove_var("SITEWATCH_CONCURRENCY");
        std::env::remove_var("SITEWATCH_CAPTURE");
        std::env::remove_var("SITEWATCH_STORAGE_DIR");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[probes]
timeout_secs = 20

[capture]
enabled = false
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.probes.timeout_secs, 20);
        assert!(!config.capture.enabled);
        // These should be defaults
        assert_eq!(config.probes.max_redirects, 10);
        assert_eq!(config.batch.concurrent_sites, 4);
        assert_eq!(config.storage.database_file, "sitewatch.db");
    }
}
