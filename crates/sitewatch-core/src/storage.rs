//! On-disk layout for per-domain artifacts.
//!
//! ```text
//! <root>/
//!   sitewatch.db
//!   example.com/
//!     v000001.html
//!     v000002.html
//!     print/homepage.png
//! ```

use crate::error::{Result, SitewatchError};
use crate::types::Domain;
use std::path::{Path, PathBuf};

/// Name of the screenshot sub-directory inside each domain directory.
pub const SCREENSHOT_DIR: &str = "print";

/// File name of the homepage capture, overwritten on every run.
pub const SCREENSHOT_FILE: &str = "homepage.png";

/// Resolves the paths the version store and capture adapter write into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
    database_file: String,
}

impl StorageLayout {
    /// Create a layout rooted at `root` using the default database file name.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            database_file: "sitewatch.db".to_string(),
        }
    }

    /// Override the database file name.
    #[must_use]
    pub fn with_database_file(mut self, name: impl Into<String>) -> Self {
        self.database_file = name.into();
        self
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the SQLite database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.root.join(&self.database_file)
    }

    /// Directory holding the version lineage of a domain.
    #[must_use]
    pub fn domain_dir(&self, domain: &Domain) -> PathBuf {
        self.root.join(domain.as_str())
    }

    /// Path of a stored HTML version.
    #[must_use]
    pub fn version_path(&self, domain: &Domain, file_name: &str) -> PathBuf {
        self.domain_dir(domain).join(file_name)
    }

    /// Path of the homepage screenshot for a domain.
    #[must_use]
    pub fn screenshot_path(&self, domain: &Domain) -> PathBuf {
        self.domain_dir(domain)
            .join(SCREENSHOT_DIR)
            .join(SCREENSHOT_FILE)
    }

    /// Create the root directory.
    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            SitewatchError::Storage(format!("cannot create {}: {e}", self.root.display()))
        })
    }

    /// Create the domain directory and its screenshot sub-directory.
    pub fn ensure_domain_dirs(&self, domain: &Domain) -> Result<PathBuf> {
        let dir = self.domain_dir(domain);
        let print_dir = dir.join(SCREENSHOT_DIR);
        std::fs::create_dir_all(&print_dir).map_err(|e| {
            SitewatchError::Storage(format!("cannot create {}: {e}", print_dir.display()))
        })?;
        Ok(dir)
    }
}

/// File name for a version sequence number: `v000042.html`.
#[must_use]
pub fn version_file_name(sequence: i64) -> String {
    format!("v{sequence:06}.html")
}
