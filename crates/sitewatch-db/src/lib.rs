//! Sitewatch Database Layer
//!
//! Provides `SQLite` access for the content version lineage and the audit
//! history. Uses `SQLx` with embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use sitewatch_db::Database;
//!
//! let db = Database::new("sitewatch.db").await?;
//! db.run_migrations().await?;
//! ```
//!
//! # Design Principles
//!
//! - HTML snapshots live on disk; the database only records their lineage
//! - Version rows are append-only, keyed by `(domain, sequence)`
//! - Migrations are embedded at compile time and applied idempotently

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod audits;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod versions;

// Re-export commonly used types
pub use audits::{AuditRun, NewAuditRun};
pub use connection::SitePool;
pub use error::{DatabaseError, Result};
pub use versions::VersionRecord;

use std::path::Path;

/// High-level database interface.
///
/// Wraps a `SitePool` and exposes migrations plus raw pool access for the
/// query modules.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SitePool,
}

impl Database {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = SitePool::new(path).await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::new(connection::IN_MEMORY).await
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
