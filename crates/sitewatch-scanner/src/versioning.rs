//! Content version store.
//!
//! Detects HTML changes between runs and appends them to the domain's
//! lineage. A new version is both a row in `site_versions` and a file in the
//! domain directory; the row only commits once the file is on disk. Content
//! is compared and stored as the exact bytes served.

use crate::error::StoreError;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sitewatch_core::{version_file_name, Domain, StorageLayout};
use sitewatch_db::{versions, Database, VersionRecord};
use tokio::sync::Mutex;

/// Result of offering content to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOutcome {
    /// The latest record after the call
    pub record: VersionRecord,
    /// Whether a new version was appended
    pub changed: bool,
    /// Lineage length after the call
    pub total_versions: i64,
}

#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    /// Append `content` as a new version unless it matches the latest one.
    async fn record_if_changed(
        &self,
        domain: &Domain,
        content: &[u8],
    ) -> Result<VersionOutcome, StoreError>;

    /// Most recent version of a domain.
    async fn latest(&self, domain: &Domain) -> Result<Option<VersionRecord>, StoreError>;

    /// Whole lineage, oldest first.
    async fn history(&self, domain: &Domain) -> Result<Vec<VersionRecord>, StoreError>;
}

/// Hex-encoded SHA-256 of `content`.
#[must_use]
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Version store backed by SQLite rows and HTML files on disk.
pub struct SqliteVersionStore {
    db: Database,
    layout: StorageLayout,
    // SQLite allows one writer. A deferred transaction that reads first and
    // writes later fails with SQLITE_BUSY when another connection got the
    // write lock in between, so the read-insert-commit section runs under
    // this lock for every domain.
    writer: Mutex<()>,
}

impl SqliteVersionStore {
    /// Store rows in `db` and files under `layout`.
    #[must_use]
    pub fn new(db: Database, layout: StorageLayout) -> Self {
        Self {
            db,
            layout,
            writer: Mutex::new(()),
        }
    }

    /// Where version files are written.
    #[must_use]
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}

#[async_trait::async_trait]
impl VersionStore for SqliteVersionStore {
    async fn record_if_changed(
        &self,
        domain: &Domain,
        content: &[u8],
    ) -> Result<VersionOutcome, StoreError> {
        let hash = content_hash(content);
        let _guard = self.writer.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let latest = versions::latest_version(&mut *tx, domain).await?;
        if let Some(latest) = latest.as_ref().filter(|l| l.content_hash == hash) {
            let total_versions = versions::count_versions(&mut *tx, domain).await?;
            tx.commit().await?;
            tracing::debug!(
                "{} unchanged since version {}",
                domain,
                latest.sequence
            );
            return Ok(VersionOutcome {
                record: latest.clone(),
                changed: false,
                total_versions,
            });
        }

        let sequence = latest.map_or(1, |l| l.sequence + 1);
        let record = VersionRecord {
            domain: domain.clone(),
            sequence,
            content_hash: hash,
            content_length: i64::try_from(content.len()).unwrap_or(i64::MAX),
            file_name: version_file_name(sequence),
            stored_at: Utc::now(),
        };
        versions::insert_version(&mut *tx, &record).await?;
        let total_versions = versions::count_versions(&mut *tx, domain).await?;

        let path = self.layout.version_path(domain, &record.file_name);
        let written = async {
            tokio::fs::create_dir_all(self.layout.domain_dir(domain)).await?;
            tokio::fs::write(&path, content).await
        }
        .await;

        if let Err(source) = written {
            if let Err(e) = tx.rollback().await {
                tracing::warn!("rollback of version {} for {} failed: {}", sequence, domain, e);
            }
            return Err(StoreError::Io { path, source });
        }

        if let Err(e) = tx.commit().await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        tracing::info!("{} stored version {} ({})", domain, sequence, record.file_name);
        Ok(VersionOutcome {
            record,
            changed: true,
            total_versions,
        })
    }

    async fn latest(&self, domain: &Domain) -> Result<Option<VersionRecord>, StoreError> {
        Ok(versions::latest_version(self.db.pool(), domain).await?)
    }

    async fn history(&self, domain: &Domain) -> Result<Vec<VersionRecord>, StoreError> {
        Ok(versions::list_versions(self.db.pool(), domain).await?)
    }
}
