//! Schema migrations embedded from `migrations/` at compile time.

use crate::error::{DatabaseError, Result};
use sqlx::migrate::Migrator;
use sqlx::{Pool, Sqlite};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Highest migration version shipped with this build.
#[must_use]
pub fn latest_version() -> i64 {
    MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Bring the schema up to [`latest_version`]. Already applied migrations are
/// skipped.
///
/// # Errors
/// `DatabaseError::Migration` when a migration fails or an applied one no
/// longer matches its embedded checksum.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    let before = get_schema_version(pool).await?;

    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("schema v{before}: {e}")))?;

    let after = get_schema_version(pool).await?;
    if after > before {
        tracing::info!("Schema migrated from v{} to v{}", before, after);
    } else {
        tracing::debug!("Schema already at v{}", after);
    }
    Ok(())
}

/// Version of the newest successfully applied migration, 0 on a fresh file.
///
/// # Errors
/// Returns `DatabaseError` if the bookkeeping table cannot be read.
pub async fn get_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    // sqlx creates its bookkeeping table on the first run
    let tracked: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;
    if !tracked {
        return Ok(0);
    }

    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;
    Ok(version.unwrap_or(0))
}
