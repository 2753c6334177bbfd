//! Content version lineage rows.
//!
//! One lineage per domain. Rows are only ever appended; the caller is
//! responsible for allocating `latest + 1` under its per-domain lock, and the
//! `(domain, sequence)` primary key rejects any duplicate allocation.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewatch_core::Domain;
use sqlx::SqliteExecutor;

/// A stored HTML snapshot of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Lineage key
    pub domain: Domain,
    /// 1-based, contiguous sequence number within the lineage
    pub sequence: i64,
    /// Hex SHA-256 of the stored content
    pub content_hash: String,
    /// Size of the stored content in bytes
    pub content_length: i64,
    /// File name inside the domain directory
    pub file_name: String,
    /// When the version was stored
    pub stored_at: DateTime<Utc>,
}

type VersionRow = (String, i64, String, i64, String, String);

fn decode_row(row: VersionRow) -> Result<VersionRecord> {
    let (domain, sequence, content_hash, content_length, file_name, stored_at) = row;
    let domain = Domain::new(domain.as_str())
        .map_err(|e| DatabaseError::Decode(format!("invalid domain '{domain}': {e}")))?;
    let stored_at = DateTime::parse_from_rfc3339(&stored_at)
        .map_err(|e| DatabaseError::Decode(format!("invalid stored_at '{stored_at}': {e}")))?
        .with_timezone(&Utc);

    Ok(VersionRecord {
        domain,
        sequence,
        content_hash,
        content_length,
        file_name,
        stored_at,
    })
}

/// Fetch the latest version of a domain, if any.
pub async fn latest_version<'e, E>(executor: E, domain: &Domain) -> Result<Option<VersionRecord>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, VersionRow>(
        "SELECT domain, sequence, content_hash, content_length, file_name, stored_at
         FROM site_versions WHERE domain = ? ORDER BY sequence DESC LIMIT 1",
    )
    .bind(domain.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(decode_row).transpose()
}

/// Append a version row.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the `(domain, sequence)` pair already exists.
pub async fn insert_version<'e, E>(executor: E, record: &VersionRecord) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO site_versions (domain, sequence, content_hash, content_length, file_name, stored_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(record.domain.as_str())
    .bind(record.sequence)
    .bind(&record.content_hash)
    .bind(record.content_length)
    .bind(&record.file_name)
    .bind(record.stored_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Number of versions stored for a domain.
pub async fn count_versions<'e, E>(executor: E, domain: &Domain) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM site_versions WHERE domain = ?")
        .bind(domain.as_str())
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Full lineage of a domain, oldest first.
pub async fn list_versions<'e, E>(executor: E, domain: &Domain) -> Result<Vec<VersionRecord>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, VersionRow>(
        "SELECT domain, sequence, content_hash, content_length, file_name, stored_at
         FROM site_versions WHERE domain = ? ORDER BY sequence ASC",
    )
    .bind(domain.as_str())
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(decode_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_test_db() -> Database {
        let db = Database::in_memory().await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    fn record(domain: &Domain, sequence: i64, hash: &str) -> VersionRecord {
        VersionRecord {
            domain: domain.clone(),
            sequence,
            content_hash: hash.to_string(),
            content_length: 42,
            file_name: sitewatch_core::version_file_name(sequence),
            stored_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_latest_version_empty() {
        let db = setup_test_db().await;
        let domain = Domain::new("example.com").expect("valid domain");

        let latest = latest_version(db.pool(), &domain).await.expect("query");
        assert!(latest.is_none());
        assert_eq!(count_versions(db.pool(), &domain).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_insert_and_list_versions() {
        let db = setup_test_db().await;
        let domain = Domain::new("example.com").expect("valid domain");
        let other = Domain::new("other.org").expect("valid domain");

        insert_version(db.pool(), &record(&domain, 1, "aa")).await.expect("insert 1");
        insert_version(db.pool(), &record(&domain, 2, "bb")).await.expect("insert 2");
        insert_version(db.pool(), &record(&other, 1, "cc")).await.expect("insert other");

        let latest = latest_version(db.pool(), &domain)
            .await
            .expect("query")
            .expect("latest exists");
        assert_eq!(latest.sequence, 2);
        assert_eq!(latest.content_hash, "bb");
        assert_eq!(latest.file_name, "v000002.html");

        let lineage = list_versions(db.pool(), &domain).await.expect("list");
        let sequences: Vec<i64> = lineage.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(count_versions(db.pool(), &other).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sequence_rejected() {
        let db = setup_test_db().await;
        let domain = Domain::new("example.com").expect("valid domain");

        insert_version(db.pool(), &record(&domain, 1, "aa")).await.expect("insert");
        let result = insert_version(db.pool(), &record(&domain, 1, "bb")).await;
        assert!(matches!(result, Err(DatabaseError::Sqlx(_))));
    }
}
