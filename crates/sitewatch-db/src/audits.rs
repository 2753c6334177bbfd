//! Audit history: one row per completed site report.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Sqlite};

/// A stored audit summary with the full report as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRun {
    /// Row identifier
    pub id: i64,
    /// Lineage key of the audited site
    pub domain: String,
    /// URL as audited
    pub url: String,
    /// Composite score, 0-100
    pub score: u8,
    /// Severity band name (`Red`, `Yellow` or `Green`)
    pub band: String,
    /// Whether the run stored a new content version
    pub version_changed: bool,
    /// Serialized site report
    pub report: JsonValue,
    /// When the audit finished
    pub audited_at: DateTime<Utc>,
}

/// Input for [`record_audit`].
#[derive(Debug, Clone)]
pub struct NewAuditRun<'a> {
    /// Lineage key of the audited site
    pub domain: &'a str,
    /// URL as audited
    pub url: &'a str,
    /// Composite score, 0-100
    pub score: u8,
    /// Severity band name
    pub band: &'a str,
    /// Whether the run stored a new content version
    pub version_changed: bool,
    /// Serialized site report
    pub report: JsonValue,
    /// When the audit finished
    pub audited_at: DateTime<Utc>,
}

/// Store an audit summary.
///
/// # Errors
/// Returns `DatabaseError` if the report cannot be serialized or the insert fails.
pub async fn record_audit(pool: &Pool<Sqlite>, run: NewAuditRun<'_>) -> Result<i64> {
    let report = serde_json::to_string(&run.report)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

    let result = sqlx::query(
        "INSERT INTO audit_runs (domain, url, score, band, version_changed, report, audited_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(run.domain)
    .bind(run.url)
    .bind(i64::from(run.score))
    .bind(run.band)
    .bind(run.version_changed)
    .bind(report)
    .bind(run.audited_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent audits of a domain, newest first.
pub async fn recent_audits(pool: &Pool<Sqlite>, domain: &str, limit: u32) -> Result<Vec<AuditRun>> {
    let rows = sqlx::query_as::<_, (i64, String, String, i64, String, bool, String, String)>(
        "SELECT id, domain, url, score, band, version_changed, report, audited_at
         FROM audit_runs WHERE domain = ? ORDER BY audited_at DESC, id DESC LIMIT ?",
    )
    .bind(domain)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(
            |(id, domain, url, score, band, version_changed, report, audited_at)| {
                let score = u8::try_from(score)
                    .map_err(|_| DatabaseError::Decode(format!("score out of range: {score}")))?;
                let report = serde_json::from_str(&report)
                    .map_err(|e| DatabaseError::Decode(format!("invalid report JSON: {e}")))?;
                let audited_at = DateTime::parse_from_rfc3339(&audited_at)
                    .map_err(|e| DatabaseError::Decode(format!("invalid audited_at: {e}")))?
                    .with_timezone(&Utc);

                Ok(AuditRun {
                    id,
                    domain,
                    url,
                    score,
                    band,
                    version_changed,
                    report,
                    audited_at,
                })
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_record_and_list_audits() {
        let db = Database::in_memory().await.expect("create database");
        db.run_migrations().await.expect("run migrations");

        let first = chrono::Utc::now() - chrono::Duration::minutes(5);
        let second = chrono::Utc::now();

        for (score, band, at) in [(35_u8, "Red", first), (92_u8, "Green", second)] {
            record_audit(
                db.pool(),
                NewAuditRun {
                    domain: "example.com",
                    url: "https://example.com/",
                    score,
                    band,
                    version_changed: score > 50,
                    report: serde_json::json!({ "score": score }),
                    audited_at: at,
                },
            )
            .await
            .expect("record audit");
        }

        let runs = recent_audits(db.pool(), "example.com", 10)
            .await
            .expect("list audits");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].score, 92);
        assert_eq!(runs[0].band, "Green");
        assert!(runs[0].version_changed);
        assert_eq!(runs[0].report["score"], 92);
        assert_eq!(runs[1].band, "Red");

        let limited = recent_audits(db.pool(), "example.com", 1)
            .await
            .expect("list audits");
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_band_rejected() {
        let db = Database::in_memory().await.expect("create database");
        db.run_migrations().await.expect("run migrations");

        let result = record_audit(
            db.pool(),
            NewAuditRun {
                domain: "example.com",
                url: "https://example.com/",
                score: 50,
                band: "Blue",
                version_changed: false,
                report: serde_json::json!({}),
                audited_at: chrono::Utc::now(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
