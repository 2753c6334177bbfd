use serde::{Deserialize, Serialize};
use sitewatch_core::Domain;
use sitewatch_db::DatabaseError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single probe did not succeed.
///
/// Probe failures are data: they are stored in the report entry, never
/// returned past the probe boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum ProbeError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("validation failure: {0}")]
    ValidationFailure(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("capture failure: {0}")]
    CaptureFailure(String),
}

impl ProbeError {
    /// Human-readable detail without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NetworkFailure(m)
            | Self::ValidationFailure(m)
            | Self::NotFound(m)
            | Self::ParseFailure(m)
            | Self::StorageFailure(m)
            | Self::CaptureFailure(m) => m,
        }
    }
}

/// Errors of the pipeline plumbing around the probes.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("audit of {domain} cancelled after {completed_steps} steps")]
    Cancelled {
        domain: Domain,
        completed_steps: usize,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TLS setup error: {0}")]
    Tls(String),
}

/// Errors of the content version store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_message() {
        let err = ProbeError::NotFound("https://example.com/robots.txt returned HTTP 404".into());
        assert_eq!(
            err.message(),
            "https://example.com/robots.txt returned HTTP 404"
        );
        assert!(err.to_string().starts_with("not found: "));
    }

    #[test]
    fn test_probe_error_serialization() {
        let err = ProbeError::ValidationFailure("redirect loop".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "ValidationFailure");
        assert_eq!(json["message"], "redirect loop");

        let back: ProbeError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_cancelled_display() {
        let err = ScanError::Cancelled {
            domain: Domain::new("example.com").unwrap(),
            completed_steps: 3,
        };
        assert_eq!(err.to_string(), "audit of example.com cancelled after 3 steps");
    }
}
