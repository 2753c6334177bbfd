//! Sitewatch Scanner - per-site audit pipeline.
//!
//! This crate runs the ordered probe pipeline against one site, aggregates
//! the results into a [`SiteReport`], derives a weighted score and severity
//! band, and keeps a lineage of the site's HTML across runs.
//!
//! # Features
//!
//! - 16-step pipeline where every failure is recorded as data
//! - Five-method reachability fallback (GET, browser GET, trailing slash, HEAD, TCP)
//! - Manual redirect following with loop detection
//! - Declared scoring weights with fixed band boundaries
//! - Content versioning with per-domain serialisation
//! - Bounded concurrency and cooperative cancellation for batches
//!
//! # Example
//!
//! ```rust,ignore
//! use sitewatch_scanner::{AuditOrchestrator, NetTransport, SqliteVersionStore};
//! use std::sync::Arc;
//!
//! let orchestrator = AuditOrchestrator::new(
//!     Arc::new(NetTransport::new(&config.probes)?),
//!     Arc::new(SqliteVersionStore::new(database, layout.clone())),
//!     layout,
//! )
//! .with_capture(Arc::new(capture_engine));
//!
//! let report = orchestrator.audit_site(&site, &CancellationToken::new()).await?;
//! println!("{} scored {} ({})", report.site, report.score, report.band);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod probes;
#[allow(missing_docs)]
pub mod report;
pub mod scoring;
#[allow(missing_docs)]
pub mod transport;
pub mod versioning;

// Re-export commonly used types
pub use error::{ProbeError, Result, ScanError, StoreError};
pub use orchestrator::{AuditOrchestrator, BatchOutcome, DEFAULT_CONCURRENT_SITES};
pub use probes::{FetchedPage, ProbeOptions};
pub use report::{
    Band, PipelineEvent, ProbeEntry, ProbeKind, ProbeResult, ProbeStatus, SiteReport,
};
pub use transport::{
    CertificateInfo, FetchRequest, FetchResponse, HttpMethod, NetTransport, Transport,
};
pub use versioning::{content_hash, SqliteVersionStore, VersionOutcome, VersionStore};
