//! Report model: pipeline steps, per-probe results and the site report.

use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewatch_core::{Domain, SiteDescriptor};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

/// One step of the site pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProbeKind {
    Reachability,
    Latency,
    Redirects,
    Tls,
    Dns,
    Ping,
    ContentType,
    Title,
    ErrorPatterns,
    RobotsTxt,
    SitemapXml,
    MetaRefresh,
    WordPress,
    Version,
    Performance,
    Screenshot,
}

impl ProbeKind {
    /// Every step in pipeline order.
    pub const ALL: [ProbeKind; 16] = [
        ProbeKind::Reachability,
        ProbeKind::Latency,
        ProbeKind::Redirects,
        ProbeKind::Tls,
        ProbeKind::Dns,
        ProbeKind::Ping,
        ProbeKind::ContentType,
        ProbeKind::Title,
        ProbeKind::ErrorPatterns,
        ProbeKind::RobotsTxt,
        ProbeKind::SitemapXml,
        ProbeKind::MetaRefresh,
        ProbeKind::WordPress,
        ProbeKind::Version,
        ProbeKind::Performance,
        ProbeKind::Screenshot,
    ];

    /// Number of pipeline steps.
    pub const COUNT: usize = Self::ALL.len();

    /// The step that runs first.
    #[must_use]
    pub fn first() -> Self {
        ProbeKind::Reachability
    }

    /// The step after this one, or `None` for the last step.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self as usize + 1).copied()
    }

    /// 1-based position in the pipeline.
    #[must_use]
    pub fn step_number(self) -> usize {
        self as usize + 1
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ProbeKind::Reachability => "reachability",
            ProbeKind::Latency => "latency",
            ProbeKind::Redirects => "redirects",
            ProbeKind::Tls => "tls",
            ProbeKind::Dns => "dns",
            ProbeKind::Ping => "ping",
            ProbeKind::ContentType => "content_type",
            ProbeKind::Title => "title",
            ProbeKind::ErrorPatterns => "error_patterns",
            ProbeKind::RobotsTxt => "robots_txt",
            ProbeKind::SitemapXml => "sitemap_xml",
            ProbeKind::MetaRefresh => "meta_refresh",
            ProbeKind::WordPress => "wordpress",
            ProbeKind::Version => "version",
            ProbeKind::Performance => "performance",
            ProbeKind::Screenshot => "screenshot",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome class of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeStatus {
    Ok,
    Failed,
    Skipped,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeStatus::Ok => "ok",
            ProbeStatus::Failed => "failed",
            ProbeStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Result of one probe: a payload on success, an error on failure, a reason
/// when the probe had nothing to inspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult<T> {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProbeError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl<T> ProbeResult<T> {
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self {
            status: ProbeStatus::Ok,
            value: Some(value),
            error: None,
            skip_reason: None,
        }
    }

    #[must_use]
    pub fn failed(error: ProbeError) -> Self {
        Self {
            status: ProbeStatus::Failed,
            value: None,
            error: Some(error),
            skip_reason: None,
        }
    }

    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Skipped,
            value: None,
            error: None,
            skip_reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }

    /// The payload, only for `Ok` results.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Error text or skip reason, whichever applies.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match (&self.error, &self.skip_reason) {
            (Some(e), _) => Some(e.to_string()),
            (None, Some(reason)) => Some(reason.clone()),
            (None, None) => None,
        }
    }
}

impl<T> From<Result<T, ProbeError>> for ProbeResult<T> {
    fn from(result: Result<T, ProbeError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::failed(e),
        }
    }
}

/// The fallback methods of the reachability probe, in the order tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReachabilityMethod {
    Get,
    BrowserGet,
    TrailingSlashGet,
    Head,
    TcpConnect,
}

impl ReachabilityMethod {
    pub const ALL: [ReachabilityMethod; 5] = [
        ReachabilityMethod::Get,
        ReachabilityMethod::BrowserGet,
        ReachabilityMethod::TrailingSlashGet,
        ReachabilityMethod::Head,
        ReachabilityMethod::TcpConnect,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityAttempt {
    pub method: ReachabilityMethod,
    pub status_code: Option<u16>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reachability {
    pub method: ReachabilityMethod,
    pub url: String,
    pub status_code: Option<u16>,
    pub elapsed_ms: u64,
    pub failed_attempts: Vec<ReachabilityAttempt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latency {
    pub elapsed_ms: u64,
    pub method: ReachabilityMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectChain {
    pub final_url: String,
    /// Every URL requested, starting with the site URL
    pub chain: Vec<String>,
    pub hops: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsCertificate {
    pub subject: String,
    pub issuer: String,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecords {
    pub host: String,
    pub addresses: Vec<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingReply {
    pub host: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub mime: String,
    pub is_html: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTitle {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPatternMatches {
    /// Names of the matched error signatures; empty when the page looks healthy
    pub matches: Vec<String>,
}

/// A well-known file at the site origin (`robots.txt`, `sitemap.xml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoFile {
    pub url: String,
    pub status: u16,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRefresh {
    pub present: bool,
    pub delay_seconds: Option<u32>,
    pub target: Option<String>,
}

/// WordPress fingerprint signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPressSignals {
    pub wp_content: bool,
    pub wp_includes: bool,
    pub generator: bool,
    pub generator_version: Option<String>,
    pub wp_json: bool,
    pub wp_admin: bool,
}

impl WordPressSignals {
    /// Number of boolean signals that hold.
    #[must_use]
    pub fn signal_count(&self) -> usize {
        [
            self.wp_content,
            self.wp_includes,
            self.generator,
            self.wp_json,
            self.wp_admin,
        ]
        .into_iter()
        .filter(|s| *s)
        .count()
    }

    /// Two or more independent signals identify a WordPress site.
    #[must_use]
    pub fn is_wordpress(&self) -> bool {
        self.signal_count() >= 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCheck {
    pub sequence: i64,
    pub changed: bool,
    pub total_versions: i64,
    pub content_hash: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub score: u8,
    pub band: Band,
    /// Response-time rating in percent
    pub latency_rating: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub path: PathBuf,
    pub file_url: Option<String>,
}

/// A recorded pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "probe", content = "result")]
pub enum ProbeEntry {
    Reachability(ProbeResult<Reachability>),
    Latency(ProbeResult<Latency>),
    Redirects(ProbeResult<RedirectChain>),
    Tls(ProbeResult<TlsCertificate>),
    Dns(ProbeResult<DnsRecords>),
    Ping(ProbeResult<PingReply>),
    ContentType(ProbeResult<ContentType>),
    Title(ProbeResult<PageTitle>),
    ErrorPatterns(ProbeResult<ErrorPatternMatches>),
    RobotsTxt(ProbeResult<SeoFile>),
    SitemapXml(ProbeResult<SeoFile>),
    MetaRefresh(ProbeResult<MetaRefresh>),
    WordPress(ProbeResult<WordPressSignals>),
    Version(ProbeResult<VersionCheck>),
    Performance(ProbeResult<PerformanceSummary>),
    Screenshot(ProbeResult<Screenshot>),
}

// Applies `$body` to the inner `ProbeResult` of any entry.
macro_rules! with_result {
    ($entry:expr, $r:ident => $body:expr) => {
        match $entry {
            ProbeEntry::Reachability($r) => $body,
            ProbeEntry::Latency($r) => $body,
            ProbeEntry::Redirects($r) => $body,
            ProbeEntry::Tls($r) => $body,
            ProbeEntry::Dns($r) => $body,
            ProbeEntry::Ping($r) => $body,
            ProbeEntry::ContentType($r) => $body,
            ProbeEntry::Title($r) => $body,
            ProbeEntry::ErrorPatterns($r) => $body,
            ProbeEntry::RobotsTxt($r) => $body,
            ProbeEntry::SitemapXml($r) => $body,
            ProbeEntry::MetaRefresh($r) => $body,
            ProbeEntry::WordPress($r) => $body,
            ProbeEntry::Version($r) => $body,
            ProbeEntry::Performance($r) => $body,
            ProbeEntry::Screenshot($r) => $body,
        }
    };
}

impl ProbeEntry {
    #[must_use]
    pub fn kind(&self) -> ProbeKind {
        match self {
            ProbeEntry::Reachability(_) => ProbeKind::Reachability,
            ProbeEntry::Latency(_) => ProbeKind::Latency,
            ProbeEntry::Redirects(_) => ProbeKind::Redirects,
            ProbeEntry::Tls(_) => ProbeKind::Tls,
            ProbeEntry::Dns(_) => ProbeKind::Dns,
            ProbeEntry::Ping(_) => ProbeKind::Ping,
            ProbeEntry::ContentType(_) => ProbeKind::ContentType,
            ProbeEntry::Title(_) => ProbeKind::Title,
            ProbeEntry::ErrorPatterns(_) => ProbeKind::ErrorPatterns,
            ProbeEntry::RobotsTxt(_) => ProbeKind::RobotsTxt,
            ProbeEntry::SitemapXml(_) => ProbeKind::SitemapXml,
            ProbeEntry::MetaRefresh(_) => ProbeKind::MetaRefresh,
            ProbeEntry::WordPress(_) => ProbeKind::WordPress,
            ProbeEntry::Version(_) => ProbeKind::Version,
            ProbeEntry::Performance(_) => ProbeKind::Performance,
            ProbeEntry::Screenshot(_) => ProbeKind::Screenshot,
        }
    }

    #[must_use]
    pub fn status(&self) -> ProbeStatus {
        with_result!(self, r => r.status)
    }

    #[must_use]
    pub fn error(&self) -> Option<&ProbeError> {
        with_result!(self, r => r.error.as_ref())
    }

    #[must_use]
    pub fn message(&self) -> Option<String> {
        with_result!(self, r => r.message())
    }
}

/// Severity band derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Red,
    Yellow,
    Green,
}

impl Band {
    /// `0..=40` is Red, `41..=90` Yellow, `91..=100` Green.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=40 => Band::Red,
            41..=90 => Band::Yellow,
            _ => Band::Green,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Band::Red => "Red",
            Band::Yellow => "Yellow",
            Band::Green => "Green",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The completed audit of one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReport {
    pub site: SiteDescriptor,
    pub entries: BTreeMap<ProbeKind, ProbeEntry>,
    pub score: u8,
    pub band: Band,
    pub version_changed: bool,
    pub screenshot_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SiteReport {
    #[must_use]
    pub fn entry(&self, kind: ProbeKind) -> Option<&ProbeEntry> {
        self.entries.get(&kind)
    }

    #[must_use]
    pub fn status(&self, kind: ProbeKind) -> Option<ProbeStatus> {
        self.entry(kind).map(ProbeEntry::status)
    }

    /// True when every pipeline step has an entry.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        ProbeKind::ALL.iter().all(|k| self.entries.contains_key(k))
    }

    /// Entries with a Failed status, in pipeline order.
    pub fn failures(&self) -> impl Iterator<Item = &ProbeEntry> {
        self.entries
            .values()
            .filter(|e| e.status() == ProbeStatus::Failed)
    }

    #[must_use]
    pub fn reachability(&self) -> Option<&ProbeResult<Reachability>> {
        match self.entry(ProbeKind::Reachability)? {
            ProbeEntry::Reachability(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn redirects(&self) -> Option<&ProbeResult<RedirectChain>> {
        match self.entry(ProbeKind::Redirects)? {
            ProbeEntry::Redirects(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn wordpress(&self) -> Option<&ProbeResult<WordPressSignals>> {
        match self.entry(ProbeKind::WordPress)? {
            ProbeEntry::WordPress(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn version(&self) -> Option<&ProbeResult<VersionCheck>> {
        match self.entry(ProbeKind::Version)? {
            ProbeEntry::Version(r) => Some(r),
            _ => None,
        }
    }

    /// The screenshot path as a `file://` URL.
    #[must_use]
    pub fn screenshot_file_url(&self) -> Option<String> {
        let path = self.screenshot_path.as_deref()?;
        sitewatch_browser::file_url(path).ok()
    }
}

/// Progress notification sent after each recorded step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub domain: Domain,
    pub kind: ProbeKind,
    pub step: usize,
    pub status: ProbeStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_kind_order() {
        assert_eq!(ProbeKind::COUNT, 16);
        assert_eq!(ProbeKind::first().step_number(), 1);
        assert_eq!(ProbeKind::Screenshot.step_number(), 16);
        assert_eq!(ProbeKind::Version.next(), Some(ProbeKind::Performance));
        assert_eq!(ProbeKind::Screenshot.next(), None);

        let mut walked = vec![ProbeKind::first()];
        while let Some(next) = walked.last().and_then(|k| k.next()) {
            walked.push(next);
        }
        assert_eq!(walked, ProbeKind::ALL.to_vec());
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(Band::from_score(0), Band::Red);
        assert_eq!(Band::from_score(40), Band::Red);
        assert_eq!(Band::from_score(41), Band::Yellow);
        assert_eq!(Band::from_score(90), Band::Yellow);
        assert_eq!(Band::from_score(91), Band::Green);
        assert_eq!(Band::from_score(100), Band::Green);
    }

    #[test]
    fn test_probe_result_constructors() {
        let ok = ProbeResult::ok(PageTitle {
            title: "Home".into(),
        });
        assert!(ok.is_ok());
        assert!(ok.message().is_none());

        let failed: ProbeResult<PageTitle> =
            ProbeResult::failed(ProbeError::ParseFailure("no <title> element".into()));
        assert_eq!(failed.status, ProbeStatus::Failed);
        assert_eq!(
            failed.message().as_deref(),
            Some("parse failure: no <title> element")
        );

        let skipped: ProbeResult<PageTitle> = ProbeResult::skipped("site unreachable");
        assert_eq!(skipped.status, ProbeStatus::Skipped);
        assert_eq!(skipped.message().as_deref(), Some("site unreachable"));
    }

    #[test]
    fn test_entry_kind_and_status() {
        let entry = ProbeEntry::RobotsTxt(ProbeResult::failed(ProbeError::NotFound(
            "HTTP 404".into(),
        )));
        assert_eq!(entry.kind(), ProbeKind::RobotsTxt);
        assert_eq!(entry.status(), ProbeStatus::Failed);
        assert!(matches!(entry.error(), Some(ProbeError::NotFound(_))));
    }

    #[test]
    fn test_wordpress_requires_two_signals() {
        let mut signals = WordPressSignals {
            wp_content: true,
            ..WordPressSignals::default()
        };
        assert!(!signals.is_wordpress());

        signals.generator = true;
        assert_eq!(signals.signal_count(), 2);
        assert!(signals.is_wordpress());
    }

    #[test]
    fn test_entry_serialization() {
        let entry = ProbeEntry::Title(ProbeResult::ok(PageTitle {
            title: "Home".into(),
        }));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["probe"], "Title");
        assert_eq!(json["result"]["status"], "Ok");
        assert_eq!(json["result"]["value"]["title"], "Home");
        assert!(json["result"].get("error").is_none());
    }
}
