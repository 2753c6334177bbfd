//! Site pipeline orchestrator.
//!
//! This module provides the `AuditOrchestrator`, which runs the 16 pipeline
//! steps of one site strictly in order and runs many sites with bounded
//! concurrency.

use crate::error::{ProbeError, Result, ScanError};
use crate::probes::content::{
    check_content_type, check_error_patterns, check_meta_refresh, check_title,
};
use crate::probes::network::{check_dns, check_ping, check_tls};
use crate::probes::reachability::{check_latency, check_reachability};
use crate::probes::redirects::check_redirects;
use crate::probes::seo::{check_robots_txt, check_sitemap_xml};
use crate::probes::wordpress::check_wordpress;
use crate::probes::{FetchedPage, ProbeContext, ProbeOptions, NO_PAGE};
use crate::report::{
    Band, PerformanceSummary, PipelineEvent, ProbeEntry, ProbeKind, ProbeResult, ProbeStatus,
    Reachability, Screenshot, SiteReport, VersionCheck,
};
use crate::scoring;
use crate::transport::Transport;
use crate::versioning::VersionStore;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use sitewatch_browser::PageCapture;
use sitewatch_core::{SiteDescriptor, StorageLayout};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Default number of site pipelines run at once.
pub const DEFAULT_CONCURRENT_SITES: usize = 4;

/// Result of one site in a batch, in input order.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The site as given
    pub site: SiteDescriptor,
    /// The report, or why there is none
    pub result: Result<SiteReport>,
}

/// State accumulated while one pipeline runs.
struct PipelineRun<'a> {
    site: &'a SiteDescriptor,
    entries: BTreeMap<ProbeKind, ProbeEntry>,
    page: Option<FetchedPage>,
    reachability: Option<ProbeResult<Reachability>>,
    score: u8,
    version_changed: bool,
    screenshot_path: Option<PathBuf>,
}

impl<'a> PipelineRun<'a> {
    fn new(site: &'a SiteDescriptor) -> Self {
        Self {
            site,
            entries: BTreeMap::new(),
            page: None,
            reachability: None,
            score: 0,
            version_changed: false,
            screenshot_path: None,
        }
    }
}

/// Runs site pipelines.
pub struct AuditOrchestrator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn VersionStore>,
    layout: StorageLayout,
    capture: Option<Arc<dyn PageCapture>>,
    options: ProbeOptions,
    max_concurrent_sites: usize,
    progress: Option<UnboundedSender<PipelineEvent>>,
}

impl AuditOrchestrator {
    /// Create an orchestrator without a capture adapter.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn VersionStore>,
        layout: StorageLayout,
    ) -> Self {
        Self {
            transport,
            store,
            layout,
            capture: None,
            options: ProbeOptions::default(),
            max_concurrent_sites: DEFAULT_CONCURRENT_SITES,
            progress: None,
        }
    }

    /// Take screenshots with `capture` as the last step.
    #[must_use]
    pub fn with_capture(mut self, capture: Arc<dyn PageCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Override probe options.
    #[must_use]
    pub fn with_options(mut self, options: ProbeOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the maximum number of concurrent site pipelines.
    #[must_use]
    pub fn with_max_concurrent_sites(mut self, max: usize) -> Self {
        self.max_concurrent_sites = max.max(1);
        self
    }

    /// Send a [`PipelineEvent`] after every recorded step.
    #[must_use]
    pub fn with_progress(mut self, progress: UnboundedSender<PipelineEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Audit one site.
    ///
    /// Always returns a report with one entry per [`ProbeKind`] unless the
    /// token is cancelled, in which case the partial run is discarded. The
    /// token is checked between steps; a step already running finishes.
    pub async fn audit_site(
        &self,
        site: &SiteDescriptor,
        cancel: &CancellationToken,
    ) -> Result<SiteReport> {
        let started_at = Utc::now();
        let mut run = PipelineRun::new(site);
        let mut step = Some(ProbeKind::first());

        while let Some(kind) = step {
            if cancel.is_cancelled() {
                tracing::info!("audit of {} cancelled before {}", site.domain(), kind);
                return Err(ScanError::Cancelled {
                    domain: site.domain().clone(),
                    completed_steps: run.entries.len(),
                });
            }
            let entry = self.run_step(kind, &mut run).await;

            tracing::debug!(
                "{} step {}/{} {}: {}{}",
                site.domain(),
                kind.step_number(),
                ProbeKind::COUNT,
                kind,
                entry.status(),
                entry
                    .message()
                    .map(|m| format!(" ({m})"))
                    .unwrap_or_default()
            );
            self.emit(site, kind, entry.status());
            run.entries.insert(kind, entry);
            step = kind.next();
        }

        let report = SiteReport {
            site: site.clone(),
            score: run.score,
            band: Band::from_score(run.score),
            version_changed: run.version_changed,
            screenshot_path: run.screenshot_path,
            entries: run.entries,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "{} audited: score {} ({}), version changed: {}",
            site.domain(),
            report.score,
            report.band,
            report.version_changed
        );

        Ok(report)
    }

    /// Audit many sites with bounded concurrency, preserving input order.
    pub async fn audit_batch(
        &self,
        sites: &[SiteDescriptor],
        cancel: &CancellationToken,
    ) -> Vec<BatchOutcome> {
        let mut futures = FuturesUnordered::new();
        let mut results: Vec<Option<Result<SiteReport>>> = sites.iter().map(|_| None).collect();

        for (index, site) in sites.iter().enumerate() {
            futures.push(async move { (index, self.audit_site(site, cancel).await) });

            // Respect concurrency limit
            while futures.len() >= self.max_concurrent_sites {
                if let Some((index, result)) = futures.next().await {
                    results[index] = Some(result);
                }
            }
        }

        // Collect remaining results
        while let Some((index, result)) = futures.next().await {
            results[index] = Some(result);
        }

        sites
            .iter()
            .zip(results)
            .map(|(site, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(ScanError::Cancelled {
                        domain: site.domain().clone(),
                        completed_steps: 0,
                    })
                });
                match &result {
                    Err(ScanError::Cancelled { .. }) | Ok(_) => {}
                    Err(e) => tracing::error!("audit of {} failed: {}", site.domain(), e),
                }
                BatchOutcome {
                    site: site.clone(),
                    result,
                }
            })
            .collect()
    }

    fn emit(&self, site: &SiteDescriptor, kind: ProbeKind, status: ProbeStatus) {
        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching.
            let _ = progress.send(PipelineEvent {
                domain: site.domain().clone(),
                kind,
                step: kind.step_number(),
                status,
            });
        }
    }

    async fn run_step(&self, kind: ProbeKind, run: &mut PipelineRun<'_>) -> ProbeEntry {
        let ctx = ProbeContext {
            site: run.site,
            transport: self.transport.as_ref(),
            options: &self.options,
        };
        let page = run.page.as_ref();

        match kind {
            ProbeKind::Reachability => {
                let outcome = check_reachability(ctx).await;
                run.page = outcome.page;
                run.reachability = Some(outcome.result.clone());
                ProbeEntry::Reachability(outcome.result)
            }
            ProbeKind::Latency => ProbeEntry::Latency(match &run.reachability {
                Some(reachability) => check_latency(reachability),
                None => ProbeResult::skipped("reachability was not checked"),
            }),
            ProbeKind::Redirects => ProbeEntry::Redirects(check_redirects(ctx).await),
            ProbeKind::Tls => ProbeEntry::Tls(check_tls(ctx).await),
            ProbeKind::Dns => ProbeEntry::Dns(check_dns(ctx).await),
            ProbeKind::Ping => ProbeEntry::Ping(check_ping(ctx).await),
            ProbeKind::ContentType => ProbeEntry::ContentType(check_content_type(page)),
            ProbeKind::Title => ProbeEntry::Title(check_title(page)),
            ProbeKind::ErrorPatterns => ProbeEntry::ErrorPatterns(check_error_patterns(page)),
            ProbeKind::RobotsTxt => ProbeEntry::RobotsTxt(check_robots_txt(ctx).await),
            ProbeKind::SitemapXml => ProbeEntry::SitemapXml(check_sitemap_xml(ctx).await),
            ProbeKind::MetaRefresh => ProbeEntry::MetaRefresh(check_meta_refresh(page)),
            ProbeKind::WordPress => ProbeEntry::WordPress(check_wordpress(ctx, page).await),
            ProbeKind::Version => {
                let result = self.check_version(run).await;
                run.version_changed = result.value().is_some_and(|v| v.changed);
                ProbeEntry::Version(result)
            }
            ProbeKind::Performance => {
                let result = Self::check_performance(run);
                run.score = result.value().map_or(0, |p| p.score);
                ProbeEntry::Performance(result)
            }
            ProbeKind::Screenshot => {
                let result = self.check_screenshot(run.site).await;
                run.screenshot_path = result.value().map(|s| s.path.clone());
                ProbeEntry::Screenshot(result)
            }
        }
    }

    async fn check_version(&self, run: &PipelineRun<'_>) -> ProbeResult<VersionCheck> {
        let Some(page) = run.page.as_ref() else {
            return ProbeResult::skipped(NO_PAGE);
        };

        let domain = run.site.domain();
        match self.store.record_if_changed(domain, &page.body).await {
            Ok(outcome) => ProbeResult::ok(VersionCheck {
                sequence: outcome.record.sequence,
                changed: outcome.changed,
                total_versions: outcome.total_versions,
                content_hash: outcome.record.content_hash,
                file_name: outcome.record.file_name,
            }),
            Err(e) => {
                tracing::warn!("version store failed for {}: {}", domain, e);
                ProbeResult::failed(ProbeError::StorageFailure(e.to_string()))
            }
        }
    }

    // Scores everything recorded so far; the screenshot step has not run yet.
    fn check_performance(run: &PipelineRun<'_>) -> ProbeResult<PerformanceSummary> {
        let (score, band) = scoring::evaluate(&run.entries);
        let elapsed_ms = run
            .reachability
            .as_ref()
            .and_then(ProbeResult::value)
            .map(|r| r.elapsed_ms);

        ProbeResult::ok(PerformanceSummary {
            score,
            band,
            latency_rating: scoring::latency_rating(elapsed_ms),
        })
    }

    async fn check_screenshot(&self, site: &SiteDescriptor) -> ProbeResult<Screenshot> {
        let Some(capture) = &self.capture else {
            return ProbeResult::skipped("screenshot capture disabled");
        };

        let output = self.layout.screenshot_path(site.domain());
        match capture.capture(site.url_str(), &output).await {
            Ok(path) => ProbeResult::ok(Screenshot {
                file_url: sitewatch_browser::file_url(&path).ok(),
                path,
            }),
            Err(e) => {
                tracing::warn!("screenshot of {} failed: {}", site.domain(), e);
                ProbeResult::failed(ProbeError::CaptureFailure(e.to_string()))
            }
        }
    }
}
