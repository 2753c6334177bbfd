//! Sitewatch batch driver
//!
//! Thin shell around the scanner: reads the links file, wires storage,
//! transport and capture together, runs the batch and reports the results.
//! Audit logic lives in the `crates/` directory.

pub mod links;
pub mod summary;

use anyhow::Context;
use clap::Parser;
use sitewatch_browser::{CaptureEngine, CaptureSettings};
use sitewatch_core::{AppConfig, StorageLayout};
use sitewatch_db::{audits, Database, NewAuditRun};
use sitewatch_scanner::{
    AuditOrchestrator, BatchOutcome, NetTransport, ProbeOptions, SiteReport, SqliteVersionStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command line arguments of the `sitewatch` binary.
#[derive(Debug, Parser)]
#[command(name = "sitewatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Audit the health of a list of web sites", long_about = None)]
pub struct Cli {
    /// File with one site URL per line
    #[arg(default_value = "links.txt")]
    pub links: PathBuf,

    /// Number of sites audited at once (overrides the config file)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Skip the screenshot step
    #[arg(long)]
    pub no_capture: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sitewatch=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load the config named on the command line, or the default one.
///
/// Environment overrides apply either way.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            config.apply_env();
            config.validate()?;
            config
        }
        None => AppConfig::load_with_env().context("failed to load config")?,
    };
    Ok(config)
}

/// Run one batch end to end.
///
/// Reports go to stdout as a JSON array; logs and the per-site summary go to
/// stderr.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting Sitewatch v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let sites = links::read_links(&cli.links)?;
    if sites.is_empty() {
        warn!("no sites in {}", cli.links.display());
        return Ok(());
    }

    let layout = StorageLayout::new(config.storage_root()?)
        .with_database_file(config.storage.database_file.clone());
    layout.ensure_root()?;
    info!("Storage root: {}", layout.root().display());

    let db = Database::new(layout.database_path())
        .await
        .context("failed to open database")?;
    db.run_migrations().await?;

    let transport = NetTransport::new(&config.probes)?;
    let store = SqliteVersionStore::new(db.clone(), layout.clone());
    let concurrency = cli.concurrency.unwrap_or(config.batch.concurrent_sites);

    let mut orchestrator =
        AuditOrchestrator::new(Arc::new(transport), Arc::new(store), layout.clone())
            .with_options(ProbeOptions::from(&config.probes))
            .with_max_concurrent_sites(concurrency);

    let engine = if config.capture.enabled && !cli.no_capture {
        match CaptureEngine::launch(CaptureSettings::from(&config.capture)).await {
            Ok(engine) => Some(Arc::new(engine)),
            Err(e) => {
                warn!("screenshots disabled, browser failed to start: {}", e);
                None
            }
        }
    } else {
        None
    };
    if let Some(engine) = &engine {
        orchestrator = orchestrator.with_capture(engine.clone());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling remaining audits");
            interrupt.cancel();
        }
    });

    info!("Auditing {} sites, {} at a time", sites.len(), concurrency);
    let outcomes = orchestrator.audit_batch(&sites, &cancel).await;
    drop(orchestrator);

    for outcome in &outcomes {
        if let Ok(report) = &outcome.result {
            if let Err(e) = store_audit(&db, report).await {
                warn!("failed to record audit of {}: {}", report.site.domain(), e);
            }
        }
    }

    print_outcomes(&outcomes)?;

    if let Some(engine) = engine {
        match Arc::try_unwrap(engine) {
            Ok(engine) => {
                if let Err(e) = engine.shutdown().await {
                    warn!("browser shutdown failed: {}", e);
                }
            }
            Err(_) => warn!("browser still in use, leaving it to exit with the process"),
        }
    }
    db.close().await;

    Ok(())
}

async fn store_audit(db: &Database, report: &SiteReport) -> anyhow::Result<i64> {
    let id = audits::record_audit(
        db.pool(),
        NewAuditRun {
            domain: report.site.domain().as_str(),
            url: report.site.url_str(),
            score: report.score,
            band: report.band.as_str(),
            version_changed: report.version_changed,
            report: serde_json::to_value(report)?,
            audited_at: report.finished_at,
        },
    )
    .await?;
    Ok(id)
}

fn print_outcomes(outcomes: &[BatchOutcome]) -> anyhow::Result<()> {
    let reports: Vec<&SiteReport> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);

    for outcome in outcomes {
        eprintln!("{}", summary::summary_line(outcome));
    }

    let (audited, cancelled, errored) = summary::batch_totals(outcomes);
    info!(
        "Batch finished: {} audited, {} cancelled, {} failed",
        audited, cancelled, errored
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["sitewatch"]);
        assert_eq!(cli.links, PathBuf::from("links.txt"));
        assert!(cli.concurrency.is_none());
        assert!(!cli.no_capture);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "sitewatch",
            "sites.txt",
            "--concurrency",
            "8",
            "--no-capture",
            "--config",
            "/etc/sitewatch.toml",
        ]);
        assert_eq!(cli.links, PathBuf::from("sites.txt"));
        assert_eq!(cli.concurrency, Some(8));
        assert!(cli.no_capture);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/sitewatch.toml")));
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[batch]\nconcurrent_sites = 2\n").unwrap();

        let cli = Cli::parse_from(["sitewatch", "--config", path.to_str().unwrap()]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.probes.timeout_secs, 10);
        assert!(config.batch.concurrent_sites >= 1);
    }

    #[test]
    fn test_missing_config_file_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("typo.toml");

        let cli = Cli::parse_from(["sitewatch", "--config", path.to_str().unwrap()]);
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[probes]\nmax_redirects = 0\n").unwrap();

        let cli = Cli::parse_from(["sitewatch", "--config", path.to_str().unwrap()]);
        assert!(load_config(&cli).is_err());
    }
}
