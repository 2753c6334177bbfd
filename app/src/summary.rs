//! One-line per-site summaries for the terminal.

use sitewatch_scanner::{BatchOutcome, ProbeEntry, ScanError, SiteReport};

/// Summary of a finished batch entry.
#[must_use]
pub fn summary_line(outcome: &BatchOutcome) -> String {
    let domain = outcome.site.domain();
    match &outcome.result {
        Ok(report) => format!(
            "{:<32} {:>3} {:<6} {}",
            domain.as_str(),
            report.score,
            report.band,
            report_detail(report)
        ),
        Err(ScanError::Cancelled {
            completed_steps, ..
        }) => format!(
            "{:<32} {:>3} {:<6} cancelled after {} steps",
            domain.as_str(),
            "-",
            "-",
            completed_steps
        ),
        Err(e) => format!("{:<32} {:>3} {:<6} error: {}", domain.as_str(), "-", "-", e),
    }
}

fn report_detail(report: &SiteReport) -> String {
    let failed: Vec<&str> = report
        .failures()
        .map(|entry: &ProbeEntry| entry.kind().name())
        .collect();

    let mut detail = if failed.is_empty() {
        "all probes passed".to_string()
    } else {
        format!("failed: {}", failed.join(", "))
    };
    if report.version_changed {
        detail.push_str(" [content changed]");
    }
    detail
}

/// Totals over a batch: audited, cancelled, errored.
#[must_use]
pub fn batch_totals(outcomes: &[BatchOutcome]) -> (usize, usize, usize) {
    outcomes
        .iter()
        .fold((0, 0, 0), |(ok, cancelled, errored), o| match &o.result {
            Ok(_) => (ok + 1, cancelled, errored),
            Err(ScanError::Cancelled { .. }) => (ok, cancelled + 1, errored),
            Err(_) => (ok, cancelled, errored + 1),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewatch_core::SiteDescriptor;

    fn cancelled(url: &str, completed_steps: usize) -> BatchOutcome {
        let site = SiteDescriptor::parse(url).unwrap();
        BatchOutcome {
            result: Err(ScanError::Cancelled {
                domain: site.domain().clone(),
                completed_steps,
            }),
            site,
        }
    }

    #[test]
    fn test_cancelled_summary() {
        let line = summary_line(&cancelled("https://example.com", 7));
        assert!(line.starts_with("example.com"));
        assert!(line.ends_with("cancelled after 7 steps"));
    }

    #[test]
    fn test_batch_totals() {
        let outcomes = vec![
            cancelled("https://a.example", 0),
            cancelled("https://b.example", 3),
        ];
        assert_eq!(batch_totals(&outcomes), (0, 2, 0));
        assert_eq!(batch_totals(&[]), (0, 0, 0));
    }
}
