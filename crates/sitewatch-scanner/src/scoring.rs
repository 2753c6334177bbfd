//! Composite score and severity band.
//!
//! Each weighted probe contributes `weight * signal`, where the signal is in
//! `0.0..=1.0`. Failed probes give 0, Skipped probes 0.5. Probes not listed in
//! [`WEIGHTS`] (WordPress, Version, Performance, Screenshot) carry no weight.

use crate::report::{Band, ProbeEntry, ProbeKind, ProbeResult, ProbeStatus};
use std::collections::BTreeMap;

/// Declared probe weights. They sum to 100.
pub const WEIGHTS: [(ProbeKind, u32); 12] = [
    (ProbeKind::Reachability, 30),
    (ProbeKind::Latency, 10),
    (ProbeKind::Redirects, 10),
    (ProbeKind::Tls, 10),
    (ProbeKind::Dns, 5),
    (ProbeKind::Ping, 5),
    (ProbeKind::ContentType, 5),
    (ProbeKind::Title, 5),
    (ProbeKind::ErrorPatterns, 5),
    (ProbeKind::RobotsTxt, 5),
    (ProbeKind::SitemapXml, 5),
    (ProbeKind::MetaRefresh, 5),
];

const SKIPPED_SIGNAL: f64 = 0.5;

/// Latency at or below which the full latency weight is earned, in ms.
pub const FAST_RESPONSE_MS: u64 = 500;
/// Latency at or above which no latency weight is earned, in ms.
pub const SLOW_RESPONSE_MS: u64 = 3000;

/// Weight of a probe kind; zero for unweighted steps.
#[must_use]
pub fn weight(kind: ProbeKind) -> u32 {
    WEIGHTS
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(0, |(_, w)| *w)
}

/// Signal in `0.0..=1.0` contributed by one entry.
#[must_use]
pub fn signal(entry: &ProbeEntry) -> f64 {
    match entry.status() {
        ProbeStatus::Failed => return 0.0,
        ProbeStatus::Skipped => return SKIPPED_SIGNAL,
        ProbeStatus::Ok => {}
    }

    match entry {
        ProbeEntry::Latency(r) => graded(r, |l| latency_signal(l.elapsed_ms)),
        ProbeEntry::Redirects(r) => graded(r, |c| match c.hops {
            0 => 1.0,
            1..=2 => 0.5,
            _ => 0.0,
        }),
        ProbeEntry::ContentType(r) => graded(r, |c| if c.is_html { 1.0 } else { 0.0 }),
        ProbeEntry::ErrorPatterns(r) => {
            graded(r, |m| if m.matches.is_empty() { 1.0 } else { 0.0 })
        }
        ProbeEntry::MetaRefresh(r) => graded(r, |m| if m.present { 0.0 } else { 1.0 }),
        _ => 1.0,
    }
}

fn graded<T>(result: &ProbeResult<T>, grade: impl Fn(&T) -> f64) -> f64 {
    result.value().map_or(0.0, grade)
}

/// Linear from 1.0 at [`FAST_RESPONSE_MS`] down to 0.0 at [`SLOW_RESPONSE_MS`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn latency_signal(elapsed_ms: u64) -> f64 {
    if elapsed_ms <= FAST_RESPONSE_MS {
        1.0
    } else if elapsed_ms >= SLOW_RESPONSE_MS {
        0.0
    } else {
        (SLOW_RESPONSE_MS - elapsed_ms) as f64 / (SLOW_RESPONSE_MS - FAST_RESPONSE_MS) as f64
    }
}

/// Weighted score over the recorded entries, rounded and clamped to 0-100.
///
/// A weighted probe with no entry counts as Skipped.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn composite_score(entries: &BTreeMap<ProbeKind, ProbeEntry>) -> u8 {
    let total: f64 = WEIGHTS
        .iter()
        .map(|(kind, w)| f64::from(*w) * entries.get(kind).map_or(SKIPPED_SIGNAL, signal))
        .sum();

    total.round().clamp(0.0, 100.0) as u8
}

/// Score and band together.
#[must_use]
pub fn evaluate(entries: &BTreeMap<ProbeKind, ProbeEntry>) -> (u8, Band) {
    let score = composite_score(entries);
    (score, Band::from_score(score))
}

/// Response-time rating in percent, reported by the performance step.
#[must_use]
pub fn latency_rating(elapsed_ms: Option<u64>) -> u8 {
    match elapsed_ms {
        None => 0,
        Some(ms) if ms < 500 => 100,
        Some(ms) if ms < 1000 => 90,
        Some(ms) if ms < 1500 => 80,
        Some(ms) if ms < 2000 => 70,
        Some(ms) if ms < 2500 => 60,
        Some(_) => 50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::report::{
        ContentType, ErrorPatternMatches, Latency, MetaRefresh, PageTitle, ReachabilityMethod,
        RedirectChain, Screenshot,
    };

    fn entries(list: Vec<ProbeEntry>) -> BTreeMap<ProbeKind, ProbeEntry> {
        list.into_iter().map(|e| (e.kind(), e)).collect()
    }

    #[test]
    fn test_weights_sum_to_100() {
        let total: u32 = WEIGHTS.iter().map(|(_, w)| w).sum();
        assert_eq!(total, 100);
        assert_eq!(weight(ProbeKind::Screenshot), 0);
        assert_eq!(weight(ProbeKind::WordPress), 0);
        assert_eq!(weight(ProbeKind::Reachability), 30);
    }

    #[test]
    fn test_latency_signal_is_linear() {
        assert!((latency_signal(0) - 1.0).abs() < f64::EPSILON);
        assert!((latency_signal(500) - 1.0).abs() < f64::EPSILON);
        assert!((latency_signal(1750) - 0.5).abs() < f64::EPSILON);
        assert!(latency_signal(3000).abs() < f64::EPSILON);
        assert!(latency_signal(60_000).abs() < f64::EPSILON);
    }

    #[test]
    fn test_all_skipped_scores_half() {
        assert_eq!(composite_score(&BTreeMap::new()), 50);
    }

    #[test]
    fn test_graded_signals() {
        let redirect = |hops| {
            ProbeEntry::Redirects(ProbeResult::ok(RedirectChain {
                final_url: String::new(),
                chain: Vec::new(),
                hops,
            }))
        };
        assert!((signal(&redirect(0)) - 1.0).abs() < f64::EPSILON);
        assert!((signal(&redirect(2)) - 0.5).abs() < f64::EPSILON);
        assert!(signal(&redirect(3)).abs() < f64::EPSILON);

        let json = ProbeEntry::ContentType(ProbeResult::ok(ContentType {
            mime: "application/json".into(),
            is_html: false,
        }));
        assert!(signal(&json).abs() < f64::EPSILON);

        let errors = ProbeEntry::ErrorPatterns(ProbeResult::ok(ErrorPatternMatches {
            matches: vec!["php_fatal_error".into()],
        }));
        assert!(signal(&errors).abs() < f64::EPSILON);

        let refresh = ProbeEntry::MetaRefresh(ProbeResult::ok(MetaRefresh {
            present: true,
            delay_seconds: Some(0),
            target: None,
        }));
        assert!(signal(&refresh).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_and_skipped_signals() {
        let failed = ProbeEntry::Title(ProbeResult::<PageTitle>::failed(ProbeError::ParseFailure(
            "no <title> element".into(),
        )));
        let skipped = ProbeEntry::Title(ProbeResult::<PageTitle>::skipped("no page"));
        assert!(signal(&failed).abs() < f64::EPSILON);
        assert!((signal(&skipped) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screenshot_does_not_affect_score() {
        let base = vec![ProbeEntry::Latency(ProbeResult::ok(Latency {
            elapsed_ms: 100,
            method: ReachabilityMethod::Get,
        }))];

        let mut with_failed = base.clone();
        with_failed.push(ProbeEntry::Screenshot(ProbeResult::<Screenshot>::failed(
            ProbeError::CaptureFailure("browser crashed".into()),
        )));
        let mut with_ok = base;
        with_ok.push(ProbeEntry::Screenshot(ProbeResult::ok(Screenshot {
            path: "/tmp/homepage.png".into(),
            file_url: None,
        })));

        assert_eq!(
            composite_score(&entries(with_failed)),
            composite_score(&entries(with_ok))
        );
    }

    #[test]
    fn test_score_is_deterministic() {
        let list = vec![
            ProbeEntry::Latency(ProbeResult::ok(Latency {
                elapsed_ms: 1234,
                method: ReachabilityMethod::Head,
            })),
            ProbeEntry::Title(ProbeResult::<PageTitle>::skipped("no page")),
        ];
        let first = evaluate(&entries(list.clone()));
        let second = evaluate(&entries(list));
        assert_eq!(first, second);
    }

    #[test]
    fn test_band_mapping_at_boundaries() {
        for (score, band) in [
            (40, Band::Red),
            (41, Band::Yellow),
            (90, Band::Yellow),
            (91, Band::Green),
        ] {
            assert_eq!(Band::from_score(score), band, "score {score}");
        }
    }

    #[test]
    fn test_latency_rating() {
        assert_eq!(latency_rating(None), 0);
        assert_eq!(latency_rating(Some(120)), 100);
        assert_eq!(latency_rating(Some(500)), 90);
        assert_eq!(latency_rating(Some(1499)), 80);
        assert_eq!(latency_rating(Some(1500)), 70);
        assert_eq!(latency_rating(Some(2400)), 60);
        assert_eq!(latency_rating(Some(9000)), 50);
    }
}
