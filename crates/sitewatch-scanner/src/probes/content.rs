//! Probes over the cached homepage body.

use super::{FetchedPage, NO_PAGE};
use crate::error::ProbeError;
use crate::report::{ContentType, ErrorPatternMatches, MetaRefresh, PageTitle, ProbeResult};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Error signatures searched for in the page body, matched case-insensitively.
const ERROR_SIGNATURES: &[(&str, &str)] = &[
    ("database_connection_error", r"error establishing a database connection"),
    (
        "critical_error",
        r"there has been a critical error on (this|your) website",
    ),
    ("php_fatal_error", r"(php )?fatal error:"),
    ("php_parse_error", r"(php )?parse error:"),
    (
        "maintenance_mode",
        r"briefly unavailable for scheduled maintenance",
    ),
    ("not_found_heading", r"<h1[^>]*>\s*(404|not found)"),
    (
        "service_unavailable_heading",
        r"<h1[^>]*>\s*(503|service unavailable)",
    ),
    ("stack_trace", r"stack trace:|traceback \(most recent call last\)"),
];

fn error_signatures() -> &'static [(&'static str, Regex)] {
    static SIGNATURES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    SIGNATURES.get_or_init(|| {
        ERROR_SIGNATURES
            .iter()
            .map(|(name, pattern)| {
                let regex = Regex::new(&format!("(?i){pattern}")).expect("valid signature regex");
                (*name, regex)
            })
            .collect()
    })
}

fn selector(css: &str) -> Result<Selector, ProbeError> {
    Selector::parse(css)
        .map_err(|e| ProbeError::ParseFailure(format!("invalid selector '{css}': {e}")))
}

pub fn check_content_type(page: Option<&FetchedPage>) -> ProbeResult<ContentType> {
    let Some(page) = page else {
        return ProbeResult::skipped(NO_PAGE);
    };

    match page.header("content-type") {
        Some(value) => {
            let mime = value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            ProbeResult::ok(ContentType {
                is_html: mime == "text/html" || mime == "application/xhtml+xml",
                mime,
            })
        }
        None => ProbeResult::failed(ProbeError::ValidationFailure(
            "response has no Content-Type header".to_string(),
        )),
    }
}

pub fn check_title(page: Option<&FetchedPage>) -> ProbeResult<PageTitle> {
    let Some(page) = page else {
        return ProbeResult::skipped(NO_PAGE);
    };

    extract_title(&page.text).into()
}

fn extract_title(html: &str) -> Result<PageTitle, ProbeError> {
    let document = Html::parse_document(html);
    let title_selector = selector("title")?;

    let raw = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| ProbeError::ParseFailure("no <title> element".to_string()))?;

    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return Err(ProbeError::ParseFailure("<title> element is empty".to_string()));
    }

    Ok(PageTitle { title })
}

pub fn check_error_patterns(page: Option<&FetchedPage>) -> ProbeResult<ErrorPatternMatches> {
    let Some(page) = page else {
        return ProbeResult::skipped(NO_PAGE);
    };

    ProbeResult::ok(ErrorPatternMatches {
        matches: scan_error_patterns(&page.text),
    })
}

/// Names of every error signature found in `body`.
#[must_use]
pub fn scan_error_patterns(body: &str) -> Vec<String> {
    error_signatures()
        .iter()
        .filter(|(_, regex)| regex.is_match(body))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

pub fn check_meta_refresh(page: Option<&FetchedPage>) -> ProbeResult<MetaRefresh> {
    let Some(page) = page else {
        return ProbeResult::skipped(NO_PAGE);
    };

    find_meta_refresh(&page.text).into()
}

fn find_meta_refresh(html: &str) -> Result<MetaRefresh, ProbeError> {
    let document = Html::parse_document(html);
    let meta_selector = selector("meta[http-equiv]")?;

    let content = document
        .select(&meta_selector)
        .find(|el| {
            el.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .map(|el| el.value().attr("content").unwrap_or_default().to_string());

    let Some(content) = content else {
        return Ok(MetaRefresh {
            present: false,
            delay_seconds: None,
            target: None,
        });
    };

    let (delay, target) = parse_refresh_content(&content);
    Ok(MetaRefresh {
        present: true,
        delay_seconds: delay,
        target,
    })
}

/// Split `"5; url=https://example.com/"` into delay and target.
fn parse_refresh_content(content: &str) -> (Option<u32>, Option<String>) {
    let mut parts = content.splitn(2, [';', ',']);

    let delay = parts
        .next()
        .map(str::trim)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let secs = d.floor().min(f64::from(u32::MAX)) as u32;
            secs
        });

    let target = parts.next().and_then(|rest| {
        let rest = rest.trim();
        let value = match rest.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("url=") => &rest[4..],
            _ => rest,
        };
        let value = value.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        (!value.is_empty()).then(|| value.to_string())
    });

    (delay, target)
}
