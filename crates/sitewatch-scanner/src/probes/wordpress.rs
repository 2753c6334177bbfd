use super::{FetchedPage, ProbeContext, NO_PAGE};
use crate::report::{ProbeResult, WordPressSignals};
use crate::transport::FetchRequest;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

fn generator_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)wordpress\s+([0-9]+(?:\.[0-9]+)*)").expect("valid regex"))
}

/// Collect WordPress fingerprint signals for the site.
///
/// Body signals come from the cached page; `wp-json` and `wp-admin` are
/// fetched. Endpoint errors count as an absent signal, so the probe is only
/// ever Ok or Skipped.
pub async fn check_wordpress(
    ctx: ProbeContext<'_>,
    page: Option<&FetchedPage>,
) -> ProbeResult<WordPressSignals> {
    let Some(page) = page else {
        return ProbeResult::skipped(NO_PAGE);
    };

    let mut signals = body_signals(&page.text);
    let base = ctx.site.base_url();

    signals.wp_json = match ctx
        .transport
        .fetch(&FetchRequest::get(format!("{base}/wp-json/")))
        .await
    {
        Ok(response) => response.status == 200,
        Err(e) => {
            tracing::debug!("wp-json check for {} failed: {}", ctx.site.domain(), e);
            false
        }
    };

    signals.wp_admin = match ctx
        .transport
        .fetch(&FetchRequest::get(format!("{base}/wp-admin/")))
        .await
    {
        Ok(response) if response.status == 200 => {
            response.body_text().to_ascii_lowercase().contains("login")
        }
        Ok(response) if response.is_redirect() => response
            .location()
            .is_some_and(|l| l.to_ascii_lowercase().contains("wp-login")),
        Ok(_) => false,
        Err(e) => {
            tracing::debug!("wp-admin check for {} failed: {}", ctx.site.domain(), e);
            false
        }
    };

    ProbeResult::ok(signals)
}

/// Signals visible in the homepage markup alone.
#[must_use]
pub fn body_signals(html: &str) -> WordPressSignals {
    let lower = html.to_ascii_lowercase();
    let generator = generator_content(html).filter(|c| c.to_ascii_lowercase().contains("wordpress"));

    WordPressSignals {
        wp_content: lower.contains("wp-content"),
        wp_includes: lower.contains("wp-includes"),
        generator_version: generator
            .as_deref()
            .and_then(|c| generator_version_regex().captures(c))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
        generator: generator.is_some(),
        wp_json: false,
        wp_admin: false,
    }
}

fn generator_content(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let meta = Selector::parse("meta[name]").ok()?;

    document
        .select(&meta)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("generator"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}
