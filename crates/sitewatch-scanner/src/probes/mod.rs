//! The probe set.
//!
//! Each probe inspects one aspect of a site and returns a `ProbeResult`.
//! Probes never fail past their own boundary; errors become Failed entries.
//! Network probes go through the [`Transport`](crate::transport::Transport)
//! seam, content probes read the page cached by the reachability probe.

pub mod content;
pub mod network;
pub mod reachability;
pub mod redirects;
pub mod seo;
pub mod wordpress;

use crate::transport::{FetchResponse, Transport};
use sitewatch_core::{ProbeConfig, SiteDescriptor};
use std::collections::HashMap;
use std::time::Duration;

/// Probe behaviour taken from the `[probes]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub browser_user_agent: String,
    pub max_redirects: usize,
    pub ping_enabled: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

impl From<&ProbeConfig> for ProbeOptions {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            browser_user_agent: config.browser_user_agent.clone(),
            max_redirects: config.max_redirects,
            ping_enabled: config.ping_enabled,
        }
    }
}

/// What every network probe needs.
#[derive(Clone, Copy)]
pub struct ProbeContext<'a> {
    pub site: &'a SiteDescriptor,
    pub transport: &'a dyn Transport,
    pub options: &'a ProbeOptions,
}

/// The homepage fetched by the reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Bytes exactly as served; versions are hashed and stored from these
    pub body: Vec<u8>,
    /// Lossy UTF-8 decoding of `body` for the markup parsers
    pub text: String,
    pub elapsed: Duration,
}

impl FetchedPage {
    #[must_use]
    pub fn from_response(response: FetchResponse, elapsed: Duration) -> Self {
        let text = response.body_text();
        Self {
            url: response.url,
            status: response.status,
            headers: response.headers,
            body: response.body,
            text,
            elapsed,
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

pub(crate) const NO_PAGE: &str = "no page content: site unreachable by any GET method";

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
