//! Shared types used across the sitewatch workspace.
//!
//! `SiteDescriptor` is the single input of a pipeline run. It is built once
//! from an absolute URL and handed by reference to every probe.

use crate::error::SitewatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Newtype for the storage/lineage key of a site.
///
/// A domain is the URL host, lower-cased, without a leading `www.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Domain(String);

impl Domain {
    /// Create a `Domain` from a host name.
    ///
    /// # Errors
    /// Returns error if the host is empty or contains path separators.
    pub fn new(host: impl Into<String>) -> Result<Self, SitewatchError> {
        let host = host.into().trim().to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

        if host.is_empty() {
            return Err(SitewatchError::Validation(
                "invalid domain: host is empty".to_string(),
            ));
        }

        if host.contains(['/', '\\']) || host.starts_with('.') {
            return Err(SitewatchError::Validation(format!(
                "invalid domain: '{host}' is not a host name"
            )));
        }

        Ok(Self(host))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A site to audit: the absolute URL plus the domain derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    url: Url,
    domain: Domain,
}

impl SiteDescriptor {
    /// Parse a site descriptor from an absolute `http` or `https` URL.
    ///
    /// # Errors
    /// Returns `SitewatchError::Validation` for relative URLs, other schemes
    /// or URLs without a host.
    pub fn parse(raw: &str) -> Result<Self, SitewatchError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| SitewatchError::Validation(format!("invalid site URL '{raw}': {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SitewatchError::Validation(format!(
                "unsupported scheme '{}' in '{raw}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| SitewatchError::Validation(format!("no host in URL '{raw}'")))?;
        let domain = Domain::new(host)?;

        Ok(Self { url, domain })
    }

    /// The URL as given (normalised by the URL parser).
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL as a string slice.
    #[must_use]
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// The lineage key for this site.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The raw host, including any `www.` prefix.
    #[must_use]
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_else(|| self.domain.as_str())
    }

    /// Whether the site is served over HTTPS.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Explicit or default port for the URL scheme.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.url
            .port_or_known_default()
            .unwrap_or(if self.is_https() { 443 } else { 80 })
    }

    /// `scheme://host[:port]` without a trailing slash.
    #[must_use]
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// The URL with any trailing slash removed, for building sub-paths.
    #[must_use]
    pub fn base_url(&self) -> String {
        let mut base = self.url.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.as_str().trim_end_matches('/').to_string()
    }
}

impl fmt::Display for SiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_strips_www() {
        let domain = Domain::new("WWW.Example.com").expect("valid domain");
        assert_eq!(domain.as_str(), "example.com");
    }

    #[test]
    fn test_domain_invalid() {
        for host in ["", "  ", "www.", "a/b", ".example.com"] {
            assert!(Domain::new(host).is_err(), "should fail for: {host:?}");
        }
    }

    #[test]
    fn test_site_descriptor_parse() {
        let site = SiteDescriptor::parse("https://www.example.com/blog/").expect("valid site");
        assert_eq!(site.domain().as_str(), "example.com");
        assert_eq!(site.host(), "www.example.com");
        assert!(site.is_https());
        assert_eq!(site.port(), 443);
        assert_eq!(site.origin(), "https://www.example.com");
        assert_eq!(site.base_url(), "https://www.example.com/blog");
    }

    #[test]
    fn test_site_descriptor_explicit_port() {
        let site = SiteDescriptor::parse("http://localhost:8080").expect("valid site");
        assert!(!site.is_https());
        assert_eq!(site.port(), 8080);
        assert_eq!(site.origin(), "http://localhost:8080");
        assert_eq!(site.domain().as_str(), "localhost");
    }

    #[test]
    fn test_site_descriptor_rejects_relative_and_other_schemes() {
        assert!(SiteDescriptor::parse("example.com").is_err());
        assert!(SiteDescriptor::parse("/path/only").is_err());
        assert!(SiteDescriptor::parse("ftp://example.com").is_err());
        assert!(SiteDescriptor::parse("file:///tmp/index.html").is_err());
    }

    #[test]
    fn test_site_descriptor_serialization() {
        let site = SiteDescriptor::parse("https://example.com").expect("valid site");
        let json = serde_json::to_string(&site).expect("serialize site");
        assert!(json.contains("\"domain\":\"example.com\""));

        let back: SiteDescriptor = serde_json::from_str(&json).expect("deserialize site");
        assert_eq!(back, site);
    }
}
