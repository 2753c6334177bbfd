//! Network seam for the probes.
//!
//! Every byte a probe sends goes through [`Transport`]. The production
//! implementation is [`NetTransport`]; tests script an in-memory one.

use crate::error::{ProbeError, ScanError};
use chrono::{DateTime, Utc};
use sitewatch_core::ProbeConfig;
use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use x509_parser::prelude::{FromDer, X509Certificate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
}

/// A single HTTP request. Redirects are never followed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub user_agent: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            user_agent: None,
        }
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Head,
            url: url.into(),
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Same request against another URL.
    #[must_use]
    pub fn retarget(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    /// Header names are lower-case
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

impl FetchResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.status != 304
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Leaf certificate details from a TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, ProbeError>;

    /// Open and close a TCP connection, returning the connect time.
    async fn connect(&self, host: &str, port: u16) -> Result<Duration, ProbeError>;

    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ProbeError>;

    /// Send one ICMP echo request, returning the round trip time.
    async fn ping(&self, host: &str) -> Result<Duration, ProbeError>;

    /// Complete a verified TLS handshake and return the leaf certificate.
    async fn peer_certificate(&self, host: &str, port: u16)
        -> Result<CertificateInfo, ProbeError>;
}

/// Real network transport.
pub struct NetTransport {
    client: reqwest::Client,
    tls: TlsConnector,
    timeout: Duration,
}

impl NetTransport {
    /// Build the HTTP client and TLS verifier from probe settings.
    pub fn new(config: &ProbeConfig) -> Result<Self, ScanError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
        let tls_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ScanError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            client,
            tls: TlsConnector::from(Arc::new(tls_config)),
            timeout,
        })
    }

    async fn tcp(&self, host: &str, port: u16) -> Result<TcpStream, ProbeError> {
        tokio::time::timeout(self.timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                ProbeError::NetworkFailure(format!(
                    "connect to {host}:{port} timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ProbeError::NetworkFailure(format!("connect to {host}:{port}: {e}")))
    }
}

#[async_trait::async_trait]
impl Transport for NetTransport {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, ProbeError> {
        let start = Instant::now();

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Head => self.client.head(&request.url),
        };
        if let Some(user_agent) = &request.user_agent {
            builder = builder.header(reqwest::header::USER_AGENT, user_agent);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                ProbeError::ValidationFailure(format!("{}: {e}", request.url))
            } else {
                ProbeError::NetworkFailure(format!("{}: {e}", request.url))
            }
        })?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = match request.method {
            HttpMethod::Head => Vec::new(),
            HttpMethod::Get => response
                .bytes()
                .await
                .map_err(|e| ProbeError::NetworkFailure(format!("{}: {e}", request.url)))?
                .to_vec(),
        };

        Ok(FetchResponse {
            url,
            status,
            headers,
            body,
            elapsed: start.elapsed(),
        })
    }

    async fn connect(&self, host: &str, port: u16) -> Result<Duration, ProbeError> {
        let start = Instant::now();
        let _stream = self.tcp(host, port).await?;
        Ok(start.elapsed())
    }

    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ProbeError> {
        let addrs = tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, 0)))
            .await
            .map_err(|_| ProbeError::NetworkFailure(format!("lookup of {host} timed out")))?
            .map_err(|e| ProbeError::NetworkFailure(format!("lookup of {host}: {e}")))?;

        let mut addresses: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !addresses.contains(&addr.ip()) {
                addresses.push(addr.ip());
            }
        }
        Ok(addresses)
    }

    async fn ping(&self, host: &str) -> Result<Duration, ProbeError> {
        let mut command = tokio::process::Command::new("ping");
        if cfg!(windows) {
            let wait_ms = self.timeout.as_millis().to_string();
            command.args(["-n", "1", "-w", wait_ms.as_str(), host]);
        } else {
            let wait_secs = self.timeout.as_secs().max(1).to_string();
            command.args(["-c", "1", "-W", wait_secs.as_str(), host]);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let start = Instant::now();
        let status = tokio::time::timeout(self.timeout + Duration::from_secs(1), command.status())
            .await
            .map_err(|_| ProbeError::NetworkFailure(format!("ping to {host} timed out")))?
            .map_err(|e| ProbeError::NetworkFailure(format!("cannot run ping: {e}")))?;

        if status.success() {
            Ok(start.elapsed())
        } else {
            Err(ProbeError::NetworkFailure(format!(
                "no echo reply from {host} ({status})"
            )))
        }
    }

    async fn peer_certificate(
        &self,
        host: &str,
        port: u16,
    ) -> Result<CertificateInfo, ProbeError> {
        let server_name = ServerName::try_from(host.to_string()).map_err(|e| {
            ProbeError::ValidationFailure(format!("invalid server name {host}: {e}"))
        })?;

        let tcp = self.tcp(host, port).await?;
        let stream = tokio::time::timeout(self.timeout, self.tls.connect(server_name, tcp))
            .await
            .map_err(|_| ProbeError::NetworkFailure(format!("TLS handshake with {host} timed out")))?
            .map_err(|e| handshake_error(host, &e))?;

        let (_, session) = stream.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|chain| chain.first())
            .ok_or_else(|| {
                ProbeError::ValidationFailure(format!("{host} presented no certificate"))
            })?;

        parse_certificate(leaf.as_ref())
    }
}

// rustls reports verification failures as InvalidData.
fn handshake_error(host: &str, e: &io::Error) -> ProbeError {
    if e.kind() == io::ErrorKind::InvalidData {
        ProbeError::ValidationFailure(format!("TLS handshake with {host}: {e}"))
    } else {
        ProbeError::NetworkFailure(format!("TLS handshake with {host}: {e}"))
    }
}

/// Extract subject, issuer and validity from a DER certificate.
pub fn parse_certificate(der: &[u8]) -> Result<CertificateInfo, ProbeError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| ProbeError::ParseFailure(format!("invalid certificate: {e}")))?;

    let validity = cert.validity();
    let not_before = DateTime::from_timestamp(validity.not_before.timestamp(), 0)
        .ok_or_else(|| ProbeError::ParseFailure("certificate notBefore out of range".into()))?;
    let not_after = DateTime::from_timestamp(validity.not_after.timestamp(), 0)
        .ok_or_else(|| ProbeError::ParseFailure("certificate notAfter out of range".into()))?;

    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before,
        not_after,
    })
}
