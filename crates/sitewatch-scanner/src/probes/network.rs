use super::{millis, ProbeContext};
use crate::error::ProbeError;
use crate::report::{DnsRecords, PingReply, ProbeResult, TlsCertificate};
use crate::transport::CertificateInfo;
use chrono::{DateTime, Utc};

/// Inspect the certificate served on the site's HTTPS port.
pub async fn check_tls(ctx: ProbeContext<'_>) -> ProbeResult<TlsCertificate> {
    let site = ctx.site;
    if !site.is_https() {
        return ProbeResult::skipped("site is not served over HTTPS");
    }

    ctx.transport
        .peer_certificate(site.host(), site.port())
        .await
        .and_then(|info| evaluate_certificate(info, Utc::now()))
        .into()
}

/// Reject certificates outside their validity window.
pub fn evaluate_certificate(
    info: CertificateInfo,
    now: DateTime<Utc>,
) -> Result<TlsCertificate, ProbeError> {
    if info.not_after < now {
        return Err(ProbeError::ValidationFailure(format!(
            "certificate expired on {}",
            info.not_after.format("%Y-%m-%d")
        )));
    }
    if info.not_before > now {
        return Err(ProbeError::ValidationFailure(format!(
            "certificate not valid before {}",
            info.not_before.format("%Y-%m-%d")
        )));
    }

    Ok(TlsCertificate {
        days_until_expiry: (info.not_after - now).num_days(),
        not_after: info.not_after,
        issuer: info.issuer,
        subject: info.subject,
    })
}

pub async fn check_dns(ctx: ProbeContext<'_>) -> ProbeResult<DnsRecords> {
    let host = ctx.site.host();

    match ctx.transport.resolve(host).await {
        Ok(addresses) if addresses.is_empty() => ProbeResult::failed(
            ProbeError::NetworkFailure(format!("no address records for {host}")),
        ),
        Ok(addresses) => ProbeResult::ok(DnsRecords {
            host: host.to_string(),
            addresses,
        }),
        Err(e) => ProbeResult::failed(e),
    }
}

pub async fn check_ping(ctx: ProbeContext<'_>) -> ProbeResult<PingReply> {
    if !ctx.options.ping_enabled {
        return ProbeResult::skipped("ping disabled in configuration");
    }

    let host = ctx.site.host();
    ctx.transport
        .ping(host)
        .await
        .map(|elapsed| PingReply {
            host: host.to_string(),
            elapsed_ms: millis(elapsed),
        })
        .into()
}
