use super::redirects::follow;
use super::{millis, FetchedPage, ProbeContext};
use crate::error::ProbeError;
use crate::report::{
    Latency, ProbeResult, Reachability, ReachabilityAttempt, ReachabilityMethod,
};
use crate::transport::FetchRequest;
use std::time::Duration;

/// Reachability result plus the homepage body when a GET method won.
#[derive(Debug, Clone)]
pub struct ReachabilityOutcome {
    pub result: ProbeResult<Reachability>,
    pub page: Option<FetchedPage>,
}

struct Success {
    url: String,
    status_code: Option<u16>,
    elapsed: Duration,
    page: Option<FetchedPage>,
}

/// Try each reachability method in order and stop at the first success.
pub async fn check_reachability(ctx: ProbeContext<'_>) -> ReachabilityOutcome {
    let mut failed_attempts = Vec::new();

    for method in ReachabilityMethod::ALL {
        match attempt(ctx, method).await {
            Ok(success) => {
                tracing::debug!(
                    "{} reachable via {:?} in {}ms",
                    ctx.site.domain(),
                    method,
                    success.elapsed.as_millis()
                );
                return ReachabilityOutcome {
                    result: ProbeResult::ok(Reachability {
                        method,
                        url: success.url,
                        status_code: success.status_code,
                        elapsed_ms: millis(success.elapsed),
                        failed_attempts,
                    }),
                    page: success.page,
                };
            }
            Err(failure) => {
                tracing::debug!(
                    "{} {:?} attempt failed: {}",
                    ctx.site.domain(),
                    method,
                    failure.error
                );
                failed_attempts.push(failure);
            }
        }
    }

    let summary = failed_attempts
        .iter()
        .map(|a| format!("{:?}: {}", a.method, a.error))
        .collect::<Vec<_>>()
        .join("; ");

    ReachabilityOutcome {
        result: ProbeResult::failed(ProbeError::NetworkFailure(format!(
            "unreachable by all {} methods ({summary})",
            ReachabilityMethod::ALL.len()
        ))),
        page: None,
    }
}

/// Latency is the elapsed time of the winning reachability call.
#[must_use]
pub fn check_latency(reachability: &ProbeResult<Reachability>) -> ProbeResult<Latency> {
    match reachability.value() {
        Some(r) => ProbeResult::ok(Latency {
            elapsed_ms: r.elapsed_ms,
            method: r.method,
        }),
        None => ProbeResult::skipped("site unreachable"),
    }
}

async fn attempt(
    ctx: ProbeContext<'_>,
    method: ReachabilityMethod,
) -> Result<Success, ReachabilityAttempt> {
    let site = ctx.site;
    let fail = |status_code: Option<u16>, error: String| ReachabilityAttempt {
        method,
        status_code,
        error,
    };

    let request = match method {
        ReachabilityMethod::Get => FetchRequest::get(site.url_str()),
        ReachabilityMethod::BrowserGet => FetchRequest::get(site.url_str())
            .with_user_agent(ctx.options.browser_user_agent.clone()),
        ReachabilityMethod::TrailingSlashGet => FetchRequest::get(format!("{}/", site.base_url())),
        ReachabilityMethod::Head => {
            let response = ctx
                .transport
                .fetch(&FetchRequest::head(site.url_str()))
                .await
                .map_err(|e| fail(None, e.to_string()))?;
            if response.status < 400 {
                return Ok(Success {
                    url: site.url_str().to_string(),
                    status_code: Some(response.status),
                    elapsed: response.elapsed,
                    page: None,
                });
            }
            return Err(fail(
                Some(response.status),
                format!("HTTP {}", response.status),
            ));
        }
        ReachabilityMethod::TcpConnect => {
            let mut errors = Vec::new();
            for port in [80, 443] {
                match ctx.transport.connect(site.host(), port).await {
                    Ok(elapsed) => {
                        return Ok(Success {
                            url: format!("{}:{port}", site.host()),
                            status_code: None,
                            elapsed,
                            page: None,
                        })
                    }
                    Err(e) => errors.push(e.to_string()),
                }
            }
            return Err(fail(None, errors.join("; ")));
        }
    };

    let followed = follow(ctx.transport, &request, ctx.options.max_redirects)
        .await
        .map_err(|e| fail(None, e.to_string()))?;

    if followed.response.status != 200 {
        return Err(fail(
            Some(followed.response.status),
            format!("HTTP {}", followed.response.status),
        ));
    }

    let elapsed = followed.elapsed;
    Ok(Success {
        url: followed.chain.last().cloned().unwrap_or(request.url),
        status_code: Some(followed.response.status),
        elapsed,
        page: Some(FetchedPage::from_response(followed.response, elapsed)),
    })
}
