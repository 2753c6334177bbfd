use super::ProbeContext;
use crate::error::ProbeError;
use crate::report::{ProbeResult, RedirectChain};
use crate::transport::{FetchRequest, FetchResponse, Transport};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Final response of a followed request plus the URLs visited on the way.
#[derive(Debug, Clone)]
pub struct Followed {
    pub response: FetchResponse,
    pub chain: Vec<String>,
    /// Wall-clock time summed over every hop
    pub elapsed: Duration,
}

impl Followed {
    #[must_use]
    pub fn hops(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }
}

/// Issue `request` and follow `Location` headers manually.
///
/// Relative targets resolve against the current URL. A revisited URL, more
/// than `max_redirects` hops or a redirect without `Location` is a
/// `ValidationFailure`; transport errors pass through unchanged.
pub async fn follow(
    transport: &dyn Transport,
    request: &FetchRequest,
    max_redirects: usize,
) -> Result<Followed, ProbeError> {
    let mut current = Url::parse(&request.url)
        .map_err(|e| ProbeError::ValidationFailure(format!("invalid URL {}: {e}", request.url)))?;
    let mut visited = HashSet::from([current.to_string()]);
    let mut chain = vec![current.to_string()];
    let mut elapsed = Duration::ZERO;

    loop {
        let response = transport
            .fetch(&request.retarget(current.as_str()))
            .await?;
        elapsed += response.elapsed;

        if !response.is_redirect() {
            return Ok(Followed {
                response,
                chain,
                elapsed,
            });
        }

        let location = response.location().ok_or_else(|| {
            ProbeError::ValidationFailure(format!(
                "HTTP {} from {current} without a Location header",
                response.status
            ))
        })?;
        let next = current.join(location).map_err(|e| {
            ProbeError::ValidationFailure(format!("invalid redirect target '{location}': {e}"))
        })?;

        if !visited.insert(next.to_string()) {
            return Err(ProbeError::ValidationFailure(format!(
                "redirect loop: {next} already visited"
            )));
        }
        if chain.len() > max_redirects {
            return Err(ProbeError::ValidationFailure(format!(
                "more than {max_redirects} redirects starting at {}",
                request.url
            )));
        }

        tracing::trace!("redirect {} -> {}", current, next);
        chain.push(next.to_string());
        current = next;
    }
}

/// Follow the redirect chain of the site URL.
pub async fn check_redirects(ctx: ProbeContext<'_>) -> ProbeResult<RedirectChain> {
    let request = FetchRequest::get(ctx.site.url_str());

    follow(ctx.transport, &request, ctx.options.max_redirects)
        .await
        .map(|followed| RedirectChain {
            hops: followed.hops(),
            final_url: followed.chain.last().cloned().unwrap_or_default(),
            chain: followed.chain,
        })
        .into()
}
