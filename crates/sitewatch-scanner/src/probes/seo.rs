use super::ProbeContext;
use crate::error::ProbeError;
use crate::report::{ProbeResult, SeoFile};
use crate::transport::FetchRequest;

pub async fn check_robots_txt(ctx: ProbeContext<'_>) -> ProbeResult<SeoFile> {
    check_origin_file(ctx, "robots.txt").await
}

pub async fn check_sitemap_xml(ctx: ProbeContext<'_>) -> ProbeResult<SeoFile> {
    check_origin_file(ctx, "sitemap.xml").await
}

// Only an HTTP 200 counts as present.
async fn check_origin_file(ctx: ProbeContext<'_>, file: &str) -> ProbeResult<SeoFile> {
    let url = format!("{}/{file}", ctx.site.origin());

    match ctx.transport.fetch(&FetchRequest::get(url.as_str())).await {
        Ok(response) if response.status == 200 => ProbeResult::ok(SeoFile {
            url,
            status: response.status,
            bytes: response.body.len(),
        }),
        Ok(response) => ProbeResult::failed(ProbeError::NotFound(format!(
            "{url} returned HTTP {}",
            response.status
        ))),
        Err(e) => ProbeResult::failed(e),
    }
}
