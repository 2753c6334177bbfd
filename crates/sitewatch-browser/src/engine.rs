use crate::capture::{prepare_output, PageCapture};
use crate::error::{CaptureError, Result};
use crate::viewport::CaptureSettings;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use futures_util::stream::StreamExt;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// Headless Chromium session used for homepage screenshots.
pub struct CaptureEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    settings: CaptureSettings,
}

impl CaptureEngine {
    /// Launch a browser with default capture settings
    pub async fn new() -> Result<Self> {
        Self::launch(CaptureSettings::default()).await
    }

    /// Launch a browser sized to the configured viewport
    pub async fn launch(settings: CaptureSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(settings.viewport_width, settings.viewport_height)
            .viewport(Viewport {
                width: settings.viewport_width,
                height: settings.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(settings.navigation_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--hide-scrollbars");

        if !settings.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(CaptureError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CaptureError::ChromiumError(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {}", e);
                }
            }
        });

        tracing::debug!(
            width = settings.viewport_width,
            height = settings.viewport_height,
            headless = settings.headless,
            "capture browser launched"
        );

        Ok(Self {
            browser,
            handler,
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Close the browser and wait for its event loop to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| CaptureError::ChromiumError(e.to_string()))?;
        let _ = self.browser.wait().await;
        let _ = self.handler.await;
        Ok(())
    }

    async fn render(&self, url: &str, output: &Path) -> Result<()> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| CaptureError::NavigationError(format!("{url}: {e}")))?;

        let shot = async {
            page.wait_for_navigation()
                .await
                .map_err(|e| CaptureError::NavigationError(format!("{url}: {e}")))?;

            if !self.settings.settle_delay.is_zero() {
                tokio::time::sleep(self.settings.settle_delay).await;
            }

            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(false)
                .build();

            page.save_screenshot(params, output)
                .await
                .map_err(|e| CaptureError::ScreenshotError(e.to_string()))?;
            Ok::<(), CaptureError>(())
        }
        .await;

        if let Err(e) = page.close().await {
            tracing::debug!("failed to close capture tab for {}: {}", url, e);
        }

        shot
    }
}

#[async_trait::async_trait]
impl PageCapture for CaptureEngine {
    async fn capture(&self, url: &str, output: &Path) -> Result<PathBuf> {
        prepare_output(output).await?;

        // Navigation plus settle delay share one deadline.
        let deadline = self.settings.navigation_timeout + self.settings.settle_delay;
        tokio::time::timeout(deadline, self.render(url, output))
            .await
            .map_err(|_| CaptureError::Timeout(format!("{url} after {}s", deadline.as_secs())))??;

        tracing::debug!("captured {} to {}", url, output.display());
        Ok(output.to_path_buf())
    }
}
