use crate::error::{CaptureError, Result};
use std::path::{Path, PathBuf};

/// Screenshot capability consumed by the site pipeline.
#[async_trait::async_trait]
pub trait PageCapture: Send + Sync {
    /// Navigate to `url` and write a PNG of the first visible fold to `output`.
    ///
    /// Returns the path that was written.
    async fn capture(&self, url: &str, output: &Path) -> Result<PathBuf>;
}

/// Render a local path as a `file://` URL for report consumers.
pub fn file_url(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    url::Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .map_err(|()| {
            CaptureError::ScreenshotError(format!(
                "cannot express {} as a file URL",
                absolute.display()
            ))
        })
}

/// Make sure the parent directory of a capture target exists.
pub(crate) async fn prepare_output(output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
