use serde::{Deserialize, Serialize};
use sitewatch_core::CaptureConfig;
use std::time::Duration;

/// Browser window and timing settings for a capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for CaptureSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            headless: config.headless,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            settle_delay: Duration::from_millis(config.settle_millis),
        }
    }
}
