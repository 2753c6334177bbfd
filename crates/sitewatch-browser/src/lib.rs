//! Homepage capture adapter.
//!
//! Drives a headless Chromium instance to save a PNG of a site's first
//! visible fold. The pipeline only sees the [`PageCapture`] trait, so the
//! browser can be swapped for a stub in tests.

pub mod capture;
pub mod engine;
pub mod error;
pub mod viewport;

pub use capture::{file_url, PageCapture};
pub use engine::CaptureEngine;
pub use error::{CaptureError, Result};
pub use viewport::CaptureSettings;
