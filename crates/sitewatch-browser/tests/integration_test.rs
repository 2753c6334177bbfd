use sitewatch_browser::{CaptureEngine, CaptureSettings, PageCapture};
use std::time::Duration;

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_capture_engine_launch() {
    let engine = CaptureEngine::new().await;
    assert!(engine.is_ok(), "Failed to launch capture browser");
    engine.unwrap().shutdown().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed and network access
async fn test_capture_writes_png() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = tmp.path().join("example.com").join("print").join("homepage.png");

    let settings = CaptureSettings {
        settle_delay: Duration::from_millis(200),
        ..CaptureSettings::default()
    };
    let engine = CaptureEngine::launch(settings).await.unwrap();

    let written = engine.capture("https://example.com", &output).await.unwrap();
    assert_eq!(written, output);

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_capture_unresolvable_host_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = tmp.path().join("homepage.png");

    let settings = CaptureSettings {
        navigation_timeout: Duration::from_secs(5),
        settle_delay: Duration::ZERO,
        ..CaptureSettings::default()
    };
    let engine = CaptureEngine::launch(settings).await.unwrap();

    let result = engine.capture("https://nonexistent.invalid", &output).await;
    assert!(result.is_err());

    engine.shutdown().await.unwrap();
}
