//! Platform capture sources.
//!
//! Each source runs the platform's interactive region-capture flow and
//! persists the result to the requested path. The strategy is selected
//! once at startup; the rest of the pipeline only sees the trait object.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};

use super::types::CaptureError;

#[cfg(target_os = "windows")]
pub mod drag;
#[cfg(target_os = "linux")]
pub mod gnome;
#[cfg(target_os = "macos")]
pub mod screencapture;

/// How long to wait for the capture tool to materialize the artifact.
pub const FILE_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
/// Poll interval while waiting for the artifact.
pub const FILE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One platform strategy for acquiring a region screenshot.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Preflight check; fails with `ToolMissing` before anything is
    /// launched.
    fn is_available(&self) -> Result<(), CaptureError>;

    /// Capture one user-selected region into `target`.
    async fn capture(&self, target: &Path) -> Result<(), CaptureError>;
}

/// The capture source for the running platform.
pub fn system_source() -> Arc<dyn CaptureSource> {
    #[cfg(target_os = "linux")]
    return Arc::new(gnome::GnomeScreenshotSource);
    #[cfg(target_os = "macos")]
    return Arc::new(screencapture::ScreencaptureSource);
    #[cfg(target_os = "windows")]
    return Arc::new(drag::DragSelectSource);
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return Arc::new(UnsupportedSource);
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
struct UnsupportedSource;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
#[async_trait]
impl CaptureSource for UnsupportedSource {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn is_available(&self) -> Result<(), CaptureError> {
        Err(CaptureError::ToolFailed(
            "no capture strategy for this platform".into(),
        ))
    }

    async fn capture(&self, _target: &Path) -> Result<(), CaptureError> {
        Err(CaptureError::ToolFailed(
            "no capture strategy for this platform".into(),
        ))
    }
}

/// Poll `path` until it exists with non-zero size.
///
/// The capture tools write the file after the user finishes the
/// interactive selection, so the file itself is the only reliable
/// completion signal. Exceeding `timeout` is a distinct failure from the
/// tool exiting non-zero.
pub async fn wait_for_file(
    path: &Path,
    timeout: Duration,
    interval: Duration,
) -> Result<(), CaptureError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(meta) = std::fs::metadata(path) {
            if meta.len() > 0 {
                log::debug!("Artifact appeared: {} ({} bytes)", path.display(), meta.len());
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            return Err(CaptureError::Timeout(timeout));
        }
        sleep(interval).await;
    }
}
