//! macOS capture by shelling out to the system `screencapture` tool.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use tokio::task;

use crate::capture::sources::{
    CaptureSource, FILE_POLL_INTERVAL, FILE_WAIT_TIMEOUT, wait_for_file,
};
use crate::capture::types::CaptureError;

const TOOL: &str = "screencapture";

pub struct ScreencaptureSource;

#[async_trait]
impl CaptureSource for ScreencaptureSource {
    fn name(&self) -> &'static str {
        TOOL
    }

    fn is_available(&self) -> Result<(), CaptureError> {
        which::which(TOOL)
            .map(|_| ())
            .map_err(|_| CaptureError::ToolMissing(TOOL))
    }

    async fn capture(&self, target: &Path) -> Result<(), CaptureError> {
        let path = target.to_path_buf();
        task::spawn_blocking(move || run_tool(&path))
            .await
            .map_err(|e| CaptureError::ToolFailed(format!("capture task failed to join: {e}")))??;
        wait_for_file(target, FILE_WAIT_TIMEOUT, FILE_POLL_INTERVAL).await
    }
}

fn run_tool(target: &Path) -> Result<(), CaptureError> {
    // -i puts screencapture into interactive region selection.
    let output = Command::new(TOOL)
        .arg("-i")
        .arg(target)
        .output()
        .map_err(|e| CaptureError::ToolFailed(format!("failed to run {TOOL}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::ToolFailed(format!(
            "{TOOL} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
