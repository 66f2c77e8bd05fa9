use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::capture::dependencies::ShotDependencies;
use crate::capture::types::CaptureError;
use crate::upload::{UploadError, UploadOutcome};

/// One capture-and-upload invocation.
#[derive(Debug, Clone)]
pub struct ShotRequest {
    /// Where the capture tool writes the artifact.
    pub artifact_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ShotError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Removes the screenshot artifact when the pipeline run ends, on every
/// exit path. The artifact must not outlive one run.
struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed screenshot artifact {}", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::warn!(
                "Failed to remove screenshot artifact {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Run one capture-and-upload pass. The artifact is deleted before this
/// returns, whatever the outcome.
pub async fn perform_shot(
    request: ShotRequest,
    deps: Arc<ShotDependencies>,
) -> Result<UploadOutcome, ShotError> {
    deps.source.is_available()?;

    let guard = ArtifactGuard::new(request.artifact_path);
    log::info!(
        "Launching {} capture into {}",
        deps.source.name(),
        guard.path().display()
    );
    deps.source.capture(guard.path()).await?;

    log::info!("Capture complete, uploading {}", guard.path().display());
    let outcome = deps.uploader.upload_file(guard.path()).await?;
    Ok(outcome)
}

/// Artifact filename for one run. The timestamp keeps a leftover or
/// concurrent run from colliding on the same path.
pub fn artifact_filename() -> String {
    format!("screenshot_{}.png", chrono::Local::now().timestamp())
}
