use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::capture::sources::{self, CaptureSource};
use crate::config::Config;
use crate::notification::DesktopNotifier;
use crate::upload::{UploadClient, UploadError, UploadOutcome, UploadTarget};

/// Abstraction over delivering the artifact to the image host.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    async fn upload_file(&self, path: &Path) -> Result<UploadOutcome, UploadError>;
}

/// Abstraction over user-facing completion notices. Best-effort: failures
/// are logged by the implementation, never propagated.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &str, body: &str);
}

/// Bundle of dependencies used by the shot pipeline. Each component can
/// be mocked in tests.
#[derive(Clone)]
pub struct ShotDependencies {
    pub source: Arc<dyn CaptureSource>,
    pub uploader: Arc<dyn ArtifactUploader>,
    pub notifier: Arc<dyn Notifier>,
}

impl ShotDependencies {
    /// Production wiring: the platform capture source, the HTTP uploader,
    /// desktop notifications.
    pub fn new(config: &Config) -> Result<Self, UploadError> {
        Ok(Self {
            source: sources::system_source(),
            uploader: Arc::new(UploadClient::new(config)?),
            notifier: Arc::new(DesktopNotifier),
        })
    }
}

#[async_trait]
impl ArtifactUploader for UploadClient {
    async fn upload_file(&self, path: &Path) -> Result<UploadOutcome, UploadError> {
        self.upload(&UploadTarget::Local(path.to_path_buf())).await
    }
}
