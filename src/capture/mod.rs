//! Screenshot capture-and-upload pipeline.
//!
//! This module provides:
//! - Platform capture sources (interactive region screenshot to a file)
//! - The orchestration pipeline: capture, upload, guaranteed artifact
//!   cleanup
//! - Mockable dependency traits so the pipeline is testable without a
//!   desktop session or a network

pub mod region;
pub mod sources;
pub mod types;

mod dependencies;
mod pipeline;

pub use dependencies::{ArtifactUploader, Notifier, ShotDependencies};
pub use pipeline::{ShotError, ShotRequest, artifact_filename, perform_shot};
pub use types::CaptureError;
