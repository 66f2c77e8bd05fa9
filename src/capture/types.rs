//! Error types for screenshot acquisition.

use std::time::Duration;

use thiserror::Error;

/// Errors from acquiring a screenshot artifact.
///
/// A tool that is not installed, a tool that ran and failed, and a tool
/// that ran but never produced the file are distinct terminal states.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("screenshot tool '{0}' is not installed")]
    ToolMissing(&'static str),

    #[error("screenshot tool failed: {0}")]
    ToolFailed(String),

    #[error("screenshot file did not appear within {0:?}")]
    Timeout(Duration),

    #[error("selected region is empty")]
    EmptySelection,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
