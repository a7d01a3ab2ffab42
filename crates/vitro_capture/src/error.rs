//! Capture error types

use thiserror::Error;
use vitro_core::VitroError;

/// Why a capture cycle produced no frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Surface is not part of the tree any more
    #[error("Capture surface is not attached")]
    Detached,

    /// Surface or overlay has not been laid out yet
    #[error("Capture surface has no measured size")]
    Unmeasured,

    /// Overlay and surface do not overlap
    #[error("Overlay does not overlap the capture surface")]
    RegionEmpty,

    /// The surface failed to render into a pixel buffer
    #[error("Surface render failed: {0}")]
    Render(String),

    /// The surface rendered, but into a zero-sized buffer
    #[error("Captured buffer is empty")]
    EmptyBuffer,

    /// `start` was called outside a tokio runtime
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

impl From<CaptureError> for VitroError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::RegionEmpty => VitroError::RegionEmpty,
            other => VitroError::CaptureUnavailable(other.to_string()),
        }
    }
}

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;
