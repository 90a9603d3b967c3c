//! Error taxonomy for the capture pipeline
//!
//! Geometry and permission problems are detected before any native call.
//! Camera, resize and crop failures are folded into `CaptureFailed` at the
//! session boundary. Recognition failures never reach the capture result.

use std::fmt;
use thiserror::Error;

/// Pipeline step that was running when a capture failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    /// Camera shutter (taking the raw photo)
    Shutter,
    /// Bounding the raw photo to the configured resolution
    Resize,
    /// Cropping the resized photo to the guide frame
    Crop,
}

impl fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureStage::Shutter => "shutter",
            CaptureStage::Resize => "resize",
            CaptureStage::Crop => "crop",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the capture session and controller
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Zero, negative or non-finite screen/guide dimensions
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Capture requested before any guide frame was laid out
    #[error("no guide frame has been measured yet")]
    NoGuideMeasured,

    /// The camera capability refused access
    #[error("camera permission denied")]
    PermissionDenied,

    /// Another capture is still in flight on this session
    #[error("a capture is already in progress")]
    Busy,

    /// A native camera, resize or crop call failed or timed out
    #[error("capture failed during {stage}: {reason}")]
    CaptureFailed { stage: CaptureStage, reason: String },

    /// The text recognition call itself failed
    #[error("text recognition unavailable: {0}")]
    RecognitionUnavailable(String),

    /// The capture finished after its UI session was closed
    #[error("capture session closed before the result could be applied")]
    SessionClosed,
}

impl CaptureError {
    /// Build a `CaptureFailed` from a capability error, keeping its context chain
    pub fn failed(stage: CaptureStage, err: &anyhow::Error) -> Self {
        CaptureError::CaptureFailed {
            stage,
            reason: format!("{:#}", err),
        }
    }

    /// Whether the user can simply try again
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CaptureError::PermissionDenied | CaptureError::SessionClosed)
    }
}
