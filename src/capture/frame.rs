//! Photo artifacts produced along the capture pipeline

use anyhow::{Context, Result};
use base64::Engine;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::geometry::ImageSize;

/// Strip a `file://` scheme so camera URIs can be opened as plain paths
pub fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Unedited camera output
#[derive(Debug, Clone)]
pub struct RawPhoto {
    /// Location of the photo file
    pub path: PathBuf,
    /// Pixel dimensions reported by the camera
    pub size: ImageSize,
    /// When the shutter fired
    pub taken_at: Instant,
}

impl RawPhoto {
    /// Create a new raw photo record
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            size: ImageSize::new(width, height),
            taken_at: Instant::now(),
        }
    }
}

/// Raw photo bounded to the configured resolution
#[derive(Debug, Clone)]
pub struct ResizedPhoto {
    /// Location of the resized file
    pub path: PathBuf,
    /// Actual dimensions after the contain fit (may differ slightly from the request)
    pub size: ImageSize,
}

impl ResizedPhoto {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            size: ImageSize::new(width, height),
        }
    }
}

/// Final normalized document image
///
/// Produced once per successful capture and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppedImage {
    /// Location of the cropped file
    pub path: PathBuf,
    /// Dimensions of the cropped image
    pub size: ImageSize,
}

impl CroppedImage {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            size: ImageSize::new(width, height),
        }
    }

    /// Path to the cropped file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and encode it as a base64 `data:` URI
    pub fn to_data_uri(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read cropped image {:?}", self.path))?;

        let mime = match self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            _ => "image/jpeg",
        };

        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{};base64,{}", mime, encoded))
    }
}
