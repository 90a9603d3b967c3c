//! Native capability seams
//!
//! The capture session only talks to the camera, the resizer, the cropper and
//! the screen through these traits. Desktop implementations live in
//! [`still`] and [`imaging`].

pub mod imaging;
pub mod still;

#[cfg(test)]
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::capture::frame::{CroppedImage, RawPhoto, ResizedPhoto};
use crate::geometry::{CropRect, ImageSize, ScreenSize};

pub use imaging::ImageProcessor;
pub use still::{FixedScreen, StillCamera};

/// Encoding for resized and cropped files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Camera capability
#[async_trait]
pub trait Camera: Send + Sync {
    /// Ask for camera access; `false` means the user refused
    async fn request_permission(&self) -> Result<bool>;

    /// Fire the shutter
    async fn take_photo(&self) -> Result<RawPhoto>;
}

/// Resize capability with "contain" fit semantics
#[async_trait]
pub trait PhotoResizer: Send + Sync {
    /// Fit the photo at `path` inside `max_width` x `max_height`
    async fn resize(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
        format: OutputFormat,
        quality: u8,
    ) -> Result<ResizedPhoto>;

    /// Dispose of a resized photo once its capture no longer needs it
    async fn release(&self, photo: &ResizedPhoto) -> Result<()>;
}

/// Crop capability with "cover" fit into a display size
#[async_trait]
pub trait PhotoCropper: Send + Sync {
    /// Cut `rect` out of the photo at `path` and cover-fit it into `display_size`
    async fn crop(&self, path: &Path, rect: CropRect, display_size: ImageSize) -> Result<CroppedImage>;
}

/// Current logical screen dimensions
pub trait ScreenSizeProvider: Send + Sync {
    fn screen_size(&self) -> ScreenSize;
}
