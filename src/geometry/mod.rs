//! Guide-frame geometry
//!
//! Maps the on-screen guide rectangle (logical screen coordinates) into pixel
//! coordinates of the resized photo. Each axis is scaled independently; no
//! aspect-ratio correction happens here (see [`crop_policy`]).

pub mod crop_policy;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CaptureError;

pub use crop_policy::{CropPolicy, Platform};

/// On-screen capture frame, measured once per layout pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideRect {
    /// Left edge in screen points
    pub x: f64,
    /// Top edge in screen points
    pub y: f64,
    /// Width in screen points
    pub width: f64,
    /// Height in screen points
    pub height: f64,
}

impl GuideRect {
    /// Create a validated guide rectangle
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, CaptureError> {
        let rect = Self { x, y, width, height };
        rect.validate()?;
        Ok(rect)
    }

    /// Check the layout invariants: finite values, non-negative origin, positive extent
    pub fn validate(&self) -> Result<(), CaptureError> {
        let values = [self.x, self.y, self.width, self.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CaptureError::InvalidGeometry(format!(
                "guide rectangle has non-finite values: {}",
                self
            )));
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(CaptureError::InvalidGeometry(format!(
                "guide rectangle origin is negative: {}",
                self
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(CaptureError::InvalidGeometry(format!(
                "guide rectangle must have positive size: {}",
                self
            )));
        }
        Ok(())
    }

    /// Target display size for the cropped image (guide size, truncated to whole pixels)
    pub fn display_size(&self) -> ImageSize {
        ImageSize {
            width: (self.width.floor() as u32).max(1),
            height: (self.height.floor() as u32).max(1),
        }
    }
}

impl fmt::Display for GuideRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for GuideRect {
    type Err = CaptureError;

    /// Parse "X,Y,W,H"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| CaptureError::InvalidGeometry(format!("bad guide '{}': {}", s, e)))?;

        match parts.as_slice() {
            [x, y, w, h] => GuideRect::new(*x, *y, *w, *h),
            _ => Err(CaptureError::InvalidGeometry(format!(
                "guide '{}' must have four components X,Y,W,H",
                s
            ))),
        }
    }
}

/// Logical screen dimensions at crop-mapping time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions must be finite and positive
    pub fn validate(&self) -> Result<(), CaptureError> {
        if !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0 {
            return Err(CaptureError::InvalidGeometry(format!(
                "screen size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl FromStr for ScreenSize {
    type Err = CaptureError;

    /// Parse "WxH"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| CaptureError::InvalidGeometry(format!("screen '{}' must be WxH", s)))?;
        let width = w
            .trim()
            .parse::<f64>()
            .map_err(|e| CaptureError::InvalidGeometry(format!("bad screen width '{}': {}", w, e)))?;
        let height = h
            .trim()
            .parse::<f64>()
            .map_err(|e| CaptureError::InvalidGeometry(format!("bad screen height '{}': {}", h, e)))?;
        Ok(Self { width, height })
    }
}

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel-space rectangle selected for cropping
///
/// Not clamped to the photo bounds: inflation may push the bottom edge past
/// the image, and the crop capability decides how to handle that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "offset=({}, {}) size={}x{}",
            self.offset_x, self.offset_y, self.width, self.height
        )
    }
}

/// Map a guide rectangle from screen space into pixel space of `image`
///
/// `scale_x = image.width / screen.width` and `scale_y = image.height / screen.height`;
/// every coordinate is scaled by its own axis and rounded to the nearest pixel.
pub fn map_to_pixel_rect(
    guide: &GuideRect,
    screen: ScreenSize,
    image: ImageSize,
) -> Result<CropRect, CaptureError> {
    screen.validate()?;
    if image.width == 0 || image.height == 0 {
        return Err(CaptureError::InvalidGeometry(format!(
            "image size must be positive, got {}",
            image
        )));
    }
    guide.validate()?;

    let scale_x = image.width as f64 / screen.width;
    let scale_y = image.height as f64 / screen.height;

    Ok(CropRect {
        offset_x: scale_round(guide.x, scale_x),
        offset_y: scale_round(guide.y, scale_y),
        width: scale_round(guide.width, scale_x),
        height: scale_round(guide.height, scale_y),
    })
}

fn scale_round(value: f64, scale: f64) -> u32 {
    (value * scale).round() as u32
}
