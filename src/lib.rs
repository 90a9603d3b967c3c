//! Card Capture - two-sided ID card capture and field extraction
//!
//! Maps an on-screen guide frame into the pixels of a resized camera photo,
//! crops the card out of it, reads issuing date, expiry date and ID number
//! from the crop, and tracks which side of the card comes next.

pub mod capture;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod geometry;
pub mod storage;
pub mod vision;

pub use capture::{Capabilities, CaptureConfig, CaptureSession, SessionState};
pub use controller::{CaptureController, CaptureReport, Recognition};
pub use error::{CaptureError, CaptureStage};
pub use geometry::{map_to_pixel_rect, CropPolicy, CropRect, GuideRect, ImageSize, Platform, ScreenSize};
pub use vision::{ExtractedFields, FieldExtractor, TextFragment, TextRecognizer};
