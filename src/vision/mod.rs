//! Text recognition layer
//!
//! Runs OCR on the cropped card image and turns the recognized fragments
//! into structured fields. Backends:
//! - `tesseract` command line tool ([`tesseract::TesseractCli`])

pub mod fields;
pub mod tesseract;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::CaptureError;

pub use fields::{ExtractedFields, FieldExtractor, FirstMatch, MatchStrategy};
pub use tesseract::TesseractCli;

/// One recognized span of text
///
/// Fragments from a single pass carry no ordering guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Recognized text
    pub text: String,
    /// Bounding box (x, y, width, height), when the backend reports one
    pub bounds: Option<(u32, u32, u32, u32)>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: (u32, u32, u32, u32)) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Recognition capability
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize all text in the image file
    async fn recognize(&self, image: &Path) -> Result<Vec<TextFragment>>;
}

/// Recognize `image` and extract the card fields
///
/// Only a failing (or timed-out) recognition call is an error; missing
/// fields are simply absent.
pub async fn read_fields(
    recognizer: &dyn TextRecognizer,
    extractor: &FieldExtractor,
    image: &Path,
    timeout: Option<Duration>,
) -> Result<ExtractedFields, CaptureError> {
    let start = Instant::now();

    let recognition = recognizer.recognize(image);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, recognition).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Text recognition timed out after {:?}", limit);
                return Err(CaptureError::RecognitionUnavailable(format!(
                    "timed out after {} ms",
                    limit.as_millis()
                )));
            }
        },
        None => recognition.await,
    };

    let fragments = result.map_err(|e| CaptureError::RecognitionUnavailable(format!("{:#}", e)))?;
    let fields = extractor.extract(&fragments);

    debug!(
        "Recognition complete in {:?}: {} fragments, {} fields",
        start.elapsed(),
        fragments.len(),
        fields.found_count()
    );
    Ok(fields)
}
