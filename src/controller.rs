//! Top-level capture sequencing
//!
//! Per capture event: crop (blocking on failure), then field extraction
//! (best effort), then the side flip. The controller owns the guide frame,
//! the side state and the displayed image; they only change after a capture
//! has fully succeeded. A capture event spans crop, extraction and flip, and
//! only one event runs at a time.

use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capture::frame::CroppedImage;
use crate::capture::side::{CaptureSide, SideFlipStateMachine};
use crate::capture::CaptureSession;
use crate::error::CaptureError;
use crate::geometry::GuideRect;
use crate::vision::{read_fields, ExtractedFields, FieldExtractor, TextRecognizer};

/// Field recognition wiring
pub struct Recognition {
    pub recognizer: Arc<dyn TextRecognizer>,
    pub extractor: FieldExtractor,
    pub timeout: Option<Duration>,
}

/// Outcome of one successful capture
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReport {
    /// Side that was just captured
    pub side: CaptureSide,
    /// Preview label for the captured image
    pub label: &'static str,
    /// Prompt for the next capture
    pub next_prompt: &'static str,
    /// Cropped image file
    pub image_path: PathBuf,
    /// Fields read from the image (empty when recognition is off or failed)
    pub fields: ExtractedFields,
    /// Why recognition produced nothing, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition_error: Option<String>,
}

/// Drives capture, extraction and side tracking for one UI session
pub struct CaptureController {
    session: CaptureSession,
    recognition: Option<Recognition>,
    guide: Mutex<Option<GuideRect>>,
    side: Mutex<SideFlipStateMachine>,
    displayed: Mutex<Option<CroppedImage>>,
    in_flight: AtomicBool,
    closed: CancellationToken,
}

/// Claim on the controller for one whole capture event
struct EventGuard<'a>(&'a AtomicBool);

impl<'a> EventGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for EventGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CaptureController {
    /// Create a controller; `recognition` of `None` skips field extraction
    pub fn new(session: CaptureSession, recognition: Option<Recognition>) -> Self {
        Self {
            session,
            recognition,
            guide: Mutex::new(None),
            side: Mutex::new(SideFlipStateMachine::new()),
            displayed: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            closed: CancellationToken::new(),
        }
    }

    /// Record a new guide frame layout; the latest valid layout wins
    pub fn on_layout(&self, guide: GuideRect) -> Result<(), CaptureError> {
        guide.validate()?;
        info!("Guide frame laid out at {}", guide);
        *self.guide.lock() = Some(guide);
        Ok(())
    }

    /// Latest guide frame
    pub fn guide(&self) -> Option<GuideRect> {
        *self.guide.lock()
    }

    /// Whether the capture control should be enabled
    pub fn can_capture(&self) -> bool {
        self.guide.lock().is_some() && !self.is_busy() && !self.closed.is_cancelled()
    }

    /// Whether a capture event (crop through flip) is running
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) || self.session.is_busy()
    }

    /// Side expected next
    pub fn current_side(&self) -> CaptureSide {
        self.side.lock().current()
    }

    /// Prompt label for the next capture
    pub fn prompt_label(&self) -> &'static str {
        self.side.lock().prompt_label()
    }

    /// Flip animation target in degrees
    pub fn rotation_degrees(&self) -> f32 {
        self.side.lock().rotation_degrees()
    }

    /// Image currently on display
    pub fn displayed_image(&self) -> Option<CroppedImage> {
        self.displayed.lock().clone()
    }

    /// The capture session
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Close the UI session; in-flight results are discarded
    pub fn close(&self) {
        info!("Capture session closed");
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Run one capture event
    ///
    /// Rejected with [`CaptureError::Busy`] while another event is still
    /// cropping or reading fields, so sides are assigned in shutter order.
    pub async fn capture(&self) -> Result<CaptureReport, CaptureError> {
        if self.closed.is_cancelled() {
            return Err(CaptureError::SessionClosed);
        }

        let Some(_event) = EventGuard::acquire(&self.in_flight) else {
            warn!("Capture requested while the previous capture is still being processed");
            return Err(CaptureError::Busy);
        };

        let guide = self.guide();
        let image = self.session.capture(guide.as_ref()).await?;

        let (fields, recognition_error) = self.extract(&image).await;

        if self.closed.is_cancelled() {
            warn!("Discarding capture {:?}: session closed", image.path);
            return Err(CaptureError::SessionClosed);
        }

        let (side, label, next_prompt) = {
            let mut machine = self.side.lock();
            let side = machine.complete_capture();
            (side, machine.completed_label(), machine.prompt_label())
        };
        *self.displayed.lock() = Some(image.clone());

        info!("{} captured; next: {}", label, next_prompt);
        Ok(CaptureReport {
            side,
            label,
            next_prompt,
            image_path: image.path,
            fields,
            recognition_error,
        })
    }

    async fn extract(&self, image: &CroppedImage) -> (ExtractedFields, Option<String>) {
        let Some(recognition) = &self.recognition else {
            return (ExtractedFields::default(), None);
        };

        match read_fields(
            recognition.recognizer.as_ref(),
            &recognition.extractor,
            &image.path,
            recognition.timeout,
        )
        .await
        {
            Ok(fields) => (fields, None),
            Err(e) => {
                warn!("Field extraction skipped: {}", e);
                (ExtractedFields::default(), Some(e.to_string()))
            }
        }
    }
}
