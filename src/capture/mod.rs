//! Card capture session
//!
//! One capture = shutter, resize to a bounded resolution, map the guide frame
//! into the resized photo, inflate the crop height, crop. Every native call
//! is a suspension point with an optional timeout. Any failure leaves the
//! session back in `Idle` with nothing produced. The resized intermediate is
//! released as soon as the crop step is over, whatever its outcome.

pub mod frame;
pub mod side;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::device::{Camera, OutputFormat, PhotoCropper, PhotoResizer, ScreenSizeProvider};
use crate::error::{CaptureError, CaptureStage};
use crate::geometry::{map_to_pixel_rect, CropPolicy, GuideRect, Platform};

use frame::{CroppedImage, ResizedPhoto};

/// Buffered state transitions per subscriber
const TRANSITION_CAPACITY: usize = 16;

/// Capture pipeline configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum width of the resized photo
    pub max_width: u32,
    /// Maximum height of the resized photo
    pub max_height: u32,
    /// Encoding of the resized photo
    pub format: OutputFormat,
    /// Encoding quality (100 = no visible compression)
    pub quality: u8,
    /// Platform whose crop factor applies
    pub platform: Platform,
    /// Limit for each native call; `None` waits indefinitely
    pub step_timeout: Option<Duration>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_width: 1280,
            max_height: 960,
            format: OutputFormat::Jpeg,
            quality: 100,
            platform: Platform::Android,
            step_timeout: Some(Duration::from_secs(15)),
        }
    }
}

/// Lifecycle of a single capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for a capture
    Idle,
    /// Shutter and resize in progress
    Capturing,
    /// Mapping and cropping in progress
    Cropping,
    /// Last step failed; returns to `Idle` once the failure is logged
    Failed,
}

/// Native capabilities used by a session
#[derive(Clone)]
pub struct Capabilities {
    pub camera: Arc<dyn Camera>,
    pub resizer: Arc<dyn PhotoResizer>,
    pub cropper: Arc<dyn PhotoCropper>,
    pub screen: Arc<dyn ScreenSizeProvider>,
}

/// Orchestrates one photo capture at a time
pub struct CaptureSession {
    caps: Capabilities,
    policy: CropPolicy,
    config: CaptureConfig,
    state: Mutex<SessionState>,
    transitions: broadcast::Sender<SessionState>,
    in_flight: AtomicBool,
    permission_granted: AtomicBool,
}

/// Holds the busy flag for the duration of one capture
struct InFlight<'a> {
    session: &'a CaptureSession,
}

impl<'a> InFlight<'a> {
    fn acquire(session: &'a CaptureSession) -> Option<Self> {
        session
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { session })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.set_state(SessionState::Idle);
        self.session.in_flight.store(false, Ordering::Release);
    }
}

impl CaptureSession {
    /// Create a session over the given capabilities
    pub fn new(caps: Capabilities, policy: CropPolicy, config: CaptureConfig) -> Self {
        Self {
            caps,
            policy,
            config,
            state: Mutex::new(SessionState::Idle),
            transitions: broadcast::channel(TRANSITION_CAPACITY).0,
            in_flight: AtomicBool::new(false),
            permission_granted: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.transitions.subscribe()
    }

    /// Whether a capture is running
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Session configuration
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.lock();
        if *current == state {
            return;
        }
        debug!("Capture session: {:?} -> {:?}", *current, state);
        *current = state;
        // No subscribers is fine
        let _ = self.transitions.send(state);
    }

    /// Capture and crop one photo of the card inside `guide`
    ///
    /// Overlapping calls are rejected with [`CaptureError::Busy`]; only one
    /// camera invocation is ever in flight per session.
    pub async fn capture(&self, guide: Option<&GuideRect>) -> Result<CroppedImage, CaptureError> {
        let guide = guide.ok_or(CaptureError::NoGuideMeasured)?;
        guide.validate()?;
        self.caps.screen.screen_size().validate()?;

        let Some(_guard) = InFlight::acquire(self) else {
            warn!("Capture requested while another capture is in flight");
            return Err(CaptureError::Busy);
        };

        self.ensure_permission().await?;

        self.set_state(SessionState::Capturing);
        match self.run_pipeline(guide).await {
            Ok(image) => {
                info!("Capture complete: {:?} ({})", image.path, image.size);
                Ok(image)
            }
            Err(e) => {
                self.set_state(SessionState::Failed);
                error!("Error capturing or cropping image: {}", e);
                Err(e)
            }
        }
    }

    async fn ensure_permission(&self) -> Result<(), CaptureError> {
        if self.permission_granted.load(Ordering::Acquire) {
            return Ok(());
        }

        let granted = match self.caps.camera.request_permission().await {
            Ok(granted) => granted,
            Err(e) => {
                warn!("Camera permission request failed: {:#}", e);
                false
            }
        };

        if !granted {
            warn!("Camera permission denied");
            return Err(CaptureError::PermissionDenied);
        }
        self.permission_granted.store(true, Ordering::Release);
        Ok(())
    }

    async fn run_pipeline(&self, guide: &GuideRect) -> Result<CroppedImage, CaptureError> {
        let raw = self.step(CaptureStage::Shutter, self.caps.camera.take_photo()).await?;
        info!("Original size: {}", raw.size);

        let resized = self
            .step(
                CaptureStage::Resize,
                self.caps.resizer.resize(
                    &raw.path,
                    self.config.max_width,
                    self.config.max_height,
                    self.config.format,
                    self.config.quality,
                ),
            )
            .await?;
        info!("Resized size: {}", resized.size);

        self.set_state(SessionState::Cropping);
        let cropped = self.crop(guide, &resized).await;
        self.release(&resized).await;
        cropped
    }

    async fn crop(&self, guide: &GuideRect, resized: &ResizedPhoto) -> Result<CroppedImage, CaptureError> {
        // Screen size is read now, not at layout time
        let screen = self.caps.screen.screen_size();
        let mapped = map_to_pixel_rect(guide, screen, resized.size)?;
        let rect = self.policy.apply_inflation(mapped, self.config.platform);
        let display_size = guide.display_size();
        info!(
            "Crop: {} (mapped {}, platform {}), display {}",
            rect, mapped, self.config.platform, display_size
        );

        self.step(
            CaptureStage::Crop,
            self.caps.cropper.crop(&resized.path, rect, display_size),
        )
        .await
    }

    /// Drop the resized intermediate; failure only costs disk space
    async fn release(&self, resized: &ResizedPhoto) {
        if let Err(e) = self
            .step(CaptureStage::Resize, self.caps.resizer.release(resized))
            .await
        {
            warn!("Resized photo {:?} not released: {}", resized.path, e);
        }
    }

    /// Await one native call, converting failure and timeout into `CaptureFailed`
    async fn step<T>(
        &self,
        stage: CaptureStage,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, CaptureError> {
        let result = match self.config.step_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                CaptureError::CaptureFailed {
                    stage,
                    reason: format!("timed out after {} ms", limit.as_millis()),
                }
            })?,
            None => call.await,
        };

        result.map_err(|e| CaptureError::failed(stage, &e))
    }
}
