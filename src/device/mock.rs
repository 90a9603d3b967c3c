//! In-memory capabilities for tests

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Camera, OutputFormat, PhotoCropper, PhotoResizer, ScreenSizeProvider};
use crate::capture::frame::{CroppedImage, RawPhoto, ResizedPhoto};
use crate::geometry::{CropRect, ImageSize, ScreenSize};
use crate::vision::{TextFragment, TextRecognizer};

/// Camera with call counters, optional latency and a peak-concurrency counter
#[derive(Default)]
pub struct MockCamera {
    pub deny_permission: AtomicBool,
    pub fail_shutter: AtomicBool,
    pub permission_requests: AtomicUsize,
    pub shutter_calls: AtomicUsize,
    pub delay: Mutex<Option<Duration>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl MockCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

#[async_trait]
impl Camera for MockCamera {
    async fn request_permission(&self) -> Result<bool> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(!self.deny_permission.load(Ordering::SeqCst))
    }

    async fn take_photo(&self) -> Result<RawPhoto> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.shutter_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_shutter.load(Ordering::SeqCst) {
            bail!("shutter jammed");
        }
        Ok(RawPhoto::new("/mock/raw.jpg", 4032, 3024))
    }
}

/// Resizer returning a fixed output size and tracking released photos
pub struct MockResizer {
    pub output: ImageSize,
    pub fail: AtomicBool,
    pub hang: AtomicBool,
    pub calls: Mutex<Vec<(PathBuf, u32, u32, OutputFormat, u8)>>,
    pub released: Mutex<Vec<PathBuf>>,
}

impl MockResizer {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            output: ImageSize::new(width, height),
            fail: AtomicBool::new(false),
            hang: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PhotoResizer for MockResizer {
    async fn resize(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
        format: OutputFormat,
        quality: u8,
    ) -> Result<ResizedPhoto> {
        self.calls
            .lock()
            .push((path.to_path_buf(), max_width, max_height, format, quality));
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("resizer out of memory");
        }
        let index = self.calls.lock().len();
        Ok(ResizedPhoto::new(
            format!("/mock/resized-{}.jpg", index),
            self.output.width,
            self.output.height,
        ))
    }

    async fn release(&self, photo: &ResizedPhoto) -> Result<()> {
        self.released.lock().push(photo.path.clone());
        Ok(())
    }
}

/// Cropper recording the rectangles it was given
#[derive(Default)]
pub struct MockCropper {
    pub fail: AtomicBool,
    pub hang: AtomicBool,
    pub calls: Mutex<Vec<(CropRect, ImageSize)>>,
}

impl MockCropper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl PhotoCropper for MockCropper {
    async fn crop(&self, _path: &Path, rect: CropRect, display_size: ImageSize) -> Result<CroppedImage> {
        self.calls.lock().push((rect, display_size));
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("crop rejected by native module");
        }
        let index = self.calls.lock().len();
        Ok(CroppedImage::new(
            format!("/mock/cropped-{}.jpg", index),
            display_size.width,
            display_size.height,
        ))
    }
}

/// Screen with a settable size
pub struct MockScreen(pub Mutex<ScreenSize>);

impl MockScreen {
    pub fn new(width: f64, height: f64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(ScreenSize::new(width, height))))
    }
}

impl ScreenSizeProvider for MockScreen {
    fn screen_size(&self) -> ScreenSize {
        *self.0.lock()
    }
}

/// Recognizer returning canned fragments
#[derive(Default)]
pub struct MockRecognizer {
    pub fragments: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    next_delay: Mutex<Option<Duration>>,
}

impl MockRecognizer {
    pub fn with_lines(lines: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fragments: Mutex::new(lines.iter().map(|l| l.to_string()).collect()),
            ..Default::default()
        })
    }

    /// Make only the next recognition take `delay`
    pub fn delay_next(&self, delay: Duration) {
        *self.next_delay.lock() = Some(delay);
    }
}

#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, _image: &Path) -> Result<Vec<TextFragment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.next_delay.lock().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("recognizer module not linked");
        }
        Ok(self
            .fragments
            .lock()
            .iter()
            .map(|text| TextFragment::new(text.clone()))
            .collect())
    }
}
