//! Still-image camera and screen used when running from the command line
//!
//! `StillCamera` "fires the shutter" by handing out the next queued image
//! file, so the whole pipeline can run against photos already on disk.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::debug;

use super::{Camera, ScreenSizeProvider};
use crate::capture::frame::{uri_to_path, RawPhoto};
use crate::geometry::ScreenSize;

/// Camera that returns queued image files in order
pub struct StillCamera {
    queue: Mutex<VecDeque<PathBuf>>,
    permission_granted: bool,
}

impl StillCamera {
    /// Create a camera that will return `photos` one per shutter
    pub fn new(photos: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            queue: Mutex::new(photos.into_iter().collect()),
            permission_granted: true,
        }
    }

    /// Simulate the user refusing camera access
    pub fn with_permission(mut self, granted: bool) -> Self {
        self.permission_granted = granted;
        self
    }

    /// Queue another photo
    pub fn push(&self, photo: PathBuf) {
        self.queue.lock().push_back(photo);
    }

    /// Number of photos left
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

#[async_trait]
impl Camera for StillCamera {
    async fn request_permission(&self) -> Result<bool> {
        Ok(self.permission_granted)
    }

    async fn take_photo(&self) -> Result<RawPhoto> {
        let next = self
            .queue
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("No more photos queued"))?;
        let path = uri_to_path(&next.to_string_lossy());

        let source = path.clone();
        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(&source))
            .await
            .context("Shutter task panicked")?
            .with_context(|| format!("Failed to read photo {:?}", path))?;

        debug!("Shutter: {:?} ({}x{})", path, width, height);
        Ok(RawPhoto::new(path, width, height))
    }
}

/// Screen with externally updated dimensions (rotation, window resize)
pub struct FixedScreen {
    size: RwLock<ScreenSize>,
}

impl FixedScreen {
    pub fn new(size: ScreenSize) -> Self {
        Self { size: RwLock::new(size) }
    }

    /// Replace the current dimensions
    pub fn set(&self, size: ScreenSize) {
        *self.size.write() = size;
    }
}

impl ScreenSizeProvider for FixedScreen {
    fn screen_size(&self) -> ScreenSize {
        *self.size.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_photos_are_taken_in_order() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("front.png");
        let second = dir.path().join("back.png");
        RgbImage::new(40, 30).save(&first).unwrap();
        RgbImage::new(20, 10).save(&second).unwrap();

        let camera = StillCamera::new(vec![first.clone(), second.clone()]);
        assert!(camera.request_permission().await.unwrap());

        let photo = camera.take_photo().await.unwrap();
        assert_eq!(photo.path, first);
        assert_eq!((photo.size.width, photo.size.height), (40, 30));

        let photo = camera.take_photo().await.unwrap();
        assert_eq!(photo.path, second);
        assert_eq!(camera.remaining(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_fails() {
        let camera = StillCamera::new(Vec::new());
        assert!(camera.take_photo().await.is_err());
    }

    #[tokio::test]
    async fn test_permission_refused() {
        let camera = StillCamera::new(Vec::new()).with_permission(false);
        assert!(!camera.request_permission().await.unwrap());
    }

    #[test]
    fn test_screen_update() {
        let screen = FixedScreen::new(ScreenSize::new(390.0, 844.0));
        screen.set(ScreenSize::new(844.0, 390.0));
        assert_eq!(screen.screen_size(), ScreenSize::new(844.0, 390.0));
    }
}
