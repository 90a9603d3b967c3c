//! Resize and crop capabilities backed by the `image` crate
//!
//! Decoding and resampling run on the blocking pool so the capture task only
//! suspends while they are in progress. A blocking job keeps running when its
//! caller times out; its output file is then removed instead of left behind.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{OutputFormat, PhotoCropper, PhotoResizer};
use crate::capture::frame::{uri_to_path, CroppedImage, ResizedPhoto};
use crate::geometry::{CropRect, ImageSize};

/// File-based photo processor writing its outputs into a work directory
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    /// Directory for resized and cropped files
    work_dir: PathBuf,
    /// Encoding of cropped files
    crop_format: OutputFormat,
    /// JPEG quality of cropped files (1-100)
    crop_quality: u8,
}

impl ImageProcessor {
    /// Create a processor writing into `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Result<Self> {
        let work_dir = work_dir.into();
        std::fs::create_dir_all(&work_dir)
            .with_context(|| format!("Failed to create work directory {:?}", work_dir))?;

        Ok(Self {
            work_dir,
            crop_format: OutputFormat::Jpeg,
            crop_quality: 100,
        })
    }

    /// Set the encoding used for cropped output
    pub fn with_crop_output(mut self, format: OutputFormat, quality: u8) -> Self {
        self.crop_format = format;
        self.crop_quality = quality;
        self
    }

    /// Work directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn output_path(&self, prefix: &str, format: OutputFormat) -> PathBuf {
        self.work_dir
            .join(format!("{}-{}.{}", prefix, uuid::Uuid::new_v4(), format.extension()))
    }
}

#[async_trait]
impl PhotoResizer for ImageProcessor {
    async fn resize(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
        format: OutputFormat,
        quality: u8,
    ) -> Result<ResizedPhoto> {
        if max_width == 0 || max_height == 0 {
            bail!("Resize bounds must be positive, got {}x{}", max_width, max_height);
        }

        let source = uri_to_path(&path.to_string_lossy());
        let output = self.output_path("resized", format);
        let (claim, handoff) = Claim::new(&output);

        let photo = tokio::task::spawn_blocking(move || -> Result<ResizedPhoto> {
            let img = open_image(&source)?;
            let resized = contain_fit(&img, max_width, max_height);
            let (width, height) = resized.dimensions();
            debug!(
                "Resized {:?} from {}x{} to {}x{}",
                source,
                img.width(),
                img.height(),
                width,
                height
            );

            handoff.write(&output, || write_image(&resized, &output, format, quality))?;
            Ok(ResizedPhoto::new(output, width, height))
        })
        .await
        .context("Resize task panicked")??;

        claim.deliver();
        Ok(photo)
    }

    async fn release(&self, photo: &ResizedPhoto) -> Result<()> {
        if !photo.path.starts_with(&self.work_dir) {
            bail!("Refusing to remove {:?} outside work directory {:?}", photo.path, self.work_dir);
        }
        tokio::fs::remove_file(&photo.path)
            .await
            .with_context(|| format!("Failed to remove resized photo {:?}", photo.path))?;
        debug!("Removed resized photo {:?}", photo.path);
        Ok(())
    }
}

#[async_trait]
impl PhotoCropper for ImageProcessor {
    async fn crop(&self, path: &Path, rect: CropRect, display_size: ImageSize) -> Result<CroppedImage> {
        if display_size.width == 0 || display_size.height == 0 {
            bail!("Display size must be positive, got {}", display_size);
        }

        let source = uri_to_path(&path.to_string_lossy());
        let format = self.crop_format;
        let quality = self.crop_quality;
        let output = self.output_path("cropped", format);
        let (claim, handoff) = Claim::new(&output);

        let cropped = tokio::task::spawn_blocking(move || -> Result<CroppedImage> {
            let img = open_image(&source)?;
            let region = clip_to_image(rect, img.dimensions())
                .with_context(|| format!("Crop rectangle {} lies outside {}x{} image", rect, img.width(), img.height()))?;

            let cropped = img.crop_imm(region.offset_x, region.offset_y, region.width, region.height);
            let covered = cropped.resize_to_fill(display_size.width, display_size.height, FilterType::Lanczos3);
            debug!("Cropped {} (clipped to {}) into {}", rect, region, display_size);

            handoff.write(&output, || write_image(&covered, &output, format, quality))?;
            Ok(CroppedImage::new(output, covered.width(), covered.height()))
        })
        .await
        .context("Crop task panicked")??;

        claim.deliver();
        Ok(cropped)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum HandoffState {
    #[default]
    Pending,
    Written,
    Delivered,
    Abandoned,
}

/// Ownership of one output file shared by the blocking writer and its caller
///
/// Whichever side finishes last removes the file if the caller stopped
/// waiting before it was delivered.
#[derive(Debug, Default)]
struct Handoff {
    state: Mutex<HandoffState>,
}

impl Handoff {
    /// Writer side: produce the file only while the caller is still waiting
    fn write(&self, path: &Path, write: impl FnOnce() -> Result<()>) -> Result<()> {
        if *self.state.lock() == HandoffState::Abandoned {
            bail!("Caller stopped waiting for {:?}", path);
        }

        if let Err(e) = write() {
            remove_quietly(path);
            return Err(e);
        }

        let mut state = self.state.lock();
        if *state == HandoffState::Abandoned {
            drop(state);
            remove_quietly(path);
            bail!("Caller stopped waiting for {:?}", path);
        }
        *state = HandoffState::Written;
        Ok(())
    }
}

/// Caller side of a [`Handoff`]; abandons the output if dropped undelivered
struct Claim {
    handoff: Arc<Handoff>,
    path: PathBuf,
}

impl Claim {
    fn new(path: &Path) -> (Self, Arc<Handoff>) {
        let handoff = Arc::new(Handoff::default());
        let claim = Self {
            handoff: handoff.clone(),
            path: path.to_path_buf(),
        };
        (claim, handoff)
    }

    fn deliver(self) {
        *self.handoff.state.lock() = HandoffState::Delivered;
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut state = self.handoff.state.lock();
        match *state {
            HandoffState::Delivered => {}
            HandoffState::Written => {
                *state = HandoffState::Abandoned;
                drop(state);
                debug!("Removing undelivered output {:?}", self.path);
                remove_quietly(&self.path);
            }
            HandoffState::Pending | HandoffState::Abandoned => *state = HandoffState::Abandoned,
        }
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("Failed to decode image {:?}", path))
}

/// Scale to fit entirely inside the bounds, preserving aspect ratio
fn contain_fit(img: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    img.resize(max_width, max_height, FilterType::Lanczos3)
}

/// Intersect a crop rectangle with the image; `None` when nothing is left
fn clip_to_image(rect: CropRect, (img_width, img_height): (u32, u32)) -> Option<CropRect> {
    if rect.offset_x >= img_width || rect.offset_y >= img_height {
        return None;
    }

    let width = rect.width.min(img_width - rect.offset_x);
    let height = rect.height.min(img_height - rect.offset_y);
    if width == 0 || height == 0 {
        return None;
    }

    Some(CropRect {
        offset_x: rect.offset_x,
        offset_y: rect.offset_y,
        width,
        height,
    })
}

fn write_image(img: &DynamicImage, path: &Path, format: OutputFormat, quality: u8) -> Result<()> {
    match format {
        OutputFormat::Jpeg => {
            let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            let mut writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .with_context(|| format!("Failed to encode JPEG {:?}", path))?;
        }
        OutputFormat::Png => {
            img.save_with_format(path, image::ImageFormat::Png)
                .with_context(|| format!("Failed to encode PNG {:?}", path))?;
        }
    }
    Ok(())
}
