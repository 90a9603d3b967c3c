//! Card Capture - command line driver
//!
//! Runs the capture pipeline against photos on disk: each image is one
//! shutter press, alternating front and back.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use card_capture::config::{self, AppConfig};
use card_capture::device::{FixedScreen, ImageProcessor, StillCamera};
use card_capture::storage;
use card_capture::vision::{FieldExtractor, TesseractCli};
use card_capture::{Capabilities, CaptureController, CaptureSession, GuideRect, Platform, Recognition, ScreenSize};

/// Card Capture - crop ID card photos to the guide frame and read their fields
#[derive(Parser, Debug)]
#[command(name = "card-capture")]
#[command(about = "Crop ID card photos to an on-screen guide frame and extract card fields")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Guide frame in screen points: X,Y,W,H
    #[arg(short, long, required_unless_present = "print_config")]
    guide: Option<GuideRect>,

    /// Logical screen size: WxH
    #[arg(short, long, required_unless_present = "print_config")]
    screen: Option<ScreenSize>,

    /// Camera platform whose crop factor applies (android, ios)
    #[arg(short, long)]
    platform: Option<Platform>,

    /// Skip text recognition
    #[arg(long)]
    no_ocr: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Photos to capture, in order (front, back, ...)
    #[arg(required_unless_present = "print_config")]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => load_or_create_config(),
    };
    if let Some(platform) = args.platform {
        config.crop_policy.platform = platform;
    }

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let guide = args.guide.context("--guide is required")?;
    let screen = args.screen.context("--screen is required")?;

    let controller = build_controller(&config, screen, args.images.clone(), args.no_ocr)?;
    controller.on_layout(guide)?;

    info!("Card Capture starting: {} photo(s), platform {}", args.images.len(), config.crop_policy.platform);

    for image in &args.images {
        info!("{} <- {:?}", controller.prompt_label(), image);

        match controller.capture().await {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(e) => {
                error!("Capture of {:?} failed: {}", image, e);
                if !e.is_retryable() {
                    break;
                }
            }
        }
    }

    controller.close();
    info!("Card Capture finished");

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(e) => error!("Ignoring unreadable configuration: {:#}", e),
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Wire the file-backed capabilities into a controller
fn build_controller(
    config: &AppConfig,
    screen: ScreenSize,
    images: Vec<PathBuf>,
    no_ocr: bool,
) -> Result<CaptureController> {
    let work_dir = match &config.capture.work_dir {
        Some(dir) => dir.clone(),
        None => storage::get_captures_dir()?,
    };
    info!("Writing captures to {:?}", work_dir);

    let processor = Arc::new(
        ImageProcessor::new(work_dir)?.with_crop_output(config.capture.format, config.capture.quality),
    );
    let caps = Capabilities {
        camera: Arc::new(StillCamera::new(images)),
        resizer: processor.clone(),
        cropper: processor,
        screen: Arc::new(FixedScreen::new(screen)),
    };
    let session = CaptureSession::new(caps, config.crop_policy.to_policy()?, config.capture_config());

    let recognition = (config.recognition.enabled && !no_ocr).then(|| Recognition {
        recognizer: Arc::new(TesseractCli::new(
            config.recognition.tesseract_path.clone(),
            config.recognition.language.clone(),
        )),
        extractor: FieldExtractor::new(),
        timeout: config.recognition.timeout(),
    });

    Ok(CaptureController::new(session, recognition))
}
