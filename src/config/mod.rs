//! Application Configuration
//!
//! Capture, crop calibration and recognition settings stored in TOML format.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::device::OutputFormat;
use crate::geometry::{CropPolicy, Platform};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture pipeline settings
    pub capture: CaptureSettings,
    /// Crop height calibration
    pub crop_policy: CropPolicySettings,
    /// Text recognition settings
    pub recognition: RecognitionSettings,
}

impl AppConfig {
    /// Capture session configuration derived from these settings
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            max_width: self.capture.max_width,
            max_height: self.capture.max_height,
            format: self.capture.format,
            quality: self.capture.quality,
            platform: self.crop_policy.platform,
            step_timeout: self.capture.step_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Maximum width of the resized photo
    pub max_width: u32,
    /// Maximum height of the resized photo
    pub max_height: u32,
    /// Encoding of resized and cropped files
    pub format: OutputFormat,
    /// Encoding quality (1-100)
    pub quality: u8,
    /// Timeout for each camera/resize/crop call, in milliseconds
    pub step_timeout_ms: Option<u64>,
    /// Where resized and cropped files are written (defaults to the data directory)
    pub work_dir: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_width: 1280,
            max_height: 960,
            format: OutputFormat::Jpeg,
            quality: 100,
            step_timeout_ms: Some(15_000),
            work_dir: None,
        }
    }
}

/// Crop height calibration
///
/// The factors are empirical values per camera pipeline, not derived.
/// Entries in `[crop_policy.factors]` override the built-in table one
/// platform at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropPolicySettings {
    /// Platform whose factor applies
    pub platform: Platform,
    /// Height factor keyed by platform name
    pub factors: BTreeMap<String, f64>,
}

impl Default for CropPolicySettings {
    fn default() -> Self {
        let factors = CropPolicy::default()
            .factors
            .into_iter()
            .map(|(platform, factor)| (platform.to_string(), factor))
            .collect();

        Self {
            platform: Platform::Android,
            factors,
        }
    }
}

impl CropPolicySettings {
    /// Build the calibration table, rejecting unknown platforms and unusable factors
    pub fn to_policy(&self) -> Result<CropPolicy> {
        let mut factors = CropPolicy::default().factors;
        for (name, &factor) in &self.factors {
            let platform: Platform = name
                .parse()
                .with_context(|| format!("Invalid [crop_policy.factors] entry '{}'", name))?;
            if !factor.is_finite() || factor <= 0.0 {
                bail!("Crop factor for {} must be a positive number, got {}", platform, factor);
            }
            factors.insert(platform, factor);
        }
        Ok(CropPolicy::with_factors(factors))
    }
}

/// Text recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Run field extraction after each capture
    pub enabled: bool,
    /// Tesseract executable
    pub tesseract_path: PathBuf,
    /// Tesseract language pack
    pub language: String,
    /// Recognition timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            timeout_ms: Some(15_000),
        }
    }
}

impl RecognitionSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    config
        .crop_policy
        .to_policy()
        .with_context(|| format!("Invalid crop policy in {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        // Check capture defaults
        assert_eq!(config.capture.max_width, 1280);
        assert_eq!(config.capture.max_height, 960);
        assert_eq!(config.capture.format, OutputFormat::Jpeg);
        assert_eq!(config.capture.quality, 100);
        assert_eq!(config.capture.step_timeout_ms, Some(15_000));
        assert!(config.capture.work_dir.is_none());

        // Check crop policy defaults
        assert_eq!(config.crop_policy.platform, Platform::Android);
        assert!((config.crop_policy.factors["android"] - 3.1).abs() < 1e-9);
        assert!((config.crop_policy.factors["ios"] - 2.8).abs() < 1e-9);

        // Check recognition defaults
        assert!(config.recognition.enabled);
        assert_eq!(config.recognition.language, "eng");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.capture.max_width, parsed.capture.max_width);
        assert_eq!(config.crop_policy.platform, parsed.crop_policy.platform);
        assert_eq!(config.crop_policy.factors, parsed.crop_policy.factors);
        assert_eq!(config.recognition.tesseract_path, parsed.recognition.tesseract_path);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [crop_policy]
            platform = "ios"

            [crop_policy.factors]
            ios = 2.5
            "#,
        )
        .unwrap();

        assert_eq!(parsed.crop_policy.platform, Platform::Ios);
        assert_eq!(parsed.capture.max_width, 1280);

        // Missing platforms keep their built-in factor
        let policy = parsed.crop_policy.to_policy().unwrap();
        assert!((policy.factor(Platform::Ios) - 2.5).abs() < 1e-9);
        assert!((policy.factor(Platform::Android) - 3.1).abs() < 1e-9);
    }

    #[test]
    fn test_capture_config_and_policy() {
        let mut config = AppConfig::default();
        config.crop_policy.platform = Platform::Ios;
        config.capture.step_timeout_ms = None;

        let capture = config.capture_config();
        assert_eq!(capture.platform, Platform::Ios);
        assert!(capture.step_timeout.is_none());

        let policy = config.crop_policy.to_policy().unwrap();
        assert!((policy.factor(Platform::Ios) - 2.8).abs() < 1e-9);
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.capture.format = OutputFormat::Png;
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.capture.format, OutputFormat::Png);
        assert_eq!(config.recognition.enabled, loaded.recognition.enabled);
    }

    fn load_str(content: &str) -> Result<AppConfig> {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();
        load_config(temp_file.path())
    }

    #[test]
    fn test_load_config_with_factor_override() {
        let config = load_str(
            r#"
            [capture]
            format = "png"
            step_timeout_ms = 5000

            [crop_policy.factors]
            android = 3.4
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.format, OutputFormat::Png);
        assert_eq!(config.capture_config().step_timeout, Some(Duration::from_secs(5)));
        let policy = config.crop_policy.to_policy().unwrap();
        assert!((policy.factor(Platform::Android) - 3.4).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_platform_is_rejected() {
        let result = load_str(
            r#"
            [crop_policy]
            platform = "windows"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_factor_key_is_rejected() {
        let err = load_str(
            r#"
            [crop_policy.factors]
            symbian = 2.0
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("symbian"));
    }

    #[test]
    fn test_non_positive_factor_is_rejected() {
        let mut settings = CropPolicySettings::default();
        settings.factors.insert("ios".to_string(), 0.0);
        assert!(settings.to_policy().is_err());

        settings.factors.insert("ios".to_string(), -2.8);
        assert!(settings.to_policy().is_err());
    }

    #[test]
    fn test_unknown_output_format_is_rejected() {
        let result = load_str(
            r#"
            [capture]
            format = "webp"
            "#,
        );
        assert!(result.is_err());
    }
}
