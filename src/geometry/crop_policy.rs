//! Per-platform crop height inflation
//!
//! The guide frame's aspect ratio does not match the physical card once the
//! photo has been bounded to the resize resolution, and the mismatch differs
//! between the Android and iOS camera pipelines. The factors are empirical
//! calibration values, not derived from any transform. Keep them in config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::CropRect;

/// Empirical height factor for Android camera output
pub const ANDROID_HEIGHT_FACTOR: f64 = 3.1;
/// Empirical height factor for iOS camera output
pub const IOS_HEIGHT_FACTOR: f64 = 2.8;

/// Host camera platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => f.write_str("android"),
            Platform::Ios => f.write_str("ios"),
        }
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(anyhow::anyhow!("unknown platform '{}'", other)),
        }
    }
}

/// Calibration table of height factors keyed by platform
#[derive(Debug, Clone, PartialEq)]
pub struct CropPolicy {
    /// Height multiplier per platform
    pub factors: BTreeMap<Platform, f64>,
}

impl Default for CropPolicy {
    fn default() -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(Platform::Android, ANDROID_HEIGHT_FACTOR);
        factors.insert(Platform::Ios, IOS_HEIGHT_FACTOR);
        Self { factors }
    }
}

impl CropPolicy {
    /// Build a policy from an explicit table
    pub fn with_factors(factors: BTreeMap<Platform, f64>) -> Self {
        Self { factors }
    }

    /// Height factor for `platform`; 1.0 when the table has no usable entry
    pub fn factor(&self, platform: Platform) -> f64 {
        match self.factors.get(&platform) {
            Some(&factor) if factor.is_finite() && factor > 0.0 => factor,
            Some(&factor) => {
                warn!("Ignoring invalid crop factor {} for {}", factor, platform);
                1.0
            }
            None => {
                warn!("No crop factor configured for {}, leaving height unchanged", platform);
                1.0
            }
        }
    }

    /// Multiply the rectangle's height by the platform factor
    ///
    /// Offset and width pass through untouched.
    pub fn apply_inflation(&self, rect: CropRect, platform: Platform) -> CropRect {
        let factor = self.factor(platform);
        CropRect {
            height: (rect.height as f64 * factor).round() as u32,
            ..rect
        }
    }
}
