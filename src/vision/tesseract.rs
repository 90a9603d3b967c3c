//! Tesseract command line backend
//!
//! Runs `tesseract <image> stdout -l <lang>` and treats every non-empty
//! output line as one fragment.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::{TextFragment, TextRecognizer};
use crate::capture::frame::uri_to_path;

/// Page segmentation mode: assume a single uniform block of text
const DEFAULT_PSM: u8 = 6;

/// Recognizer shelling out to the `tesseract` executable
#[derive(Debug, Clone)]
pub struct TesseractCli {
    /// Executable name or path
    binary: PathBuf,
    /// Language pack (e.g., "eng")
    language: String,
    /// Page segmentation mode
    psm: u8,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            psm: DEFAULT_PSM,
        }
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn recognize(&self, image: &Path) -> Result<Vec<TextFragment>> {
        let image = uri_to_path(&image.to_string_lossy());
        debug!("Running {:?} on {:?} (lang={}, psm={})", self.binary, image, self.language, self.psm);

        let output = Command::new(&self.binary)
            .arg(&image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to launch {:?}", self.binary))?;

        if !output.status.success() {
            bail!(
                "{:?} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let fragments = parse_output(&String::from_utf8_lossy(&output.stdout));
        info!("Tesseract recognized {} fragments", fragments.len());
        Ok(fragments)
    }
}

/// Split recognizer output into trimmed, non-empty line fragments
fn parse_output(stdout: &str) -> Vec<TextFragment> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(TextFragment::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let stdout = "REPUBLIC ID CARD\n\n  Issuing Date: 01/02/2020 \n\u{c}\nExpiry Date: 01/02/2030\n";
        let fragments = parse_output(stdout);

        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["REPUBLIC ID CARD", "Issuing Date: 01/02/2020", "Expiry Date: 01/02/2030"]
        );
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_output("\n \n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let recognizer = TesseractCli::new("/nonexistent/tesseract-binary", "eng");
        let result = recognizer.recognize(Path::new("/tmp/card.jpg")).await;
        assert!(result.is_err());
    }
}
