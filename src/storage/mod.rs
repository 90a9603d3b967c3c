//! Storage Layer
//!
//! Resolves where configuration and capture artifacts live on disk.

use anyhow::Result;
use std::path::PathBuf;

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "cardcapture", "CardCapture")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Default directory for resized and cropped photos
pub fn get_captures_dir() -> Result<PathBuf> {
    let captures_dir = get_data_dir()?.join("captures");
    std::fs::create_dir_all(&captures_dir)?;

    Ok(captures_dir)
}
