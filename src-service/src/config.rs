//! Configuration management for CamScan.
//!
//! Handles loading and saving user configuration to platform-standard config directories:
//! - Linux: `~/.config/camscan/config.json`
//! - macOS: `~/Library/Application Support/camscan/config.json`
//! - Windows: `%APPDATA%\camscan\config.json`

use camscan_common::{AspectSize, ImageOrientation};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Output-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Custom output directory. If None, uses the system Pictures folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// JPEG quality for saved crops (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    90
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Capture-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Viewport aspect used when a capture supplies no geometry.
    ///
    /// Unset by default, so such captures keep the full frame. A portrait
    /// document frame is configured as `{"width": 300, "height": 400}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_aspect: Option<AspectSize>,
    /// Orientation tag attached to still images loaded from disk.
    #[serde(default)]
    pub orientation: ImageOrientation,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Output settings group.
    #[serde(default)]
    pub output: OutputConfig,
    /// Capture settings group.
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Get the path to the config file.
pub fn get_config_path() -> Result<PathBuf, String> {
    let proj_dirs =
        ProjectDirs::from("", "", "camscan").ok_or("Could not determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.json"))
}

/// Load configuration from the default location.
/// Returns default config if file doesn't exist or is invalid.
pub fn load_config() -> AppConfig {
    match get_config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            warn!("Failed to get config path: {}", e);
            AppConfig::default()
        }
    }
}

/// Load configuration from `path`, falling back to defaults.
pub fn load_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return AppConfig::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Failed to read config file: {}. Using defaults.", e);
            return AppConfig::default();
        }
    };

    match serde_json::from_str::<AppConfig>(&contents) {
        Ok(config) => {
            info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            warn!("Failed to parse config file: {}. Using defaults.", e);
            AppConfig::default()
        }
    }
}

/// Save configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<PathBuf, String> {
    let path = get_config_path()?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save configuration to `path`, creating parent directories.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;

    info!("Saved config to {:?}", path);
    Ok(())
}

/// Get the default output directory (system Pictures folder, else home).
pub fn get_default_output_dir() -> Result<PathBuf, String> {
    let user_dirs = UserDirs::new().ok_or("Could not determine user directories")?;
    Ok(user_dirs
        .picture_dir()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| user_dirs.home_dir().to_path_buf()))
}

/// Get the configured output directory, falling back to default if not set.
pub fn get_output_dir(config: &AppConfig) -> Result<PathBuf, String> {
    match &config.output.directory {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => get_default_output_dir(),
    }
}
