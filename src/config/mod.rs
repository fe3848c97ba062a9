//! Application Configuration
//!
//! User settings and tuning stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Alignment guide settings
    pub guide: GuideSettings,
    /// Capture gate settings
    pub capture: CaptureSettings,
    /// Text recognition settings
    pub ocr: OcrSettings,
    /// Storage settings
    pub storage: StorageSettings,
}

/// Alignment guide geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideSettings {
    /// Guide rectangle width in pixels (sized for a CNIC at arm's length)
    pub width: u32,
    /// Guide rectangle height in pixels
    pub height: u32,
    /// Containment margin in pixels inside the guide edges
    pub inset: i32,
}

impl Default for GuideSettings {
    fn default() -> Self {
        Self {
            width: 400,
            height: 250,
            inset: 10,
        }
    }
}

/// Capture gate and locator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Minimum Laplacian-variance sharpness accepted at capture time
    pub sharpness_threshold: f64,
    /// Gaussian blur sigma before edge detection
    pub blur_sigma: f32,
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of contour perimeter
    pub approx_tolerance: f64,
    /// Run face extraction on captured documents
    pub extract_face: bool,
    /// Persist completed records to the database
    pub persist: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sharpness_threshold: 150.0,
            blur_sigma: 1.4,
            canny_low: 50.0,
            canny_high: 150.0,
            approx_tolerance: 0.02,
            extract_face: true,
            persist: true,
        }
    }
}

/// Text recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Fragments below this confidence are dropped
    pub min_confidence: f32,
    /// Country-of-stay value expected on the document
    pub country: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            country: "Pakistan".to_string(),
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Database path; defaults to `records.db` in the data directory
    pub database_path: Option<PathBuf>,
    /// Where the extracted face image is written
    pub face_image_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            face_image_path: PathBuf::from("extracted_face.png"),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
