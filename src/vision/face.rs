//! Face region extraction from captured documents

use anyhow::Result;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Rectangular face candidate within a cropped document image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Face-region detector capability.
///
/// Candidates come back in the detector's own order; only the first is
/// used.
pub trait FaceDetector {
    fn detect_faces(&mut self, image: &RgbaImage) -> Result<Vec<FaceRegion>>;
}

/// Isolates the photo from a captured document using an injected detector
pub struct FaceExtractor {
    detector: Box<dyn FaceDetector>,
}

impl FaceExtractor {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    /// Crop out the first detected face region.
    ///
    /// A document with no detectable face is an informational condition,
    /// not a failure: field extraction proceeds regardless.
    pub fn extract(&mut self, crop: &RgbaImage) -> Result<Option<RgbaImage>> {
        let faces = self.detector.detect_faces(crop)?;

        let Some(region) = faces.first() else {
            info!("No face detected in the captured document region");
            return Ok(None);
        };

        let (crop_w, crop_h) = crop.dimensions();
        if region.x >= crop_w || region.y >= crop_h {
            info!("Detected face region lies outside the document crop; skipping");
            return Ok(None);
        }

        let width = region.width.min(crop_w - region.x);
        let height = region.height.min(crop_h - region.y);
        if width == 0 || height == 0 {
            info!("Detected face region is empty after clamping; skipping");
            return Ok(None);
        }

        Ok(Some(image::imageops::crop_imm(crop, region.x, region.y, width, height).to_image()))
    }
}
