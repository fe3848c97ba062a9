//! Text-recognition interface
//!
//! The recognition engine itself is an external collaborator; the pipeline
//! only consumes its structured output.

use anyhow::Result;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Single recognized text span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFragment {
    /// Recognized text
    pub text: String,
    /// Bounding polygon corner points
    pub polygon: [(f32, f32); 4],
    /// Recognition confidence in [0, 1]
    pub confidence: f32,
}

/// Text-recognition engine capability.
///
/// Implementations must return fragments in the engine's natural reading
/// order and pre-filter low-confidence results; the field mapper depends on
/// that order to disambiguate date fields.
pub trait TextRecognizer {
    fn recognize(&mut self, image: &RgbaImage) -> Result<Vec<TextFragment>>;
}
