//! Vision Layer
//!
//! Frame analysis: document outline detection, focus scoring, and the
//! interfaces to the external text-recognition and face-detection
//! collaborators.

pub mod face;
pub mod locator;
pub mod ocr;
pub mod sharpness;
pub mod sidecar;

pub use face::{FaceDetector, FaceExtractor, FaceRegion};
pub use locator::{DocumentCandidate, DocumentLocator, LocateResult, LocatorConfig};
pub use ocr::{TextFragment, TextRecognizer};
pub use sharpness::sharpness;
pub use sidecar::{SidecarFaceDetector, SidecarRecognizer};
