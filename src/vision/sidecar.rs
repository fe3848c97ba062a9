//! JSON sidecar collaborators
//!
//! The text recognizer and face detector run out of process (typically a
//! PaddleOCR service and a Haar-cascade detector); their structured output
//! arrives as JSON files alongside the recorded frames.
//! Each capture consumes the next sidecar in sorted filename order, so a
//! replayed session pairs captures with sidecars one-to-one.
//!
//! A missing or unreadable sidecar is a recoverable condition: the capture
//! simply sees zero fragments (or faces) and the loop continues.

use anyhow::{Context, Result};
use image::RgbaImage;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::vision::face::{FaceDetector, FaceRegion};
use crate::vision::ocr::{TextFragment, TextRecognizer};

/// Suffix for OCR sidecar files
const OCR_SUFFIX: &str = ".ocr.json";
/// Suffix for face sidecar files
const FACE_SUFFIX: &str = ".faces.json";

#[derive(Debug, Deserialize)]
struct OcrSidecar {
    fragments: Vec<TextFragment>,
}

#[derive(Debug, Deserialize)]
struct FaceSidecar {
    faces: Vec<FaceRegion>,
}

/// Collect sidecar files with the given suffix, sorted by name
fn collect_sidecars(dir: &Path, suffix: &str) -> Result<VecDeque<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read sidecar directory {:?}", dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.ends_with(suffix))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    Ok(paths.into())
}

/// Read and parse one sidecar file, degrading to `None` on failure
fn read_sidecar<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read sidecar {:?}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Failed to parse sidecar {:?}: {}", path, e);
            None
        }
    }
}

/// Text recognizer backed by `*.ocr.json` sidecar files
pub struct SidecarRecognizer {
    files: VecDeque<PathBuf>,
    min_confidence: f32,
}

impl SidecarRecognizer {
    pub fn new(dir: &Path, min_confidence: f32) -> Result<Self> {
        let files = collect_sidecars(dir, OCR_SUFFIX)?;
        info!("Found {} OCR sidecar files in {:?}", files.len(), dir);

        Ok(Self { files, min_confidence })
    }
}

impl TextRecognizer for SidecarRecognizer {
    fn recognize(&mut self, _image: &RgbaImage) -> Result<Vec<TextFragment>> {
        let Some(path) = self.files.pop_front() else {
            info!("No OCR sidecar remaining for this capture");
            return Ok(vec![]);
        };

        let Some(sidecar) = read_sidecar::<OcrSidecar>(&path) else {
            return Ok(vec![]);
        };

        let total = sidecar.fragments.len();
        let fragments: Vec<TextFragment> = sidecar
            .fragments
            .into_iter()
            .filter(|f| f.confidence >= self.min_confidence)
            .collect();
        debug!(
            "Sidecar {:?}: {} fragments, {} above confidence {:.2}",
            path,
            total,
            fragments.len(),
            self.min_confidence
        );

        Ok(fragments)
    }
}

/// Face detector backed by `*.faces.json` sidecar files
pub struct SidecarFaceDetector {
    files: VecDeque<PathBuf>,
}

impl SidecarFaceDetector {
    pub fn new(dir: &Path) -> Result<Self> {
        let files = collect_sidecars(dir, FACE_SUFFIX)?;
        info!("Found {} face sidecar files in {:?}", files.len(), dir);

        Ok(Self { files })
    }
}

impl FaceDetector for SidecarFaceDetector {
    fn detect_faces(&mut self, _image: &RgbaImage) -> Result<Vec<FaceRegion>> {
        let Some(path) = self.files.pop_front() else {
            info!("No face sidecar remaining for this capture");
            return Ok(vec![]);
        };

        let Some(sidecar) = read_sidecar::<FaceSidecar>(&path) else {
            return Ok(vec![]);
        };

        Ok(sidecar.faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> RgbaImage {
        RgbaImage::new(4, 4)
    }

    #[test]
    fn test_recognizer_filters_by_confidence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("frame_01.ocr.json"),
            r#"{"fragments": [
                {"text": "JOHN SMITH", "polygon": [[0,0],[10,0],[10,5],[0,5]], "confidence": 0.92},
                {"text": "noise", "polygon": [[0,0],[1,0],[1,1],[0,1]], "confidence": 0.31}
            ]}"#,
        )
        .unwrap();

        let mut recognizer = SidecarRecognizer::new(dir.path(), 0.5).unwrap();
        let fragments = recognizer.recognize(&blank()).unwrap();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "JOHN SMITH");
    }

    #[test]
    fn test_recognizer_preserves_fragment_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("frame_01.ocr.json"),
            r#"{"fragments": [
                {"text": "first", "polygon": [[0,0],[1,0],[1,1],[0,1]], "confidence": 0.9},
                {"text": "second", "polygon": [[0,2],[1,2],[1,3],[0,3]], "confidence": 0.9},
                {"text": "third", "polygon": [[0,4],[1,4],[1,5],[0,5]], "confidence": 0.9}
            ]}"#,
        )
        .unwrap();

        let mut recognizer = SidecarRecognizer::new(dir.path(), 0.5).unwrap();
        let fragments = recognizer.recognize(&blank()).unwrap();

        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_recognizer_consumes_sidecars_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.ocr.json"),
            r#"{"fragments": [{"text": "B", "polygon": [[0,0],[1,0],[1,1],[0,1]], "confidence": 0.9}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.ocr.json"),
            r#"{"fragments": [{"text": "A", "polygon": [[0,0],[1,0],[1,1],[0,1]], "confidence": 0.9}]}"#,
        )
        .unwrap();

        let mut recognizer = SidecarRecognizer::new(dir.path(), 0.5).unwrap();
        assert_eq!(recognizer.recognize(&blank()).unwrap()[0].text, "A");
        assert_eq!(recognizer.recognize(&blank()).unwrap()[0].text, "B");
        assert!(recognizer.recognize(&blank()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_sidecar_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.ocr.json"), "{not json").unwrap();

        let mut recognizer = SidecarRecognizer::new(dir.path(), 0.5).unwrap();
        assert!(recognizer.recognize(&blank()).unwrap().is_empty());
    }

    #[test]
    fn test_face_sidecar_parsing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("frame_01.faces.json"),
            r#"{"faces": [{"x": 12, "y": 20, "width": 60, "height": 72}]}"#,
        )
        .unwrap();

        let mut detector = SidecarFaceDetector::new(dir.path()).unwrap();
        let faces = detector.detect_faces(&blank()).unwrap();

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0], FaceRegion { x: 12, y: 20, width: 60, height: 72 });
    }

    #[test]
    fn test_face_sidecar_exhaustion_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut detector = SidecarFaceDetector::new(dir.path()).unwrap();
        assert!(detector.detect_faces(&blank()).unwrap().is_empty());
    }
}
