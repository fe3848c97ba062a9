//! Capture session loop and the per-capture extraction pipeline
//!
//! One synchronous loop: acquire frame, analyze, poll for a trigger, act.
//! All recoverable conditions (misaligned, blurry, no face, incomplete
//! fields, duplicate record) are handled where they occur and the loop
//! continues; only camera and store failures end the session.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};
use image::RgbaImage;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::analysis::fields::{FieldExtractor, IdentityRecord};
use crate::capture::camera::Camera;
use crate::capture::controller::{centered_guide, CaptureController, CaptureState, GateDecision};
use crate::capture::trigger::TriggerEvent;
use crate::config::AppConfig;
use crate::shared::state::SharedStatus;
use crate::storage::database::{RecordStore, StoreError};
use crate::vision::face::FaceExtractor;
use crate::vision::locator::{DocumentLocator, LocatorConfig};
use crate::vision::ocr::TextRecognizer;

/// Extraction stages run for each accepted capture.
///
/// Face extraction and persistence are optional capabilities, so one
/// pipeline covers every deployment variant (with or without a face
/// artifact, with or without a database).
pub struct CapturePipeline {
    recognizer: Box<dyn TextRecognizer>,
    fields: FieldExtractor,
    face: Option<(FaceExtractor, PathBuf)>,
    store: Option<RecordStore>,
}

/// What one capture produced
#[derive(Debug)]
pub struct ProcessReport {
    /// A face image was extracted and written
    pub face_saved: bool,
    /// The extracted (possibly partial) record
    pub record: IdentityRecord,
    /// The record was persisted to the store
    pub persisted: bool,
}

impl CapturePipeline {
    pub fn new(recognizer: Box<dyn TextRecognizer>, fields: FieldExtractor) -> Self {
        Self {
            recognizer,
            fields,
            face: None,
            store: None,
        }
    }

    /// Enable the face side channel, writing the artifact to `output`
    pub fn with_face_extraction(mut self, extractor: FaceExtractor, output: PathBuf) -> Self {
        self.face = Some((extractor, output));
        self
    }

    /// Enable persistence of completed records
    pub fn with_store(mut self, store: RecordStore) -> Self {
        self.store = Some(store);
        self
    }

    /// The store, when persistence is enabled
    pub fn store(&self) -> Option<&RecordStore> {
        self.store.as_ref()
    }

    /// Run face and field extraction for one cropped document.
    ///
    /// The face channel is best-effort and never blocks field extraction.
    pub fn process(&mut self, crop: &RgbaImage) -> ProcessReport {
        let mut report = ProcessReport {
            face_saved: false,
            record: IdentityRecord::default(),
            persisted: false,
        };

        if let Some((extractor, output)) = &mut self.face {
            match extractor.extract(crop) {
                Ok(Some(face)) => match face.save(output.as_path()) {
                    Ok(()) => {
                        info!("Face extracted and saved to {:?}", output);
                        report.face_saved = true;
                    }
                    Err(e) => warn!("Failed to save face image to {:?}: {}", output, e),
                },
                Ok(None) => {}
                Err(e) => warn!("Face detection failed: {}", e),
            }
        }

        let fragments = match self.recognizer.recognize(crop) {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!("Text recognition failed: {}", e);
                Vec::new()
            }
        };
        debug!("Recognizer returned {} fragments", fragments.len());
        for fragment in &fragments {
            debug!(
                "Fragment {:?} (confidence {:.2})",
                fragment.text, fragment.confidence
            );
        }

        let record = self.fields.extract(&fragments);
        info!("Extracted fields: {:?}", record);

        if record.is_complete() {
            if let Some(store) = &self.store {
                match store.insert(&record) {
                    Ok(()) => {
                        info!(
                            "Record {} saved to database",
                            record.identity_number.as_deref().unwrap_or("?")
                        );
                        report.persisted = true;
                    }
                    Err(StoreError::Duplicate { identity_number }) => {
                        warn!(
                            "CNIC {} already exists in the database; skipping insertion",
                            identity_number
                        );
                    }
                    Err(e) => warn!("Failed to persist record: {}", e),
                }
            }
        } else {
            warn!(
                "Some fields are missing ({}); skipping database insertion",
                record.missing_fields().join(", ")
            );
        }

        report.record = record;
        report
    }
}

/// Counters for a finished session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames read from the camera
    pub frames: u64,
    /// Captures that passed the gate
    pub captures: u64,
    /// Records persisted to the store
    pub records_saved: u64,
}

/// Run the capture loop until quit or end of stream.
///
/// The camera and the pipeline (including the store handle) are owned by
/// the session and dropped on every exit path, normal or fatal.
pub fn run_session(
    mut camera: Box<dyn Camera>,
    triggers: Receiver<TriggerEvent>,
    config: &AppConfig,
    mut pipeline: CapturePipeline,
    status: SharedStatus,
) -> Result<SessionSummary> {
    let mut controller: Option<CaptureController> = None;
    let mut summary = SessionSummary::default();

    loop {
        let frame = camera.next_frame().context("Camera read failed")?;
        let Some(frame) = frame else {
            info!("End of frame stream");
            break;
        };
        summary.frames += 1;

        // The guide is fixed from the first frame's dimensions
        let controller = controller.get_or_insert_with(|| {
            let guide = centered_guide(
                frame.width,
                frame.height,
                config.guide.width,
                config.guide.height,
            );
            info!(
                "Alignment guide fixed at ({}, {}) size {}x{}",
                guide.left(),
                guide.top(),
                guide.width(),
                guide.height()
            );

            CaptureController::new(
                guide,
                DocumentLocator::with_config(LocatorConfig {
                    blur_sigma: config.capture.blur_sigma,
                    canny_low: config.capture.canny_low,
                    canny_high: config.capture.canny_high,
                    approx_tolerance: config.capture.approx_tolerance,
                    inset: config.guide.inset,
                }),
                config.capture.sharpness_threshold,
            )
        });

        let observation = controller.observe(&frame);
        debug!(
            "Frame {}: aligned={} sharpness={:.2}",
            summary.frames, observation.locate.inside, observation.sharpness
        );

        {
            let mut s = status.write();
            s.state = controller.state();
            s.aligned = observation.locate.inside;
            s.sharpness = observation.sharpness;
            s.frames_seen = summary.frames;
        }

        // At most one trigger event per tick, mirroring a keypress poll
        match triggers.try_recv() {
            Ok(TriggerEvent::Quit) => {
                info!("Quit requested");
                controller.terminate();
                break;
            }
            Ok(TriggerEvent::Capture) => match controller.try_capture(&observation) {
                GateDecision::Misaligned => {
                    warn!("Document not fully inside the guide; adjust position before capturing");
                }
                GateDecision::TooBlurry { sharpness } => {
                    warn!(
                        "Capture too blurry (sharpness {:.2} < {:.2}); please try again",
                        sharpness, config.capture.sharpness_threshold
                    );
                }
                GateDecision::Accepted => {
                    info!(
                        "Document aligned, sharpness {:.2}; capturing",
                        observation.sharpness
                    );
                    status.write().state = controller.state();

                    let crop = frame.crop(controller.guide());
                    let report = pipeline.process(&crop);

                    summary.captures += 1;
                    if report.persisted {
                        summary.records_saved += 1;
                    }

                    controller.extraction_finished();
                    let mut s = status.write();
                    s.state = controller.state();
                    s.records_saved = summary.records_saved;
                }
            },
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                info!("Trigger source closed; stopping session");
                controller.terminate();
                break;
            }
        }
    }

    status.write().state = CaptureState::Terminated;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::Frame;
    use crate::shared::state::new_shared_status;
    use crate::vision::face::{FaceDetector, FaceRegion};
    use crate::vision::ocr::TextFragment;
    use image::Rgba;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Camera that replays the same frame a fixed number of times
    struct FrameLoop {
        frame: Frame,
        remaining: usize,
    }

    impl Camera for FrameLoop {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(self.frame.clone()))
        }
    }

    /// Recognizer that counts invocations and returns fixed fragments
    struct CountingRecognizer {
        calls: Arc<AtomicUsize>,
        fragments: Vec<TextFragment>,
    }

    impl TextRecognizer for CountingRecognizer {
        fn recognize(&mut self, _image: &RgbaImage) -> Result<Vec<TextFragment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.fragments.clone())
        }
    }

    struct NoFaces;

    impl FaceDetector for NoFaces {
        fn detect_faces(&mut self, _image: &RgbaImage) -> Result<Vec<FaceRegion>> {
            Ok(vec![])
        }
    }

    fn fragment(text: &str) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            polygon: [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            confidence: 0.9,
        }
    }

    fn golden_fragments() -> Vec<TextFragment> {
        [
            "JOHN SMITH",
            "Father Name",
            "ROBERT SMITH",
            "M",
            "Pakistan",
            "12345-1234567-1",
            "01.01.1990",
            "02.02.2015",
            "03.03.2025",
        ]
        .iter()
        .map(|t| fragment(t))
        .collect()
    }

    /// 320x240 frame with a white card centered in the guide region
    fn aligned_frame() -> Frame {
        let mut img = RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]));
        draw_filled_rect_mut(
            &mut img,
            Rect::at(100, 80).of_size(120, 80),
            Rgba([255, 255, 255, 255]),
        );
        Frame::new(img.into_raw(), 320, 240)
    }

    /// Frame with no detectable quadrilateral at all
    fn blank_frame() -> Frame {
        let img = RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]));
        Frame::new(img.into_raw(), 320, 240)
    }

    /// Config with a 200x150 guide so the test card sits inside it
    fn test_config(sharpness_threshold: f64) -> AppConfig {
        let mut config = AppConfig::default();
        config.guide.width = 200;
        config.guide.height = 150;
        config.capture.sharpness_threshold = sharpness_threshold;
        config
    }

    fn triggers(events: &[TriggerEvent]) -> Receiver<TriggerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for &event in events {
            tx.send(event).unwrap();
        }
        rx
    }

    fn pipeline_with(
        calls: &Arc<AtomicUsize>,
        fragments: Vec<TextFragment>,
        store: Option<RecordStore>,
    ) -> CapturePipeline {
        let recognizer = CountingRecognizer {
            calls: Arc::clone(calls),
            fragments,
        };
        let mut pipeline = CapturePipeline::new(
            Box::new(recognizer),
            FieldExtractor::new("Pakistan"),
        );
        if let Some(store) = store {
            pipeline = pipeline.with_store(store);
        }
        pipeline
    }

    #[test]
    fn test_misaligned_trigger_never_reaches_extractors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let camera = FrameLoop {
            frame: blank_frame(),
            remaining: 4,
        };

        let summary = run_session(
            Box::new(camera),
            triggers(&[TriggerEvent::Capture, TriggerEvent::Quit]),
            &test_config(1.0),
            pipeline_with(&calls, golden_fragments(), None),
            new_shared_status(),
        )
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(summary.captures, 0);
    }

    #[test]
    fn test_blurry_trigger_never_reaches_extractors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let camera = FrameLoop {
            frame: aligned_frame(),
            remaining: 4,
        };

        // Threshold no real frame can meet
        let summary = run_session(
            Box::new(camera),
            triggers(&[TriggerEvent::Capture, TriggerEvent::Quit]),
            &test_config(1e12),
            pipeline_with(&calls, golden_fragments(), None),
            new_shared_status(),
        )
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(summary.captures, 0);
    }

    #[test]
    fn test_accepted_capture_extracts_and_persists() {
        let calls = Arc::new(AtomicUsize::new(0));
        let camera = FrameLoop {
            frame: aligned_frame(),
            remaining: 4,
        };
        let store = RecordStore::open_in_memory().unwrap();

        let summary = run_session(
            Box::new(camera),
            triggers(&[TriggerEvent::Capture, TriggerEvent::Quit]),
            &test_config(1.0),
            pipeline_with(&calls, golden_fragments(), Some(store)),
            new_shared_status(),
        )
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.captures, 1);
        assert_eq!(summary.records_saved, 1);
    }

    #[test]
    fn test_duplicate_capture_is_warned_not_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let camera = FrameLoop {
            frame: aligned_frame(),
            remaining: 6,
        };
        let store = RecordStore::open_in_memory().unwrap();

        // Two captures of the same card: second insert conflicts
        let summary = run_session(
            Box::new(camera),
            triggers(&[
                TriggerEvent::Capture,
                TriggerEvent::Capture,
                TriggerEvent::Quit,
            ]),
            &test_config(1.0),
            pipeline_with(&calls, golden_fragments(), Some(store)),
            new_shared_status(),
        )
        .unwrap();

        assert_eq!(summary.captures, 2);
        assert_eq!(summary.records_saved, 1);
    }

    #[test]
    fn test_incomplete_record_not_persisted() {
        let store = RecordStore::open_in_memory().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = pipeline_with(
            &calls,
            vec![fragment("JOHN SMITH"), fragment("M")],
            Some(store),
        );

        let crop = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let report = pipeline.process(&crop);

        assert!(!report.record.is_complete());
        assert!(!report.persisted);
        assert_eq!(pipeline.store().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_face_channel_failure_does_not_block_fields() {
        let store = RecordStore::open_in_memory().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let output = tempfile::tempdir().unwrap();

        let mut pipeline = pipeline_with(&calls, golden_fragments(), Some(store))
            .with_face_extraction(
                FaceExtractor::new(Box::new(NoFaces)),
                output.path().join("face.png"),
            );

        let crop = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let report = pipeline.process(&crop);

        assert!(!report.face_saved);
        assert!(report.persisted, "field extraction must proceed without a face");
    }

    #[test]
    fn test_session_ends_at_stream_end_without_quit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let camera = FrameLoop {
            frame: blank_frame(),
            remaining: 3,
        };
        let (_tx, rx) = crossbeam_channel::unbounded();

        let summary = run_session(
            Box::new(camera),
            rx,
            &test_config(1.0),
            pipeline_with(&calls, vec![], None),
            new_shared_status(),
        )
        .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.captures, 0);
    }
}
