//! Capture state machine
//!
//! Per-frame observation plus the strict capture gate: a trigger is honored
//! only when the document is fully inside the guide *and* the frame is
//! sharp enough, both evaluated against the current frame. A frame that was
//! aligned one tick ago and sharp now does not combine.

use imageproc::rect::Rect;

use crate::capture::frame::Frame;
use crate::vision::locator::{DocumentLocator, LocateResult};
use crate::vision::sharpness::sharpness;

/// States of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Continuously sampling frames
    Live,
    /// One extraction in progress for a captured frame
    Captured,
    /// Session stopped; resources released
    Terminated,
}

/// What the controller saw in one frame
#[derive(Debug, Clone)]
pub struct FrameObservation {
    /// Document location result against the guide
    pub locate: LocateResult,
    /// Focus score of the full frame
    pub sharpness: f64,
}

/// Outcome of gating one capture trigger
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Both gates passed; extraction may proceed
    Accepted,
    /// The document is not fully inside the guide
    Misaligned,
    /// Aligned, but the frame is below the sharpness threshold
    TooBlurry { sharpness: f64 },
}

/// Evaluate the capture gate for the current frame.
///
/// Alignment is checked before sharpness, and the threshold comparison is
/// inclusive: a score exactly at the threshold passes.
pub fn gate(inside: bool, sharpness: f64, threshold: f64) -> GateDecision {
    if !inside {
        GateDecision::Misaligned
    } else if sharpness < threshold {
        GateDecision::TooBlurry { sharpness }
    } else {
        GateDecision::Accepted
    }
}

/// Compute the fixed alignment guide, centered in the frame.
///
/// Derived once from the first frame's dimensions and never recomputed for
/// the rest of the session.
pub fn centered_guide(frame_width: u32, frame_height: u32, guide_width: u32, guide_height: u32) -> Rect {
    let left = frame_width as i32 / 2 - guide_width as i32 / 2;
    let top = frame_height as i32 / 2 - guide_height as i32 / 2;
    Rect::at(left, top).of_size(guide_width, guide_height)
}

/// Drives the capture state machine over live frames
pub struct CaptureController {
    locator: DocumentLocator,
    guide: Rect,
    sharpness_threshold: f64,
    state: CaptureState,
}

impl CaptureController {
    pub fn new(guide: Rect, locator: DocumentLocator, sharpness_threshold: f64) -> Self {
        Self {
            locator,
            guide,
            sharpness_threshold,
            state: CaptureState::Live,
        }
    }

    /// Current state machine state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The session's fixed alignment guide
    pub fn guide(&self) -> Rect {
        self.guide
    }

    /// Analyze one frame: locate the document and score the focus.
    ///
    /// Purely observational; no state change.
    pub fn observe(&self, frame: &Frame) -> FrameObservation {
        let gray = frame.to_gray();

        FrameObservation {
            locate: self.locator.locate(&gray, self.guide),
            sharpness: sharpness(&gray),
        }
    }

    /// Apply the capture gate to a trigger received this tick.
    ///
    /// Only called while `Live`. On acceptance the controller moves to
    /// `Captured` until [`CaptureController::extraction_finished`] is
    /// called. A rejected gate leaves it `Live`, ready for the next
    /// trigger; that implicit retry is the only retry the session does.
    pub fn try_capture(&mut self, observation: &FrameObservation) -> GateDecision {
        let decision = gate(
            observation.locate.inside,
            observation.sharpness,
            self.sharpness_threshold,
        );

        if decision == GateDecision::Accepted {
            self.state = CaptureState::Captured;
        }

        decision
    }

    /// Extraction for the captured frame has run to completion
    /// (successfully or not); resume live sampling
    pub fn extraction_finished(&mut self) {
        if self.state == CaptureState::Captured {
            self.state = CaptureState::Live;
        }
    }

    /// Stop the session for good
    pub fn terminate(&mut self) {
        self.state = CaptureState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::locator::LocateResult;

    fn observation(inside: bool, sharpness: f64) -> FrameObservation {
        FrameObservation {
            locate: LocateResult {
                inside,
                candidate: None,
            },
            sharpness,
        }
    }

    fn controller(threshold: f64) -> CaptureController {
        CaptureController::new(
            centered_guide(640, 480, 400, 250),
            DocumentLocator::new(),
            threshold,
        )
    }

    #[test]
    fn test_gate_threshold_is_inclusive() {
        assert_eq!(
            gate(true, 149.9, 150.0),
            GateDecision::TooBlurry { sharpness: 149.9 }
        );
        assert_eq!(gate(true, 150.0, 150.0), GateDecision::Accepted);
        assert_eq!(gate(true, 150.1, 150.0), GateDecision::Accepted);
    }

    #[test]
    fn test_gate_alignment_checked_first() {
        // A frame that is both misaligned and blurry reports misalignment
        assert_eq!(gate(false, 0.0, 150.0), GateDecision::Misaligned);
        assert_eq!(gate(false, 500.0, 150.0), GateDecision::Misaligned);
    }

    #[test]
    fn test_centered_guide_placement() {
        let guide = centered_guide(640, 480, 400, 250);
        assert_eq!(guide.left(), 120);
        assert_eq!(guide.top(), 115);
        assert_eq!(guide.width(), 400);
        assert_eq!(guide.height(), 250);
    }

    #[test]
    fn test_accepted_capture_enters_captured_state() {
        let mut ctl = controller(150.0);
        assert_eq!(ctl.state(), CaptureState::Live);

        let decision = ctl.try_capture(&observation(true, 200.0));
        assert_eq!(decision, GateDecision::Accepted);
        assert_eq!(ctl.state(), CaptureState::Captured);

        ctl.extraction_finished();
        assert_eq!(ctl.state(), CaptureState::Live);
    }

    #[test]
    fn test_rejected_capture_stays_live() {
        let mut ctl = controller(150.0);

        ctl.try_capture(&observation(false, 200.0));
        assert_eq!(ctl.state(), CaptureState::Live);

        ctl.try_capture(&observation(true, 10.0));
        assert_eq!(ctl.state(), CaptureState::Live);
    }

    #[test]
    fn test_terminate_is_terminal() {
        let mut ctl = controller(150.0);
        ctl.terminate();
        assert_eq!(ctl.state(), CaptureState::Terminated);

        ctl.extraction_finished();
        assert_eq!(ctl.state(), CaptureState::Terminated);
    }
}
