//! Capture Layer
//!
//! Live frame acquisition, the alignment/sharpness gate, and the capture
//! state machine that sequences detection, gating, cropping, and handoff
//! to the extractors.

pub mod camera;
pub mod controller;
pub mod frame;
pub mod session;
pub mod trigger;

pub use camera::{Camera, ImageSequenceCamera};
pub use controller::{CaptureController, CaptureState, GateDecision};
pub use frame::Frame;
pub use session::{run_session, CapturePipeline, SessionSummary};
pub use trigger::{stdin_triggers, TriggerEvent};
