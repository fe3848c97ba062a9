//! Shared session status published for display layers

use parking_lot::RwLock;
use std::sync::Arc;

use crate::capture::controller::CaptureState;

/// Live status of the capture session.
///
/// Display layers (an overlay, a status line) read this; nothing here
/// feeds back into capture decisions.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    /// Current state machine state
    pub state: CaptureState,
    /// Document fully inside the guide on the last frame
    pub aligned: bool,
    /// Sharpness score of the last frame
    pub sharpness: f64,
    /// Frames read so far
    pub frames_seen: u64,
    /// Records persisted so far
    pub records_saved: u64,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: CaptureState::Live,
            aligned: false,
            sharpness: 0.0,
            frames_seen: 0,
            records_saved: 0,
        }
    }
}

/// Handle to the shared status, cheap to clone across threads
pub type SharedStatus = Arc<RwLock<SessionStatus>>;

/// Create a fresh shared status handle
pub fn new_shared_status() -> SharedStatus {
    Arc::new(RwLock::new(SessionStatus::default()))
}
