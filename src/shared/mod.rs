//! State shared between the capture loop and display layers

pub mod state;

pub use state::{new_shared_status, SessionStatus, SharedStatus};
