//! Analysis Layer
//!
//! Turns recognized text fragments into structured identity records.

pub mod fields;

pub use fields::{FieldExtractor, IdentityRecord};
