//! Vehicle-following camera.
//!
//! Produces view, projection and combined matrices from an orbit rotation,
//! a zoom factor, pan offsets and the current vehicle pose, and notifies
//! observers whenever they change.

/// The camera state machine and its mutators.
pub mod controller;
/// Published matrix snapshot and helper types.
pub mod core;

pub use controller::Camera;
pub use self::core::{CameraMatrices, Resolution, Zoom};
