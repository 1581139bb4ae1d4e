//! Shared utilities for the application loop.

/// Frame pacing and FPS estimate.
pub mod frame_clock;
