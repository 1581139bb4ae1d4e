// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// Tests may unwrap freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Real-time 3D visualization of vehicle and robotics sensor data.
//!
//! Sensorscope tracks point clouds, bounding objects, trajectories,
//! covariance ellipses and camera feeds in typed registries, composes each
//! element's transform with an externally owned vehicle pose, and draws
//! every category once per frame in a fixed order through a small set of
//! GPU contracts.
//!
//! # Key entry points
//!
//! - [`engine::SceneEngine`] - owns the camera, the registries and the
//!   worker scheduler, and runs one frame at a time
//! - [`registry::Registry`] - handle table shared by every drawable kind
//! - [`camera::Camera`] - vehicle-following view/projection pipeline
//! - [`worker::Scheduler`] - bounded background jobs with completion polling
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! Everything that touches drawables runs on one thread. Registries hand
//! out plain index handles and leave tombstones behind on delete, so a
//! handle never silently refers to a different element. Draw passes are
//! subscribed to a [`registry::FrameDispatcher`] stage, and element updates
//! can be subscribed to any [`signal::Signal`]. Work that is too slow for
//! the frame loop goes to the [`worker::Scheduler`], whose completion
//! callbacks fire on the polling thread.
//!
//! GPU access goes through the [`gpu::Shader`], [`gpu::Buffer`] and
//! [`gpu::Texture`] traits. [`gpu::headless`] records calls without a GPU;
//! [`gpu::wgpu_backend`] uploads through wgpu and replays draws into a
//! host-owned render pass.

pub mod camera;
pub mod drawable;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod options;
pub mod registry;
pub mod signal;
pub mod transform;
pub mod util;
pub mod worker;
