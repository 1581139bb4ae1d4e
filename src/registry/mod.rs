//! Handle tables for drawables and the per-frame draw order.
//!
//! One generic [`Registry`] serves every drawable kind; the aliases below
//! name the five instantiations the engine owns. Each registry subscribes
//! its bulk draw to a [`FrameDispatcher`] stage so categories are always
//! drawn in the same [`DrawOrder`].

/// Fixed per-frame draw stages.
pub mod dispatcher;
/// The generic element table.
pub mod table;

pub use dispatcher::{DrawOrder, FrameDispatcher};
pub use table::{Handle, Registry};

use crate::drawable::{CameraFeed, CovarianceBatch, ObjectBatch, PointCloud, TrajectoryBatch};

/// Registry of point clouds.
pub type PointCloudRegistry = Registry<PointCloud>;
/// Registry of object batches.
pub type ObjectRegistry = Registry<ObjectBatch>;
/// Registry of trajectory batches.
pub type TrajectoryRegistry = Registry<TrajectoryBatch>;
/// Registry of covariance batches.
pub type CovarianceRegistry = Registry<CovarianceBatch>;
/// Registry of camera feeds.
pub type CameraFeedRegistry = Registry<CameraFeed>;
