//! Registry, camera and scheduler access for [`SceneEngine`].

use super::SceneEngine;
use crate::camera::{Camera, CameraMatrices};
use crate::options::Options;
use crate::registry::{
    CameraFeedRegistry, CovarianceRegistry, FrameDispatcher, ObjectRegistry,
    PointCloudRegistry, TrajectoryRegistry,
};
use crate::signal::{Connection, Signal};
use crate::worker::Scheduler;

// ── Registries ──

impl SceneEngine {
    /// Point clouds.
    #[must_use]
    pub fn point_clouds(&self) -> &PointCloudRegistry {
        &self.point_clouds
    }

    /// Point clouds, mutably.
    pub fn point_clouds_mut(&mut self) -> &mut PointCloudRegistry {
        &mut self.point_clouds
    }

    /// Object batches.
    #[must_use]
    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    /// Object batches, mutably.
    pub fn objects_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.objects
    }

    /// Trajectory batches.
    #[must_use]
    pub fn trajectories(&self) -> &TrajectoryRegistry {
        &self.trajectories
    }

    /// Trajectory batches, mutably.
    pub fn trajectories_mut(&mut self) -> &mut TrajectoryRegistry {
        &mut self.trajectories
    }

    /// Covariance batches.
    #[must_use]
    pub fn covariances(&self) -> &CovarianceRegistry {
        &self.covariances
    }

    /// Covariance batches, mutably.
    pub fn covariances_mut(&mut self) -> &mut CovarianceRegistry {
        &mut self.covariances
    }

    /// Camera feeds.
    #[must_use]
    pub fn camera_feeds(&self) -> &CameraFeedRegistry {
        &self.camera_feeds
    }

    /// Camera feeds, mutably.
    pub fn camera_feeds_mut(&mut self) -> &mut CameraFeedRegistry {
        &mut self.camera_feeds
    }

    /// Upload pending changes of every visible element in every registry.
    /// Returns how many elements updated successfully.
    pub fn update_all(&mut self) -> usize {
        self.point_clouds.update_all()
            + self.covariances.update_all()
            + self.objects.update_all()
            + self.trajectories.update_all()
            + self.camera_feeds.update_all()
    }

    /// Drop every element of every registry. Handles issued earlier become
    /// invalid; draw-order subscriptions stay in place.
    pub fn purge_all(&mut self) {
        self.point_clouds.purge();
        self.covariances.purge();
        self.objects.purge();
        self.trajectories.purge();
        self.camera_feeds.purge();
    }
}

// ── Camera ──

impl SceneEngine {
    /// The camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The camera, mutably. Every mutation republishes its matrices.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Call `callback` with the new matrices whenever the camera changes.
    pub fn connect_camera_updates(
        &self,
        callback: impl FnMut(&CameraMatrices) + 'static,
    ) -> Connection {
        self.camera.changed().connect(callback)
    }

    /// Window or framebuffer resized.
    pub fn resize(
        &mut self,
        window_width: u32,
        window_height: u32,
        frame_width: u32,
        frame_height: u32,
    ) {
        self.camera
            .set_resolution(window_width, window_height, frame_width, frame_height);
    }
}

// ── Frame loop ──

impl SceneEngine {
    /// Background job scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Background job scheduler, mutably (to submit work).
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Draw-order dispatcher, for host passes that must run between the
    /// built-in categories.
    #[must_use]
    pub fn dispatcher(&self) -> &FrameDispatcher {
        &self.dispatcher
    }

    /// Emitted at the start of every frame, after the camera refresh and
    /// before any draw.
    #[must_use]
    pub fn frame_started(&self) -> &Signal<()> {
        &self.frame_started
    }

    /// Smoothed frames per second over recent [`SceneEngine::frame`] calls.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.clock.fps()
    }

    /// Options the engine was built with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }
}
