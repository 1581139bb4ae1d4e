//! The scene facade: one camera, one vehicle pose and five registries
//! driven frame by frame.

mod accessors;

use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::camera::{Camera, CameraMatrices};
use crate::drawable::{DrawContext, FeedContext, PointCloudContext};
use crate::gpu::{Backend, Shader};
use crate::options::Options;
use crate::registry::{
    CameraFeedRegistry, CovarianceRegistry, DrawOrder, FrameDispatcher, ObjectRegistry,
    PointCloudRegistry, Registry, TrajectoryRegistry,
};
use crate::signal::Signal;
use crate::transform::SharedPose;
use crate::util::frame_clock::FrameClock;
use crate::worker::Scheduler;

/// Default eye position, behind and above the vehicle.
const DEFAULT_EYE: Vec3 = Vec3::new(-12.0, 0.0, 5.0);

/// What one call to [`SceneEngine::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Background jobs whose completion callbacks fired.
    pub completed_jobs: usize,
    /// Draw passes run by the dispatcher.
    pub draw_passes: usize,
}

/// Facade owning the camera, the vehicle frames, the worker scheduler and
/// one registry per drawable kind.
///
/// # Frame loop
///
/// The host sets the vehicle pose with
/// [`set_vehicle_pose`](Self::set_vehicle_pose) whenever it changes and
/// calls [`frame`](Self::frame) once per displayed frame:
///
/// 1. finished background jobs hand their results back,
/// 2. the camera rebuilds its view from the latest pose,
/// 3. [`SceneEngine::frame_started`] fires,
/// 4. every registry draws in [`DrawOrder`].
///
/// Everything here is single-threaded; only work submitted to the
/// [`Scheduler`] runs elsewhere.
pub struct SceneEngine {
    options: Options,
    vehicle: SharedPose,
    navigation: SharedPose,
    camera: Camera,
    dispatcher: FrameDispatcher,
    scheduler: Scheduler,
    frame_started: Signal<()>,
    clock: FrameClock,

    point_clouds: PointCloudRegistry,
    objects: ObjectRegistry,
    trajectories: TrajectoryRegistry,
    covariances: CovarianceRegistry,
    camera_feeds: CameraFeedRegistry,
}

impl SceneEngine {
    /// Engine drawing through `backend`, configured by `options`.
    #[must_use]
    pub fn new(backend: &Backend, options: Options) -> Self {
        let vehicle = SharedPose::identity();
        let navigation = SharedPose::identity();
        let camera = Camera::new(
            DEFAULT_EYE,
            Vec3::ZERO,
            Vec3::Z,
            vehicle.clone(),
            &options.camera,
        );
        let matrices = camera.shared_matrices();
        let dispatcher = FrameDispatcher::new();
        let scheduler = Scheduler::from_options(&options.workers);

        let context = |shader: &Rc<dyn Shader>| DrawContext {
            shader: Rc::clone(shader),
            buffers: Rc::clone(&backend.buffers),
            matrices: Rc::clone(&matrices),
        };
        let shaders = &backend.shaders;

        let mut point_clouds = Registry::new(PointCloudContext {
            draw: context(&shaders.point_cloud),
            defaults: options.point_cloud.clone(),
        });
        let mut objects = Registry::new(context(&shaders.objects));
        let mut trajectories = Registry::new(context(&shaders.trajectories));
        let mut covariances = Registry::new(context(&shaders.covariance));
        let mut camera_feeds = Registry::new(FeedContext {
            draw: context(&shaders.camera_feed),
            textures: Rc::clone(&backend.textures),
        });

        point_clouds.synchronize(&dispatcher, DrawOrder::PointClouds);
        covariances.synchronize(&dispatcher, DrawOrder::Covariance);
        objects.synchronize(&dispatcher, DrawOrder::Objects);
        trajectories.synchronize(&dispatcher, DrawOrder::Trajectories);
        camera_feeds.synchronize(&dispatcher, DrawOrder::Camera);

        log::info!(
            "scene engine ready ({} worker slot(s), {}x{} window)",
            scheduler.capacity(),
            options.camera.window_width,
            options.camera.window_height
        );

        Self {
            options,
            vehicle,
            navigation,
            camera,
            dispatcher,
            scheduler,
            frame_started: Signal::new(),
            clock: FrameClock::unlimited(),
            point_clouds,
            objects,
            trajectories,
            covariances,
            camera_feeds,
        }
    }

    /// Run one frame: poll background jobs, refresh the camera, then draw
    /// every category in order.
    pub fn frame(&mut self) -> FrameStats {
        let completed_jobs = if self.scheduler.all_finished() {
            0
        } else {
            self.scheduler.poll()
        };
        self.camera.update_view();
        let _ = self.frame_started.emit(&());
        let draw_passes = self.dispatcher.draw_frame();
        self.clock.end_frame();
        FrameStats {
            completed_jobs,
            draw_passes,
        }
    }

    /// Replace the vehicle pose seen by the camera and by every drawable
    /// attached to [`SceneEngine::vehicle`]. The navigation frame follows
    /// its translation.
    pub fn set_vehicle_pose(&mut self, pose: Mat4) {
        self.vehicle.set(pose);
        self.navigation
            .set(Mat4::from_translation(pose.transform_point3(Vec3::ZERO)));
    }

    /// Handle to the vehicle frame.
    #[must_use]
    pub fn vehicle(&self) -> SharedPose {
        self.vehicle.clone()
    }

    /// Handle to the navigation frame: the vehicle position without its
    /// rotation.
    #[must_use]
    pub fn navigation(&self) -> SharedPose {
        self.navigation.clone()
    }

    /// Latest published camera matrices.
    #[must_use]
    pub fn camera_matrices(&self) -> CameraMatrices {
        *self.camera.matrices()
    }

    /// Shared cell the drawables read the camera matrices from.
    #[must_use]
    pub fn shared_camera_matrices(&self) -> Rc<Cell<CameraMatrices>> {
        self.camera.shared_matrices()
    }
}
