//! Demo binary rendering synthetic sensor data with sensorscope.

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Mat2, Mat4, Quat, Vec3};
use rand::Rng;
use sensorscope::drawable::{
    ColorMode, Covariance, LineType, Object, PointCloudData, PointXyzi, Shape,
    TrajectoryVertex,
};
use sensorscope::engine::SceneEngine;
use sensorscope::gpu::headless::HeadlessBackend;
use sensorscope::gpu::ImageFile;
use sensorscope::options::Options;

/// Frames simulated when no count is given.
const DEFAULT_FRAMES: usize = 120;
/// Radius of the simulated drive, m.
const DRIVE_RADIUS: f32 = 20.0;

/// One synthetic lidar sweep around the vehicle.
fn lidar_sweep(points: usize) -> PointCloudData {
    let mut rng = rand::rng();
    let sweep: Vec<PointXyzi> = (0..points)
        .map(|_| {
            let angle = rng.random_range(0.0..TAU);
            let range = rng.random_range(2.0..60.0_f32);
            PointXyzi {
                position: Vec3::new(
                    range * angle.cos(),
                    range * angle.sin(),
                    rng.random_range(-1.5..3.0),
                ),
                intensity: rng.random_range(0.0..100.0),
            }
        })
        .collect();
    PointCloudData::Xyzi(sweep.into())
}

fn parked_cars() -> Arc<[Object]> {
    (0..6)
        .map(|i| Object {
            position: Vec3::new(8.0 + 6.0 * i as f32, 4.0, 0.75),
            orientation: Quat::from_rotation_z(0.1 * i as f32),
            color: [40.0, 140.0, 255.0, 200.0],
            width: 1.8,
            length: 4.5,
            height: 1.5,
            ..Object::default()
        })
        .collect()
}

fn planned_path() -> Arc<[Vec<TrajectoryVertex>]> {
    let line: Vec<TrajectoryVertex> = (0..40)
        .map(|i| TrajectoryVertex {
            position: Vec3::new(i as f32, 0.02 * (i * i) as f32, 0.0),
            color: [255.0, 200.0, 0.0, 255.0],
            line_width: 0.3,
            ..TrajectoryVertex::default()
        })
        .collect();
    Arc::from(vec![line])
}

fn gps_uncertainty() -> Arc<[Covariance]> {
    Arc::from(vec![Covariance {
        matrix: Mat2::from_cols_array(&[0.8, 0.2, 0.2, 0.5]),
        position: Vec3::ZERO,
    }])
}

fn vehicle_pose(frame: usize) -> Mat4 {
    let heading = frame as f32 * 0.01;
    Mat4::from_rotation_translation(
        Quat::from_rotation_z(heading + std::f32::consts::FRAC_PI_2),
        Vec3::new(DRIVE_RADIUS * heading.cos(), DRIVE_RADIUS * heading.sin(), 0.0),
    )
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let options = args
        .next()
        .map_or_else(Options::default, |path| Options::load_or_default(Path::new(&path)));
    let frames = args
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let headless = HeadlessBackend::new();
    let mut engine = SceneEngine::new(&headless.backend(), options);
    let vehicle = Some(engine.vehicle());
    let navigation = Some(engine.navigation());

    let lidar = engine
        .point_clouds_mut()
        .add(lidar_sweep(20_000), "lidar", vehicle.clone(), true);
    let _ = engine.point_clouds_mut().modify(lidar, |cloud| {
        cloud.set_color_mode(ColorMode::ColorMap);
        let _ = cloud.set_point_size(2.0);
    });
    let cars = engine
        .objects_mut()
        .add(parked_cars(), "parked cars", navigation, true);
    let _ = engine
        .objects_mut()
        .modify(cars, |batch| batch.set_shape(Shape::Box));
    let path = engine
        .trajectories_mut()
        .add(planned_path(), "planned path", vehicle.clone(), true);
    let _ = engine
        .trajectories_mut()
        .modify(path, |batch| batch.set_line_type(LineType::Dashed));
    let _ = engine
        .covariances_mut()
        .add(gps_uncertainty(), "gps", vehicle, true);
    let _ = engine.camera_feeds_mut().add(
        ImageFile::new(64, 36, 3, vec![96_u8; 64 * 36 * 3]),
        "front camera",
        None,
        true,
    );

    let pending: Rc<RefCell<Option<PointCloudData>>> = Rc::new(RefCell::new(None));
    let mut scans = 0;
    for frame in 0..frames {
        engine.set_vehicle_pose(vehicle_pose(frame));

        if frame % 10 == 0 {
            let slot = Rc::clone(&pending);
            engine.scheduler_mut().submit_task(
                || lidar_sweep(20_000),
                move |sweep| *slot.borrow_mut() = Some(sweep),
            );
        }
        let _ = engine.update_all();
        let stats = engine.frame();

        if let Some(sweep) = pending.borrow_mut().take() {
            let _ = engine.point_clouds_mut().change_input(lidar, sweep);
            scans += 1;
        }
        log::debug!(
            "frame {frame}: {} draw pass(es), {} job(s) completed",
            stats.draw_passes,
            stats.completed_jobs
        );
    }

    log::info!(
        "{frames} frames, {scans} lidar scan(s) swapped in, {} draw call(s), {} upload(s), {:.0} fps",
        headless.buffers.total_draws(),
        headless.buffers.total_uploads(),
        engine.fps()
    );
}
