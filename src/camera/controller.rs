use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat3, Mat4, Quat, Vec3};

use super::core::{flips_up, stationary, wrap_angle, CameraMatrices, Resolution, Zoom};
use crate::options::CameraOptions;
use crate::signal::Signal;
use crate::transform::{to_internal, SharedPose};

/// Zoom multiplier for one step in.
const ZOOM_IN_STEP: f32 = 0.9;
/// Zoom multiplier for one step out.
const ZOOM_OUT_STEP: f32 = 1.1;
/// Zoom applied by [`Camera::top_view`].
const TOP_VIEW_ZOOM: f32 = 3.75;

/// Camera that follows a vehicle frame and publishes its view/projection.
///
/// Position, target and up are stored in internal axes (see
/// [`crate::transform::to_internal`]); every setter takes vehicle-convention
/// coordinates. Every mutation rebuilds the matrices and emits
/// [`Camera::changed`].
///
/// Two orthogonal modes control how the vehicle pose is applied:
/// - **locked** (default): the camera rides the vehicle's full pose.
///   Unlocked, it rides the translation only and keeps its own heading.
/// - **fixed**: the camera stays at the vehicle position captured when
///   [`Camera::fix_view`] was enabled.
pub struct Camera {
    vehicle: SharedPose,
    options: CameraOptions,

    position: Vec3,
    target: Vec3,
    up: Vec3,
    rotation: Quat,
    translation: Vec3,
    fixed_translation: Vec3,

    zoom: f32,
    pitch: f32,
    yaw: f32,
    locked: bool,
    fixed: bool,

    resolution: Resolution,
    rotational_factor: (f32, f32),
    translational_factor: (f32, f32),

    matrices: CameraMatrices,
    shared: Rc<Cell<CameraMatrices>>,
    changed: Signal<CameraMatrices>,
}

impl Camera {
    /// Camera at `position` looking at `target`, riding `vehicle`.
    #[must_use]
    pub fn new(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        vehicle: SharedPose,
        options: &CameraOptions,
    ) -> Self {
        let resolution = Resolution::new(options.window_width, options.window_height);
        let mut camera = Self {
            vehicle,
            options: options.clone(),
            position: to_internal(position),
            target: to_internal(target),
            up: to_internal(up),
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
            fixed_translation: Vec3::ZERO,
            zoom: options.clamp_zoom(options.initial_zoom),
            pitch: 0.0,
            yaw: 0.0,
            locked: true,
            fixed: false,
            resolution,
            rotational_factor: (0.0, 0.0),
            translational_factor: (0.0, 0.0),
            matrices: CameraMatrices::default(),
            shared: Rc::new(Cell::new(CameraMatrices::default())),
            changed: Signal::new(),
        };
        camera.calculate_factors();
        camera.update_perspective(false);
        camera.update_view();
        camera
    }

    // ── Setters ──

    /// Move the base eye position. Resets rotation, zoom and panning.
    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = to_internal(Vec3::new(x, y, z));
        self.initialize(true);
        self.update_view();
    }

    /// Move the base target. Resets rotation, zoom and panning.
    pub fn set_target(&mut self, x: f32, y: f32, z: f32) {
        self.target = to_internal(Vec3::new(x, y, z));
        self.initialize(true);
        self.update_view();
    }

    /// Replace the up vector. Resets rotation and zoom but keeps panning.
    pub fn set_up(&mut self, x: f32, y: f32, z: f32) {
        self.up = to_internal(Vec3::new(x, y, z));
        self.initialize(false);
        self.update_view();
    }

    /// Set the zoom factor, clamped to the configured range. The view is
    /// rebuilt only when the clamped value differs from the current one.
    /// NaN is ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_nan() {
            log::debug!("ignoring NaN camera zoom");
            return;
        }
        let clamped = self.options.clamp_zoom(zoom);
        if clamped != self.zoom {
            self.zoom = clamped;
            self.update_view();
        }
    }

    /// One zoom step in (×0.9) or out (×1.1).
    pub fn zooming(&mut self, zooming_in: bool) {
        let step = if zooming_in {
            ZOOM_IN_STEP
        } else {
            ZOOM_OUT_STEP
        };
        self.set_zoom(self.zoom * step);
    }

    /// [`Camera::zooming`] with an explicit direction.
    pub fn zoom_by(&mut self, direction: Zoom) {
        self.zooming(direction == Zoom::In);
    }

    /// Replace the orbit rotation. Pitch and yaw are re-derived from the
    /// quaternion and wrapped to `[0, 2π)`.
    /// Zero-length or non-finite quaternions are ignored.
    pub fn rotate_camera(&mut self, rotation: Quat) {
        if !rotation.is_finite() || rotation.length_squared() <= f32::EPSILON {
            log::debug!("ignoring degenerate camera rotation {rotation:?}");
            return;
        }
        let rotation = rotation.normalize();
        let [x, y, z, w] = rotation.to_array();
        self.pitch = wrap_angle((2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y)));
        self.yaw = wrap_angle((2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin());
        self.rotation = rotation;
        self.update_view();
    }

    /// Add a pan offset (vehicle convention).
    pub fn translate_camera(&mut self, x: f32, y: f32, z: f32) {
        self.translation += to_internal(Vec3::new(x, y, z));
        self.update_view();
    }

    /// Mouse-drag handler. With `is_rotation` the drag orbits the camera;
    /// otherwise it pans. Locked, unfixed panning moves relative to the
    /// vehicle heading; every other mode pans relative to the camera.
    pub fn modify_camera(&mut self, dx: i32, dy: i32, is_rotation: bool) {
        let (dx, dy) = (dx as f32, dy as f32);
        if is_rotation {
            self.yaw = wrap_angle(self.yaw + self.rotational_factor.0 * dx);
            self.pitch = wrap_angle(self.pitch + self.rotational_factor.1 * dy);
            self.rotation = Quat::from_rotation_x(self.pitch) * Quat::from_rotation_y(self.yaw);
        } else {
            let delta = Vec3::new(
                -dx * self.translational_factor.0 * self.zoom,
                dy * self.translational_factor.1 * self.zoom,
                0.0,
            );
            self.translation += if self.locked && !self.fixed {
                Mat3::from_mat4(self.vehicle.get()) * delta
            } else {
                self.rotation * delta
            };
        }
        self.update_view();
    }

    // ── Presets and modes ──

    /// Look straight down from above the vehicle, forward pointing up on
    /// screen.
    pub fn top_view(&mut self) {
        self.position = to_internal(Vec3::new(0.0, 0.0, 12.0));
        self.target = Vec3::ZERO;
        self.up = to_internal(Vec3::X);
        self.initialize(true);
        self.zoom = self.options.clamp_zoom(TOP_VIEW_ZOOM);
        self.update_view();
    }

    /// Look at the vehicle from behind and above.
    pub fn isometric_view(&mut self) {
        self.position = to_internal(Vec3::new(-12.0, 0.0, 5.0));
        self.target = Vec3::ZERO;
        self.up = to_internal(Vec3::Z);
        self.initialize(true);
        self.update_view();
    }

    /// Freeze the camera at the vehicle's current position (`true`) or
    /// resume following it (`false`).
    pub fn fix_view(&mut self, fix: bool) {
        self.fixed = fix;
        self.fixed_translation = if fix {
            self.vehicle.origin()
        } else {
            Vec3::ZERO
        };
        self.update_view();
    }

    /// Follow the vehicle's full pose (`true`) or its translation only.
    pub fn lock_camera(&mut self, lock: bool) {
        self.locked = lock;
        self.update_view();
    }

    /// Update window and framebuffer sizes, recomputing the mouse factors
    /// and the projection.
    pub fn set_resolution(
        &mut self,
        window_width: u32,
        window_height: u32,
        frame_width: u32,
        frame_height: u32,
    ) {
        self.resolution = Resolution {
            window_width,
            window_height,
            frame_width,
            frame_height,
        };
        self.calculate_factors();
        self.update_perspective(true);
    }

    // ── Pipeline ──

    /// Rebuild the projection; with `multiply` also the combined matrices.
    pub fn update_perspective(&mut self, multiply: bool) {
        self.matrices.perspective = Mat4::perspective_rh(
            self.options.field_of_view,
            self.resolution.aspect(),
            self.options.near_plane,
            self.options.far_plane,
        );
        if multiply {
            self.multiply_matrices();
        }
    }

    /// Rebuild the view from the current state and vehicle pose. Call once
    /// per tick after the vehicle pose changes.
    pub fn update_view(&mut self) {
        let mut position = self.rotation * self.position;
        let mut target = self.rotation * self.target;

        if self.fixed {
            position += self.fixed_translation;
            target += self.fixed_translation;
        } else if self.locked {
            let vehicle = self.vehicle.get();
            position = vehicle.transform_point3(position);
            target = vehicle.transform_point3(target);
        } else {
            let origin = self.vehicle.origin();
            position += origin;
            target += origin;
        }

        position += self.translation;
        target += self.translation;

        let eye = (position - target) * self.zoom + target;
        let up = if flips_up(self.pitch) {
            -self.up
        } else {
            self.up
        };

        self.matrices.position = eye;
        self.matrices.target = target;
        self.matrices.up = up;
        self.matrices.view = Mat4::look_at_rh(eye, target, up);
        self.multiply_matrices();
    }

    fn multiply_matrices(&mut self) {
        let perspective = self.matrices.perspective;
        self.matrices.pv = perspective * self.matrices.view;
        self.matrices.static_pv = perspective * stationary(self.matrices.view);
        self.shared.set(self.matrices);
        let _ = self.changed.emit(&self.matrices);
    }

    fn initialize(&mut self, restart_translation: bool) {
        if restart_translation {
            self.translation = Vec3::ZERO;
        }
        self.fixed_translation = if self.fixed {
            self.vehicle.origin()
        } else {
            Vec3::ZERO
        };
        self.rotation = Quat::IDENTITY;
        self.zoom = self.options.clamp_zoom(self.options.initial_zoom);
        self.pitch = 0.0;
        self.yaw = 0.0;
    }

    fn calculate_factors(&mut self) {
        let (width_ratio, height_ratio) = self.resolution.pixel_ratio();
        let rotation = self.options.rotation_speed.to_radians();
        self.rotational_factor = (width_ratio * rotation, height_ratio * rotation);
        self.translational_factor = (
            width_ratio * self.options.translation_speed,
            height_ratio * self.options.translation_speed,
        );
    }

    // ── Accessors ──

    /// Current matrix snapshot.
    #[must_use]
    pub fn matrices(&self) -> &CameraMatrices {
        &self.matrices
    }

    /// Cell that always holds the latest snapshot. Drawables read it at
    /// draw time.
    #[must_use]
    pub fn shared_matrices(&self) -> Rc<Cell<CameraMatrices>> {
        Rc::clone(&self.shared)
    }

    /// Emitted with the new snapshot every time the matrices change.
    #[must_use]
    pub fn changed(&self) -> &Signal<CameraMatrices> {
        &self.changed
    }

    /// World-to-view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.matrices.view
    }

    /// Projection matrix.
    #[must_use]
    pub fn perspective_matrix(&self) -> Mat4 {
        self.matrices.perspective
    }

    /// `perspective * view`.
    #[must_use]
    pub fn pv_matrix(&self) -> Mat4 {
        self.matrices.pv
    }

    /// `perspective * view` without view translation.
    #[must_use]
    pub fn static_pv_matrix(&self) -> Mat4 {
        self.matrices.static_pv
    }

    /// Inverse of [`Camera::view_matrix`].
    #[must_use]
    pub fn inverse_view_matrix(&self) -> Mat4 {
        self.matrices.view.inverse()
    }

    /// Inverse of [`Camera::perspective_matrix`].
    #[must_use]
    pub fn inverse_perspective_matrix(&self) -> Mat4 {
        self.matrices.perspective.inverse()
    }

    /// Inverse of [`Camera::pv_matrix`].
    #[must_use]
    pub fn inverse_pv_matrix(&self) -> Mat4 {
        self.matrices.pv.inverse()
    }

    /// Eye position after zoom, internal axes.
    #[must_use]
    pub fn camera_position(&self) -> Vec3 {
        self.matrices.position
    }

    /// Look-at target, internal axes.
    #[must_use]
    pub fn camera_target(&self) -> Vec3 {
        self.matrices.target
    }

    /// Up vector in use (after the pitch flip), internal axes.
    #[must_use]
    pub fn camera_up(&self) -> Vec3 {
        self.matrices.up
    }

    /// Eye position relative to the target.
    #[must_use]
    pub fn relative_camera_position(&self) -> Vec3 {
        self.matrices.position - self.matrices.target
    }

    /// Current zoom factor.
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Orbit pitch in `[0, 2π)`.
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Orbit yaw in `[0, 2π)`.
    #[must_use]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Current orbit rotation.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Whether the camera follows the full vehicle pose.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether the camera is frozen at a captured vehicle position.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Current window/framebuffer sizes.
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The vehicle frame this camera rides.
    #[must_use]
    pub fn vehicle(&self) -> &SharedPose {
        &self.vehicle
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    use approx::assert_relative_eq;

    use super::*;

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::new(0.0, 1.0, 0.0),
            SharedPose::identity(),
            &CameraOptions::default(),
        )
    }

    #[test]
    fn pv_matches_standard_look_at() {
        let camera = camera();
        let options = CameraOptions::default();
        let perspective = Mat4::perspective_rh(
            options.field_of_view,
            1500.0 / 800.0,
            options.near_plane,
            options.far_plane,
        );
        let view = Mat4::look_at_rh(
            camera.camera_position(),
            camera.camera_target(),
            camera.camera_up(),
        );
        assert_eq!(camera.perspective_matrix(), perspective);
        assert_eq!(camera.view_matrix(), view);
        assert_eq!(camera.pv_matrix(), perspective * view);
        assert_eq!(camera.camera_position(), Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(camera.camera_up(), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn zoom_is_clamped_and_converges() {
        let mut camera = camera();
        let options = CameraOptions::default();
        for z in [-5.0, 0.0, 0.01, 1.0, 14.9, 100.0, f32::MAX] {
            camera.set_zoom(z);
            assert!((options.min_zoom..=options.max_zoom).contains(&camera.zoom()));
        }
        for _ in 0..200 {
            camera.zooming(true);
        }
        assert_eq!(camera.zoom(), options.min_zoom);
        camera.zoom_by(Zoom::Out);
        assert!(camera.zoom() > options.min_zoom);
    }

    #[test]
    fn nan_zoom_keeps_current_zoom() {
        let mut camera = camera();
        camera.set_zoom(2.0);
        camera.set_zoom(f32::NAN);
        assert_eq!(camera.zoom(), 2.0);
        assert!(camera.view_matrix().is_finite());
        camera.zoom_by(Zoom::In);
        assert!(camera.zoom().is_finite());
    }

    #[test]
    fn inverted_zoom_limits_do_not_panic() {
        let options = CameraOptions {
            min_zoom: 20.0,
            ..CameraOptions::default()
        };
        let mut camera = Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::new(0.0, 1.0, 0.0),
            SharedPose::identity(),
            &options,
        );
        assert_eq!(camera.zoom(), 15.0);
        camera.set_zoom(100.0);
        assert_eq!(camera.zoom(), 20.0);
        camera.zooming(true);
        assert!((15.0..=20.0).contains(&camera.zoom()));
    }

    #[test]
    fn unchanged_zoom_does_not_rebuild() {
        let mut camera = camera();
        let hits = Rc::new(Cell::new(0));
        let _connection = {
            let hits = hits.clone();
            camera.changed().connect(move |_| hits.set(hits.get() + 1))
        };
        camera.set_zoom(1.0);
        assert_eq!(hits.get(), 0);
        camera.set_zoom(2.0);
        assert_eq!(hits.get(), 1);
        camera.set_zoom(2.0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn zoom_interpolates_eye_toward_target() {
        let mut camera = camera();
        camera.set_zoom(0.5);
        assert_relative_eq!(camera.relative_camera_position().length(), 5.0, epsilon = 1e-5);
    }

    #[test]
    fn pitch_wraps_after_any_drag() {
        let mut camera = camera();
        for (dx, dy) in [(10, -4000), (-7, 9000), (3, -1), (0, 123_456), (-50, -77_777)] {
            camera.modify_camera(dx, dy, true);
            assert!((0.0..TAU).contains(&camera.pitch()));
            assert!((0.0..TAU).contains(&camera.yaw()));
        }
    }

    #[test]
    fn up_flips_between_quarter_and_three_quarter_turn() {
        let mut camera = camera();
        let base_up = camera.camera_up();

        camera.rotate_camera(Quat::from_rotation_x(FRAC_PI_2 + 0.1));
        assert_relative_eq!(camera.pitch(), FRAC_PI_2 + 0.1, epsilon = 1e-5);
        assert_eq!(camera.camera_up(), -base_up);

        camera.rotate_camera(Quat::from_rotation_x(0.2));
        assert_eq!(camera.camera_up(), base_up);

        camera.rotate_camera(Quat::from_rotation_x(-0.2));
        assert_relative_eq!(camera.pitch(), TAU - 0.2, epsilon = 1e-5);
        assert_eq!(camera.camera_up(), base_up);
    }

    #[test]
    fn up_flips_at_exact_boundaries() {
        let mut camera = camera();
        let base_up = camera.camera_up();

        camera.rotate_camera(Quat::from_rotation_x(FRAC_PI_2));
        assert_eq!(camera.camera_up(), if flips_up(camera.pitch()) { -base_up } else { base_up });
        assert_relative_eq!(camera.pitch(), FRAC_PI_2, epsilon = 1e-5);

        camera.rotate_camera(Quat::from_rotation_x(PI + FRAC_PI_2));
        assert_relative_eq!(camera.pitch(), PI + FRAC_PI_2, epsilon = 1e-5);
        assert_eq!(camera.camera_up(), if flips_up(camera.pitch()) { -base_up } else { base_up });

        camera.rotate_camera(Quat::from_rotation_x(PI));
        assert_eq!(camera.camera_up(), -base_up);
    }

    #[test]
    fn degenerate_rotation_is_ignored() {
        let mut camera = camera();
        camera.rotate_camera(Quat::from_rotation_x(0.4));
        let pitch = camera.pitch();
        let rotation = camera.rotation();
        let view = camera.view_matrix();

        for bad in [
            Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
            Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0),
            Quat::from_xyzw(0.0, f32::INFINITY, 0.0, 1.0),
        ] {
            camera.rotate_camera(bad);
            assert_eq!(camera.pitch(), pitch);
            assert_eq!(camera.rotation(), rotation);
            assert_eq!(camera.view_matrix(), view);
            assert!((0.0..TAU).contains(&camera.pitch()));
        }
    }

    #[test]
    fn set_position_resets_rotation_zoom_and_pan() {
        let mut camera = camera();
        camera.modify_camera(100, 50, true);
        camera.modify_camera(20, 20, false);
        camera.set_zoom(3.0);
        camera.set_position(0.0, 0.0, 20.0);

        assert_eq!(camera.rotation(), Quat::IDENTITY);
        assert_eq!(camera.zoom(), 1.0);
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(camera.camera_position(), Vec3::new(0.0, 20.0, 0.0));
    }

    #[test]
    fn set_up_keeps_pan() {
        let mut camera = camera();
        camera.translate_camera(1.0, 0.0, 0.0);
        let panned_target = camera.camera_target();
        camera.set_up(0.0, 1.0, 0.0);
        assert_eq!(camera.camera_target(), panned_target);
        camera.set_target(0.0, 0.0, 0.0);
        assert_eq!(camera.camera_target(), Vec3::ZERO);
    }

    #[test]
    fn locked_camera_follows_vehicle_rotation() {
        let vehicle = SharedPose::identity();
        let mut camera = Camera::new(
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::Z,
            vehicle.clone(),
            &CameraOptions::default(),
        );
        let heading = Mat4::from_rotation_y(FRAC_PI_2);
        vehicle.set(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)) * heading);
        camera.update_view();
        let locked_eye = camera.camera_position();
        assert_relative_eq!(camera.camera_target().x, 5.0, epsilon = 1e-5);

        camera.lock_camera(false);
        let unlocked_eye = camera.camera_position();
        assert!(!camera.is_locked());
        assert!((locked_eye - unlocked_eye).length() > 1.0);
        assert_relative_eq!(camera.camera_target().x, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn fixed_camera_ignores_vehicle_motion() {
        let vehicle = SharedPose::new(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        let mut camera = Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            vehicle.clone(),
            &CameraOptions::default(),
        );
        camera.fix_view(true);
        let frozen = camera.camera_target();
        vehicle.set(Mat4::from_translation(Vec3::new(50.0, 0.0, 0.0)));
        camera.update_view();
        assert_eq!(camera.camera_target(), frozen);

        camera.fix_view(false);
        assert!(!camera.is_fixed());
        assert_relative_eq!(camera.camera_target().x, 50.0, epsilon = 1e-5);
    }

    #[test]
    fn locked_pan_is_vehicle_relative() {
        let vehicle = SharedPose::new(Mat4::from_rotation_y(FRAC_PI_2));
        let mut camera = Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            vehicle,
            &CameraOptions::default(),
        );
        let before = camera.camera_target();
        camera.modify_camera(-10, 0, false);
        let moved = camera.camera_target() - before;
        // Pan of +x in camera space, turned a quarter around y by the vehicle.
        assert_relative_eq!(moved.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(moved.z.abs(), 0.2, epsilon = 1e-5);

        camera.lock_camera(false);
        let before = camera.camera_target();
        camera.modify_camera(-10, 0, false);
        let moved = camera.camera_target() - before;
        assert_relative_eq!(moved.x, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn presets_reset_state() {
        let mut camera = camera();
        camera.modify_camera(40, 40, true);
        camera.top_view();
        assert_eq!(camera.zoom(), 3.75);
        assert_eq!(camera.rotation(), Quat::IDENTITY);
        assert_relative_eq!(camera.camera_position().y, 45.0, epsilon = 1e-4);

        camera.isometric_view();
        assert_eq!(camera.zoom(), 1.0);
        assert_eq!(camera.camera_up(), Vec3::Y);
    }

    #[test]
    fn resolution_changes_projection_and_notifies() {
        let mut camera = camera();
        let shared = camera.shared_matrices();
        camera.set_resolution(800, 800, 1600, 1600);
        assert_eq!(camera.resolution().frame_width, 1600);
        assert_eq!(shared.get().perspective, camera.perspective_matrix());
        assert_relative_eq!(camera.perspective_matrix().x_axis.x, camera.perspective_matrix().y_axis.y, epsilon = 1e-6);
        let identity = camera.pv_matrix() * camera.inverse_pv_matrix();
        assert!(identity.abs_diff_eq(Mat4::IDENTITY, 1e-3));
        assert!((camera.view_matrix() * camera.inverse_view_matrix()).abs_diff_eq(Mat4::IDENTITY, 1e-4));
        assert!((camera.perspective_matrix() * camera.inverse_perspective_matrix()).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }
}
