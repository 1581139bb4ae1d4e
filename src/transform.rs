//! Primary/secondary model transforms and the internal axis convention.
//!
//! Sensor data arrives in a vehicle convention (x forward, y left, z up).
//! Everything on the GPU side uses an internal convention where a vehicle
//! vector `(x, y, z)` becomes `(-y, z, -x)`. Conversions live here so the
//! remap is written exactly once.

use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat4, Vec3};

/// Convert a vehicle-convention vector into the internal axis convention.
#[inline]
#[must_use]
pub fn to_internal(v: Vec3) -> Vec3 {
    Vec3::new(-v.y, v.z, -v.x)
}

/// Inverse of [`to_internal`].
#[inline]
#[must_use]
pub fn from_internal(v: Vec3) -> Vec3 {
    Vec3::new(-v.z, -v.x, v.y)
}

/// A pose matrix owned outside the drawable (typically the vehicle frame)
/// and observed by reference.
///
/// Cloning the handle shares the same cell: whoever owns the pose calls
/// [`SharedPose::set`] once per tick and every drawable or camera holding a
/// clone sees the new matrix on its next draw.
#[derive(Clone, Debug, Default)]
pub struct SharedPose(Rc<Cell<Mat4>>);

impl SharedPose {
    /// Pose initialised to `matrix`.
    #[must_use]
    pub fn new(matrix: Mat4) -> Self {
        Self(Rc::new(Cell::new(matrix)))
    }

    /// Pose initialised to the identity.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY)
    }

    /// Current matrix.
    #[must_use]
    pub fn get(&self) -> Mat4 {
        self.0.get()
    }

    /// Replace the matrix seen by every holder of this pose.
    pub fn set(&self, matrix: Mat4) {
        self.0.set(matrix);
    }

    /// Translation part of the pose (the frame origin).
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        self.get().transform_point3(Vec3::ZERO)
    }

    /// Whether two handles observe the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Model transform of a drawable: an optional externally owned primary
/// pose composed with a locally accumulated secondary matrix.
#[derive(Clone, Debug)]
pub struct Transform {
    primary: Option<SharedPose>,
    secondary: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transform {
    /// Transform following `primary` (identity when `None`).
    #[must_use]
    pub fn new(primary: Option<SharedPose>) -> Self {
        Self {
            primary,
            secondary: Mat4::IDENTITY,
        }
    }

    /// Swap the externally owned pose; `None` falls back to identity.
    pub fn set_primary(&mut self, primary: Option<SharedPose>) {
        self.primary = primary;
    }

    /// The externally owned pose, if any.
    #[must_use]
    pub fn primary(&self) -> Option<&SharedPose> {
        self.primary.as_ref()
    }

    /// Primary matrix, or identity when no pose is attached.
    #[must_use]
    pub fn primary_matrix(&self) -> Mat4 {
        self.primary.as_ref().map_or(Mat4::IDENTITY, SharedPose::get)
    }

    /// Locally accumulated matrix.
    #[must_use]
    pub fn secondary_matrix(&self) -> Mat4 {
        self.secondary
    }

    /// Matrix handed to the renderer: `primary * secondary`.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        self.primary_matrix() * self.secondary
    }

    /// Translate in the secondary (local) frame.
    pub fn translate(&mut self, offset: Vec3) {
        self.secondary *= Mat4::from_translation(offset);
    }

    /// Rotate by `pitch` (x), `yaw` (y) and `roll` (z), radians, applied in
    /// that order in the local frame.
    pub fn rotate(&mut self, pitch: f32, yaw: f32, roll: f32) {
        self.secondary *= Mat4::from_rotation_x(pitch)
            * Mat4::from_rotation_y(yaw)
            * Mat4::from_rotation_z(roll);
    }

    /// Rotate about the local x axis.
    pub fn rotate_x(&mut self, angle: f32) {
        self.secondary *= Mat4::from_rotation_x(angle);
    }

    /// Rotate about the local y axis.
    pub fn rotate_y(&mut self, angle: f32) {
        self.secondary *= Mat4::from_rotation_y(angle);
    }

    /// Rotate about the local z axis.
    pub fn rotate_z(&mut self, angle: f32) {
        self.secondary *= Mat4::from_rotation_z(angle);
    }

    /// Drop every local translate/rotate.
    pub fn reset_secondary(&mut self) {
        self.secondary = Mat4::IDENTITY;
    }
}
