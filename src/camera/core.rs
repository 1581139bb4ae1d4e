use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat3, Mat4, Vec3};

/// Snapshot of every matrix and vector the camera publishes.
///
/// Written only by the camera; drawables and other observers read copies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// World-to-view transform.
    pub view: Mat4,
    /// View-to-clip transform.
    pub perspective: Mat4,
    /// `perspective * view`.
    pub pv: Mat4,
    /// `perspective * view` with the view translation removed, for
    /// geometry that must stay centred on the eye (skybox, horizon).
    pub static_pv: Mat4,
    /// Eye position after zoom, internal axes.
    pub position: Vec3,
    /// Look-at target, internal axes.
    pub target: Vec3,
    /// Up vector used for the view, internal axes.
    pub up: Vec3,
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            perspective: Mat4::IDENTITY,
            pv: Mat4::IDENTITY,
            static_pv: Mat4::IDENTITY,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

/// Window and framebuffer size used for projection and mouse factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Window width in logical pixels.
    pub window_width: u32,
    /// Window height in logical pixels.
    pub window_height: u32,
    /// Framebuffer width in physical pixels.
    pub frame_width: u32,
    /// Framebuffer height in physical pixels.
    pub frame_height: u32,
}

impl Resolution {
    /// Resolution whose framebuffer matches the window.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            window_width: width,
            window_height: height,
            frame_width: width,
            frame_height: height,
        }
    }

    /// Window aspect ratio (never divides by zero).
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.window_width.max(1) as f32 / self.window_height.max(1) as f32
    }

    /// Physical pixels per logical pixel, horizontally and vertically.
    #[must_use]
    pub fn pixel_ratio(&self) -> (f32, f32) {
        (
            self.frame_width as f32 / self.window_width.max(1) as f32,
            self.frame_height as f32 / self.window_height.max(1) as f32,
        )
    }
}

/// Zoom step direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zoom {
    /// Move the eye toward the target.
    In,
    /// Move the eye away from the target.
    Out,
}

/// Wrap an angle to `[0, 2π)`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round a tiny negative input up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Whether the camera's up vector is inverted at `pitch`.
///
/// Both quarter-turn boundaries are inclusive.
#[must_use]
pub fn flips_up(pitch: f32) -> bool {
    (FRAC_PI_2..=PI + FRAC_PI_2).contains(&pitch)
}

/// The view matrix with its translation removed.
#[must_use]
pub fn stationary(view: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(view))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_angle_stays_in_range() {
        for angle in [-10.0, -TAU, -1e-9, 0.0, 1.0, TAU, 3.0 * TAU + 0.5] {
            let wrapped = wrap_angle(angle);
            assert!((0.0..TAU).contains(&wrapped), "{angle} -> {wrapped}");
        }
        assert!((wrap_angle(TAU + 0.5) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn up_flip_boundaries_are_inclusive() {
        let lower = FRAC_PI_2;
        let upper = PI + FRAC_PI_2;
        assert!(flips_up(lower));
        assert!(flips_up(upper));
        assert!(flips_up(PI));
        assert!(!flips_up(f32::from_bits(lower.to_bits() - 1)));
        assert!(!flips_up(f32::from_bits(upper.to_bits() + 1)));
        assert!(!flips_up(0.0));
        assert!(!flips_up(wrap_angle(-1e-3)));
    }

    #[test]
    fn stationary_drops_translation_only() {
        let view = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_rotation_y(0.3);
        let still = stationary(view);
        assert_eq!(still.w_axis, glam::Vec4::W);
        assert_eq!(Mat3::from_mat4(still), Mat3::from_mat4(view));
    }

    #[test]
    fn resolution_guards_zero_sizes() {
        let res = Resolution {
            window_width: 0,
            window_height: 0,
            frame_width: 0,
            frame_height: 0,
        };
        assert_eq!(res.aspect(), 1.0);
        assert_eq!(Resolution::new(1500, 800).pixel_ratio(), (1.0, 1.0));
    }
}
