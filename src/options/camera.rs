use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Camera", inline)]
#[serde(default)]
/// Camera projection, zoom limits and mouse sensitivity.
pub struct CameraOptions {
    /// Vertical field of view in radians.
    #[schemars(title = "Field of View", range(min = 0.2, max = 2.0))]
    pub field_of_view: f32,
    /// Near clipping plane distance in metres.
    #[schemars(skip)]
    pub near_plane: f32,
    /// Far clipping plane distance in metres.
    #[schemars(skip)]
    pub far_plane: f32,
    /// Closest zoom factor (fraction of the preset distance).
    #[schemars(title = "Minimum Zoom", range(min = 0.01, max = 1.0))]
    pub min_zoom: f32,
    /// Furthest zoom factor.
    #[schemars(title = "Maximum Zoom", range(min = 1.0, max = 50.0))]
    pub max_zoom: f32,
    /// Zoom applied after every position/target reset.
    #[schemars(skip)]
    pub initial_zoom: f32,
    /// Degrees of rotation per dragged pixel.
    #[schemars(title = "Rotation Speed", range(min = 0.01, max = 2.0))]
    pub rotation_speed: f32,
    /// Metres of pan per dragged pixel (scaled by zoom).
    #[schemars(title = "Translation Speed", range(min = 0.001, max = 0.5))]
    pub translation_speed: f32,
    /// Initial window width in screen coordinates.
    #[schemars(skip)]
    pub window_width: u32,
    /// Initial window height in screen coordinates.
    #[schemars(skip)]
    pub window_height: u32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            field_of_view: 0.727_802_3,
            near_plane: 0.1,
            far_plane: 1000.0,
            min_zoom: 0.05,
            max_zoom: 15.0,
            initial_zoom: 1.0,
            rotation_speed: 0.2,
            translation_speed: 0.02,
            window_width: 1500,
            window_height: 800,
        }
    }
}

impl CameraOptions {
    /// Zoom range actually applied, as `(low, high)`.
    ///
    /// Non-finite or non-positive limits fall back to the defaults, and
    /// swapped limits (e.g. a preset raising only `min_zoom`) are reordered,
    /// so `low <= high` always holds.
    #[must_use]
    pub fn zoom_limits(&self) -> (f32, f32) {
        let defaults = Self::default();
        let sane = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        let min = sane(self.min_zoom, defaults.min_zoom);
        let max = sane(self.max_zoom, defaults.max_zoom);
        (min.min(max), min.max(max))
    }

    /// Clamp `zoom` into [`Self::zoom_limits`]. NaN maps to the lower limit.
    #[must_use]
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        let (low, high) = self.zoom_limits();
        if zoom.is_nan() {
            low
        } else {
            zoom.clamp(low, high)
        }
    }
}
