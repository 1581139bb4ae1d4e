use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Defaults applied to newly added point clouds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Point Clouds", inline)]
#[serde(default)]
pub struct PointCloudDefaults {
    /// Rendered point size in pixels.
    #[schemars(title = "Point Size", range(min = 0.5, max = 10.0))]
    pub point_size: f32,
    /// Intensity mapped to the top of the color palette.
    #[schemars(title = "Maximum Intensity", range(min = 1.0, max = 255.0))]
    pub maximum_intensity: f32,
}

impl Default for PointCloudDefaults {
    fn default() -> Self {
        Self {
            point_size: 1.0,
            maximum_intensity: 100.0,
        }
    }
}
