//! Centralized runtime configuration with TOML preset support.
//!
//! Camera limits, renderer-wide settings, worker capacity and point-cloud
//! defaults are consolidated here. The struct is built once (usually from a
//! TOML file) and passed explicitly to the components that need it; nothing
//! in the crate keeps configuration in global state.

mod camera;
mod point_cloud;
mod render;
mod workers;

use std::path::Path;

pub use camera::CameraOptions;
pub use point_cloud::PointCloudDefaults;
pub use render::RenderOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use workers::WorkerOptions;

use crate::error::SceneError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[camera]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Camera projection and control parameters.
    pub camera: CameraOptions,
    /// Renderer-wide settings.
    pub render: RenderOptions,
    /// Background loader settings.
    pub workers: WorkerOptions,
    /// Defaults for new point clouds.
    pub point_cloud: PointCloudDefaults,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Io`] if the file cannot be read and
    /// [`SceneError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path).map_err(SceneError::Io)?;
        let options = toml::from_str(&content)
            .map_err(|e| SceneError::OptionsParse(e.to_string()))?;
        log::info!("Loaded options from '{}'", path.display());
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OptionsParse`] if serialization fails and
    /// [`SceneError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SceneError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SceneError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SceneError::Io)?;
        }
        std::fs::write(path, content).map_err(SceneError::Io)
    }

    /// Load options from `path`, falling back to defaults (and logging the
    /// reason) when the file is missing or malformed.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(options) => options,
            Err(e) => {
                log::error!(
                    "Failed to load options from '{}': {e}",
                    path.display()
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[camera]
max_zoom = 30.0

[workers]
max_workers = 2
";
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.camera.max_zoom, 30.0);
        assert_eq!(opts.workers.resolved_workers(), 2);
        // Everything else should be default
        assert_eq!(opts.camera.min_zoom, 0.05);
        assert_eq!(opts.render.max_anisotropic_filtering, 16.0);
        assert_eq!(opts.point_cloud.point_size, 1.0);
    }

    #[test]
    fn zoom_clamp_respects_limits() {
        let camera = CameraOptions::default();
        assert_eq!(camera.clamp_zoom(100.0), 15.0);
        assert_eq!(camera.clamp_zoom(0.0), 0.05);
        assert_eq!(camera.clamp_zoom(2.0), 2.0);
    }

    #[test]
    fn zoom_clamp_survives_bad_limits() {
        let camera = CameraOptions::default();
        assert_eq!(camera.clamp_zoom(f32::NAN), 0.05);
        assert_eq!(camera.clamp_zoom(f32::INFINITY), 15.0);

        let opts: Options = toml::from_str("[camera]\nmin_zoom = 20.0\n").unwrap();
        assert_eq!(opts.camera.zoom_limits(), (15.0, 20.0));
        assert_eq!(opts.camera.clamp_zoom(1.0), 15.0);
        assert_eq!(opts.camera.clamp_zoom(50.0), 20.0);

        let broken = CameraOptions {
            min_zoom: f32::NAN,
            max_zoom: -3.0,
            ..CameraOptions::default()
        };
        assert_eq!(broken.zoom_limits(), (0.05, 15.0));
    }

    #[test]
    fn worker_count_is_never_zero() {
        let explicit = WorkerOptions {
            max_workers: Some(0),
        };
        assert_eq!(explicit.resolved_workers(), 1);
        assert!(WorkerOptions::default().resolved_workers() >= 1);
    }

    #[test]
    fn anisotropy_floor_is_one() {
        let render = RenderOptions {
            max_anisotropic_filtering: 0.0,
            ..RenderOptions::default()
        };
        assert_eq!(render.anisotropy(), 1.0);
        assert!(render.resource("shaders/points.wgsl").ends_with("points.wgsl"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("sensorscope-does-not-exist.toml");
        assert!(Options::load(&path).is_err());
        assert_eq!(Options::load_or_default(&path), Options::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = std::env::temp_dir().join("sensorscope-options-test");
        let path = dir.join("preset.toml");
        let mut opts = Options::default();
        opts.camera.rotation_speed = 0.5;
        opts.save(&path).unwrap();
        let loaded = Options::load(&path).unwrap();
        assert_eq!(loaded.camera.rotation_speed, 0.5);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("camera"));
        assert!(props.contains_key("render"));
        assert!(props.contains_key("workers"));
        assert!(props.contains_key("point_cloud"));

        // Skipped fields should be absent
        let camera = &props["camera"]["properties"];
        assert!(camera.get("field_of_view").is_some());
        assert!(camera.get("near_plane").is_none());
    }
}
