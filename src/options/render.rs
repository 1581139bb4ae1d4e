use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Renderer-wide settings shared by every drawable.
///
/// These used to be process globals; they are now read once when the
/// engine is built and handed to whatever needs them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Rendering", inline)]
#[serde(default)]
pub struct RenderOptions {
    /// Upper bound for anisotropic texture filtering.
    #[schemars(title = "Anisotropic Filtering", range(min = 1.0, max = 16.0))]
    pub max_anisotropic_filtering: f32,
    /// Root directory for shaders, fonts and other resources.
    #[schemars(skip)]
    pub program_path: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_anisotropic_filtering: 16.0,
            program_path: PathBuf::from("."),
        }
    }
}

impl RenderOptions {
    /// Anisotropy level actually applied (never below 1).
    #[must_use]
    pub fn anisotropy(&self) -> f32 {
        self.max_anisotropic_filtering.max(1.0)
    }

    /// Resolve a resource path relative to [`Self::program_path`].
    #[must_use]
    pub fn resource(&self, relative: &str) -> PathBuf {
        self.program_path.join(relative)
    }
}
