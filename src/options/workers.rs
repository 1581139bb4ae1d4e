use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Background loader settings.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[schemars(title = "Workers", inline)]
#[serde(default)]
pub struct WorkerOptions {
    /// Maximum concurrent jobs. `None` uses every hardware thread but one.
    #[schemars(title = "Max Workers", range(min = 1, max = 64))]
    pub max_workers: Option<usize>,
}

impl WorkerOptions {
    /// Resolve the concurrent job limit, always at least 1.
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map_or(1, |n| n.get().saturating_sub(1))
            })
            .max(1)
    }
}
