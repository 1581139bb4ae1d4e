use crate::signal::{Connection, Signal};

/// Per-frame draw stages, in the order they run.
///
/// The order is fixed: opaque world geometry first, trajectories and text
/// over it, the camera feed and GUI last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawOrder {
    /// Point clouds.
    PointClouds,
    /// Covariance ellipses.
    Covariance,
    /// Object batches.
    Objects,
    /// Sky box.
    Skybox,
    /// Ground grid.
    Ground,
    /// Street geometry.
    Streets,
    /// Loaded 3-D models.
    Models,
    /// Trajectories.
    Trajectories,
    /// World-space text.
    Text,
    /// Camera feeds.
    Camera,
    /// Screen-space GUI.
    Gui,
}

impl DrawOrder {
    /// Every stage, in draw order.
    pub const ALL: [Self; 11] = [
        Self::PointClouds,
        Self::Covariance,
        Self::Objects,
        Self::Skybox,
        Self::Ground,
        Self::Streets,
        Self::Models,
        Self::Trajectories,
        Self::Text,
        Self::Camera,
        Self::Gui,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Runs every subscribed draw pass once per frame in [`DrawOrder`].
///
/// Each stage is a [`Signal`]; a registry subscribes its bulk draw to one
/// stage and keeps the returned [`Connection`] for as long as it should be
/// drawn.
#[derive(Debug)]
pub struct FrameDispatcher {
    stages: [Signal<()>; DrawOrder::ALL.len()],
}

impl Default for FrameDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDispatcher {
    /// Dispatcher with nothing subscribed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: std::array::from_fn(|_| Signal::new()),
        }
    }

    /// Run `callback` at `order` on every frame until the connection drops.
    pub fn synchronize(
        &self,
        order: DrawOrder,
        callback: impl FnMut(&()) + 'static,
    ) -> Connection {
        self.stages[order.index()].connect(callback)
    }

    /// The signal behind one stage.
    #[must_use]
    pub fn stage(&self, order: DrawOrder) -> &Signal<()> {
        &self.stages[order.index()]
    }

    /// Number of passes subscribed at `order`.
    #[must_use]
    pub fn subscriber_count(&self, order: DrawOrder) -> usize {
        self.stages[order.index()].subscriber_count()
    }

    /// Emit every stage in order. Returns how many passes ran.
    pub fn draw_frame(&self) -> usize {
        DrawOrder::ALL
            .iter()
            .map(|&order| self.stages[order.index()].emit(&()))
            .sum()
    }
}
