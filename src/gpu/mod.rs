//! GPU collaborator contracts and their backends.
//!
//! Drawables only ever talk to the [`Shader`], [`Buffer`] and [`Texture`]
//! traits. Two implementations ship with the crate: a recording backend
//! with no GPU at all, and a wgpu backend that records draws for replay
//! into a host-owned render pass.

/// Vertex buffer contract.
pub mod buffer;
/// Recording backend used by tests and the demo binary.
pub mod headless;
/// Shader program contract and uniform values.
pub mod shader;
/// Decoded images and the texture contract.
pub mod texture;
/// wgpu-backed implementation.
pub mod wgpu_backend;

use std::rc::Rc;

pub use buffer::{AttributeLayout, Buffer, BufferFactory, BufferUsage, Primitive};
pub use shader::{Shader, UniformValue};
pub use texture::{ImageFile, Texture, TextureFactory};

/// One shared program per drawable kind.
#[derive(Clone)]
pub struct ShaderSet {
    /// Program for point clouds.
    pub point_cloud: Rc<dyn Shader>,
    /// Program for object batches.
    pub objects: Rc<dyn Shader>,
    /// Program for trajectory batches.
    pub trajectories: Rc<dyn Shader>,
    /// Program for covariance batches.
    pub covariance: Rc<dyn Shader>,
    /// Program for camera feeds.
    pub camera_feed: Rc<dyn Shader>,
}

/// Everything the registries need to build drawables.
#[derive(Clone)]
pub struct Backend {
    /// Shared programs.
    pub shaders: ShaderSet,
    /// Source of per-drawable vertex buffers.
    pub buffers: Rc<dyn BufferFactory>,
    /// Source of per-drawable textures.
    pub textures: Rc<dyn TextureFactory>,
}
