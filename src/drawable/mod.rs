//! Drawable elements: one GPU buffer, one shared shader, one transform.
//!
//! Every visual category implements [`Drawable`] so a single generic
//! registry can manage all of them. Inputs are shared (`Arc`) so producers
//! can hand the same data to several consumers without copying; the
//! drawable converts them to interleaved vertices (internal axes) on the
//! next [`Drawable::update`].

/// Camera image shown on a flat or curved screen.
pub mod camera_feed;
/// Gaussian position-uncertainty ellipses.
pub mod covariance;
/// Oriented boxes, cylinders and flat markers.
pub mod objects;
/// Point clouds with several point layouts and color modes.
pub mod point_cloud;
/// Polyline trajectories with per-vertex color and width.
pub mod trajectory;

use std::cell::Cell;
use std::rc::Rc;

pub use camera_feed::{CameraFeed, Dimensionality, FeedContext};
pub use covariance::{Covariance, CovarianceBatch};
pub use objects::{Object, ObjectBatch, Shape};
pub use point_cloud::{
    ColorMode, PointCloud, PointCloudContext, PointCloudData, PointXyz, PointXyzi, PointXyzrgb,
    PointXyzrgba,
};
pub use trajectory::{LineType, Trajectory, TrajectoryBatch, TrajectoryVertex};

use crate::camera::CameraMatrices;
use crate::error::SceneError;
use crate::gpu::{Buffer, BufferFactory, BufferUsage, Primitive, Shader, UniformValue};
use crate::transform::Transform;

/// A renderable element managed by a [`crate::registry::Registry`].
pub trait Drawable: Sized + 'static {
    /// Data the element renders.
    type Input;
    /// Shared resources needed to build an element.
    type Context: 'static;
    /// Category name used in buffer labels and diagnostics.
    const KIND: &'static str;

    /// Build an element around `input`. Uploading happens on the first
    /// [`Drawable::update`].
    fn build(context: &Self::Context, input: Self::Input) -> Self;

    /// Replace the rendered data; the next update re-uploads.
    fn change_input(&mut self, input: Self::Input);

    /// Upload pending data to the GPU.
    ///
    /// # Errors
    ///
    /// Fails when the shader cannot be bound or required resources are
    /// missing.
    fn update(&mut self) -> Result<(), SceneError>;

    /// Issue the draw call(s).
    ///
    /// # Errors
    ///
    /// Fails when the shader cannot be bound, nothing has been uploaded, or
    /// required resources are missing.
    fn draw(&mut self) -> Result<(), SceneError>;

    /// Model transform.
    fn transform(&self) -> &Transform;

    /// Mutable model transform.
    fn transform_mut(&mut self) -> &mut Transform;
}

/// Shared resources common to every drawable kind.
#[derive(Clone)]
pub struct DrawContext {
    /// Program shared by every element of one kind.
    pub shader: Rc<dyn Shader>,
    /// Source of per-element vertex buffers.
    pub buffers: Rc<dyn BufferFactory>,
    /// Latest camera matrices.
    pub matrices: Rc<Cell<CameraMatrices>>,
}

/// One vertex attribute, addressed by its shader name. Matrix attributes
/// occupy consecutive locations; `column` selects one of them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttributeSpec {
    pub(crate) name: &'static str,
    pub(crate) column: u32,
    pub(crate) components: u32,
    pub(crate) offset: usize,
    pub(crate) stride: usize,
    pub(crate) divisor: u32,
}

impl AttributeSpec {
    /// Per-vertex attributes laid out back to back in a vertex of `stride`
    /// bytes starting at `base`.
    pub(crate) fn interleaved(
        fields: &[(&'static str, u32)],
        stride: usize,
        base: usize,
        divisor: u32,
    ) -> Vec<Self> {
        let mut offset = base;
        fields
            .iter()
            .map(|&(name, components)| {
                let spec = Self {
                    name,
                    column: 0,
                    components,
                    offset,
                    stride,
                    divisor,
                };
                offset += components as usize * size_of::<f32>();
                spec
            })
            .collect()
    }
}

/// GPU-facing state every drawable carries.
pub(crate) struct GpuState {
    shader: Rc<dyn Shader>,
    buffer: Box<dyn Buffer>,
    matrices: Rc<Cell<CameraMatrices>>,
    pub(crate) transform: Transform,
    pub(crate) dirty: bool,
}

impl GpuState {
    pub(crate) fn new(context: &DrawContext, label: &str) -> Self {
        let mut buffer = context.buffers.create_buffer(label);
        if !buffer.create() {
            log::warn!("buffer '{label}' could not be created");
        }
        Self {
            shader: Rc::clone(&context.shader),
            buffer,
            matrices: Rc::clone(&context.matrices),
            transform: Transform::default(),
            dirty: true,
        }
    }

    pub(crate) fn bind(&self) -> Result<(), SceneError> {
        if self.shader.use_program() {
            Ok(())
        } else {
            Err(SceneError::ShaderUnavailable {
                shader: self.shader.label().to_owned(),
            })
        }
    }

    pub(crate) fn upload(&mut self, bytes: &[u8], attributes: &[AttributeSpec]) {
        self.buffer.vertex_bind();
        self.buffer.allocate_array(bytes, BufferUsage::Dynamic);
        for attribute in attributes {
            let Some(base) = self.shader.attribute_location(attribute.name) else {
                log::debug!(
                    "program '{}' has no attribute '{}'",
                    self.shader.label(),
                    attribute.name
                );
                continue;
            };
            let location = base + attribute.column;
            self.buffer.attribute_buffer(
                location,
                attribute.components,
                attribute.offset,
                attribute.stride,
            );
            if attribute.divisor > 0 {
                self.buffer.attribute_divisor(location, attribute.divisor);
            }
            self.buffer.enable(location);
        }
        self.buffer.vertex_release();
        self.dirty = false;
    }

    pub(crate) fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) {
        let _ = self.shader.set_named(name, value.into());
    }

    /// Camera and model matrices shared by every program.
    pub(crate) fn set_frame_uniforms(&self) {
        let matrices = self.matrices.get();
        self.set_uniform("u_pv", matrices.pv);
        self.set_uniform("u_static_pv", matrices.static_pv);
        self.set_uniform("u_primary_model", self.transform.primary_matrix());
        self.set_uniform("u_secondary_model", self.transform.secondary_matrix());
    }

    pub(crate) fn draw(&mut self, primitive: Primitive, first: u32, count: u32, instances: u32) {
        self.buffer.vertex_bind();
        self.buffer.draw(primitive, first, count, instances);
        self.buffer.vertex_release();
    }
}

/// Normalize an RGBA color given in 0–255.
pub(crate) fn normalize_rgba(color: [f32; 4]) -> [f32; 4] {
    color.map(|channel| (channel / 255.0).clamp(0.0, 1.0))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::DrawContext;
    use crate::camera::CameraMatrices;
    use crate::gpu::headless::{HeadlessBufferFactory, HeadlessShader};

    pub(crate) fn context(
        label: &str,
    ) -> (DrawContext, Rc<HeadlessShader>, Rc<HeadlessBufferFactory>) {
        let shader = Rc::new(HeadlessShader::new(label));
        let buffers = Rc::new(HeadlessBufferFactory::default());
        let context = DrawContext {
            shader: shader.clone(),
            buffers: buffers.clone(),
            matrices: Rc::new(Cell::new(CameraMatrices::default())),
        };
        (context, shader, buffers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_attributes_advance_offsets() {
        let specs = AttributeSpec::interleaved(&[("a", 3), ("b", 4), ("c", 1)], 32, 8, 0);
        let offsets: Vec<usize> = specs.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![8, 20, 36]);
        assert!(specs.iter().all(|s| s.stride == 32));
    }

    #[test]
    fn colors_normalize_and_clamp() {
        assert_eq!(normalize_rgba([255.0, 0.0, 510.0, -1.0]), [1.0, 0.0, 1.0, 0.0]);
    }
}
