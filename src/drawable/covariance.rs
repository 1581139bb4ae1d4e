use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Mat2, Vec2, Vec3};

use super::{AttributeSpec, DrawContext, Drawable, GpuState};
use crate::error::SceneError;
use crate::gpu::Primitive;
use crate::transform::{to_internal, Transform};

/// Half extent of the quad each ellipse is evaluated over, metres.
const PLANE_EXTENT: f32 = 1.0;

/// A 2-D position uncertainty centred on `position`, vehicle axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariance {
    /// Covariance of the ground-plane position, m².
    pub matrix: Mat2,
    /// Mean position.
    pub position: Vec3,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CovarianceInstance {
    mean: [f32; 3],
    /// Columns of the inverse covariance.
    inverse: [[f32; 2]; 2],
    /// Gaussian normalization `1 / sqrt(4π² det Σ)`.
    constant: f32,
}

impl CovarianceInstance {
    fn new(covariance: &Covariance) -> Option<Self> {
        let determinant = covariance.matrix.determinant();
        if !determinant.is_finite() || determinant <= 0.0 {
            return None;
        }
        let inverse = covariance.matrix.inverse();
        Some(Self {
            mean: to_internal(covariance.position).to_array(),
            inverse: [inverse.x_axis.to_array(), inverse.y_axis.to_array()],
            constant: 1.0 / (4.0 * PI * PI * determinant).sqrt(),
        })
    }
}

fn plane() -> [Vec2; 4] {
    [
        Vec2::new(-PLANE_EXTENT, -PLANE_EXTENT),
        Vec2::new(PLANE_EXTENT, -PLANE_EXTENT),
        Vec2::new(-PLANE_EXTENT, PLANE_EXTENT),
        Vec2::new(PLANE_EXTENT, PLANE_EXTENT),
    ]
}

/// A batch of covariance ellipses instanced over one quad.
pub struct CovarianceBatch {
    gpu: GpuState,
    matrices: Arc<[Covariance]>,
    instance_count: u32,
}

impl CovarianceBatch {
    /// Ellipses uploaded by the last update. Singular matrices are skipped.
    #[must_use]
    pub fn uploaded_matrices(&self) -> u32 {
        self.instance_count
    }
}

impl Drawable for CovarianceBatch {
    type Input = Arc<[Covariance]>;
    type Context = DrawContext;
    const KIND: &'static str = "covariance";

    fn build(context: &Self::Context, input: Self::Input) -> Self {
        Self {
            gpu: GpuState::new(context, Self::KIND),
            matrices: input,
            instance_count: 0,
        }
    }

    fn change_input(&mut self, input: Self::Input) {
        self.matrices = input;
        self.gpu.dirty = true;
    }

    fn update(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if !self.gpu.dirty {
            return Ok(());
        }
        let instances: Vec<CovarianceInstance> = self
            .matrices
            .iter()
            .enumerate()
            .filter_map(|(i, covariance)| {
                let instance = CovarianceInstance::new(covariance);
                if instance.is_none() {
                    log::warn!("covariance {i} is not positive definite, skipped");
                }
                instance
            })
            .collect();

        let plane = plane();
        let plane_bytes: &[u8] = bytemuck::cast_slice(&plane);
        let mut bytes = plane_bytes.to_vec();
        bytes.extend_from_slice(bytemuck::cast_slice(&instances));

        let stride = size_of::<CovarianceInstance>();
        let base = plane_bytes.len();
        let column = size_of::<[f32; 2]>();
        let inverse = |column_index: u32| AttributeSpec {
            name: "i_inverse_covariance",
            column: column_index,
            components: 2,
            offset: base + size_of::<[f32; 3]>() + column_index as usize * column,
            stride,
            divisor: 1,
        };
        let mut attributes =
            AttributeSpec::interleaved(&[("i_position", 2)], size_of::<Vec2>(), 0, 0);
        attributes.extend(AttributeSpec::interleaved(&[("i_mean", 3)], stride, base, 1));
        attributes.push(AttributeSpec {
            name: "i_equation_constant",
            column: 0,
            components: 1,
            offset: base + size_of::<[f32; 3]>() + 2 * column,
            stride,
            divisor: 1,
        });
        // The mat2 spans two locations; registering it last keeps the second
        // column clear of the other attributes.
        attributes.extend([inverse(0), inverse(1)]);

        self.gpu.upload(&bytes, &attributes);
        self.instance_count = instances.len() as u32;
        Ok(())
    }

    fn draw(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if self.instance_count == 0 {
            return Err(SceneError::EmptyInput);
        }
        self.gpu.set_frame_uniforms();
        let corners = plane().len() as u32;
        self.gpu.draw(Primitive::TriangleStrip, 0, corners, self.instance_count);
        Ok(())
    }

    fn transform(&self) -> &Transform {
        &self.gpu.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.gpu.transform
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::drawable::test_support;

    fn covariance(matrix: Mat2, position: Vec3) -> Covariance {
        Covariance { matrix, position }
    }

    #[test]
    fn instance_holds_inverse_and_constant() {
        let matrix = Mat2::from_diagonal(Vec2::new(4.0, 1.0));
        let instance = CovarianceInstance::new(&covariance(matrix, Vec3::new(1.0, 2.0, 0.0)));
        let Some(instance) = instance else {
            panic!("diagonal matrix should be accepted");
        };
        assert_eq!(instance.mean, [-2.0, 0.0, -1.0]);
        assert_relative_eq!(instance.inverse[0][0], 0.25);
        assert_relative_eq!(instance.inverse[1][1], 1.0);
        assert_relative_eq!(instance.constant, 1.0 / (4.0 * PI), epsilon = 1e-6);
    }

    #[test]
    fn singular_matrices_are_rejected() {
        assert!(CovarianceInstance::new(&covariance(Mat2::ZERO, Vec3::ZERO)).is_none());
        let negative = Mat2::from_diagonal(Vec2::new(-1.0, 1.0));
        assert!(CovarianceInstance::new(&covariance(negative, Vec3::ZERO)).is_none());
        let nan = Mat2::from_diagonal(Vec2::new(f32::NAN, 1.0));
        assert!(CovarianceInstance::new(&covariance(nan, Vec3::ZERO)).is_none());
    }

    #[test]
    fn every_valid_matrix_gets_its_own_instance() {
        let (context, _, buffers) = test_support::context("covariance");
        let matrices: Arc<[Covariance]> = Arc::from(vec![
            covariance(Mat2::IDENTITY, Vec3::new(1.0, 0.0, 0.0)),
            covariance(Mat2::ZERO, Vec3::ZERO),
            covariance(Mat2::IDENTITY * 2.0, Vec3::new(0.0, 1.0, 0.0)),
        ]);
        let mut batch = CovarianceBatch::build(&context, matrices);
        assert!(batch.update().is_ok());
        assert_eq!(batch.uploaded_matrices(), 2);
        assert!(batch.draw().is_ok());

        let record = buffers.record(0).unwrap_or_default();
        let base = 4 * size_of::<Vec2>();
        let instances: Vec<CovarianceInstance> = record.data[base..]
            .chunks_exact(size_of::<CovarianceInstance>())
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(instances[0].mean, [0.0, 0.0, -1.0]);
        assert_eq!(instances[1].mean, [-1.0, 0.0, 0.0]);

        let columns: Vec<u32> = record
            .layout
            .iter()
            .filter(|a| a.components == 2 && a.divisor == 1)
            .map(|a| a.index)
            .collect();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1], columns[0] + 1);

        assert_eq!(record.draws.len(), 1);
        assert_eq!(record.draws[0].primitive, Primitive::TriangleStrip);
        assert_eq!((record.draws[0].count, record.draws[0].instances), (4, 2));
    }
}
