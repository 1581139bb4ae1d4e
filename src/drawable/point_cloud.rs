use std::sync::Arc;

use glam::Vec3;

use super::{AttributeSpec, DrawContext, Drawable, GpuState};
use crate::error::SceneError;
use crate::gpu::Primitive;
use crate::options::PointCloudDefaults;
use crate::transform::{to_internal, Transform};

/// Largest palette the point-cloud program accepts.
pub const MAX_PALETTE: usize = 10;

/// A bare position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointXyz {
    /// Position, vehicle axes.
    pub position: Vec3,
}

/// Position plus sensor intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointXyzi {
    /// Position, vehicle axes.
    pub position: Vec3,
    /// Raw return intensity.
    pub intensity: f32,
}

/// Position plus RGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointXyzrgb {
    /// Position, vehicle axes.
    pub position: Vec3,
    /// 8-bit RGB.
    pub color: [u8; 3],
}

/// Position plus RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointXyzrgba {
    /// Position, vehicle axes.
    pub position: Vec3,
    /// 8-bit RGBA.
    pub color: [u8; 4],
}

/// Point data in any of the supported layouts.
#[derive(Debug, Clone)]
pub enum PointCloudData {
    /// Positions only.
    Xyz(Arc<[PointXyz]>),
    /// Positions with intensity.
    Xyzi(Arc<[PointXyzi]>),
    /// Positions with RGB color.
    Xyzrgb(Arc<[PointXyzrgb]>),
    /// Positions with RGBA color.
    Xyzrgba(Arc<[PointXyzrgba]>),
}

impl PointCloudData {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Xyz(points) => points.len(),
            Self::Xyzi(points) => points.len(),
            Self::Xyzrgb(points) => points.len(),
            Self::Xyzrgba(points) => points.len(),
        }
    }

    /// Whether there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn vertices(&self) -> Vec<PointVertex> {
        fn rgba(color: [u8; 4]) -> [f32; 4] {
            color.map(|channel| f32::from(channel) / 255.0)
        }
        match self {
            Self::Xyz(points) => points
                .iter()
                .map(|p| PointVertex::new(p.position, [1.0; 4], 0.0))
                .collect(),
            Self::Xyzi(points) => points
                .iter()
                .map(|p| PointVertex::new(p.position, [1.0; 4], p.intensity))
                .collect(),
            Self::Xyzrgb(points) => points
                .iter()
                .map(|p| {
                    let [r, g, b] = p.color;
                    PointVertex::new(p.position, rgba([r, g, b, 255]), 0.0)
                })
                .collect(),
            Self::Xyzrgba(points) => points
                .iter()
                .map(|p| PointVertex::new(p.position, rgba(p.color), 0.0))
                .collect(),
        }
    }
}

/// How the point-cloud program colors each point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Grey level from intensity.
    #[default]
    Intensity,
    /// Intensity mapped through the palette.
    ColorMap,
    /// First palette entry for every point.
    Solid,
    /// Per-point color from the data.
    Data,
}

impl ColorMode {
    fn uniform(self) -> i32 {
        match self {
            Self::Intensity => 0,
            Self::ColorMap => 1,
            Self::Solid => 2,
            Self::Data => 3,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PointVertex {
    position: [f32; 3],
    color: [f32; 4],
    intensity: f32,
}

impl PointVertex {
    fn new(position: Vec3, color: [f32; 4], intensity: f32) -> Self {
        Self {
            position: to_internal(position).to_array(),
            color,
            intensity,
        }
    }
}

/// Build context for point clouds.
#[derive(Clone)]
pub struct PointCloudContext {
    /// Shared GPU resources.
    pub draw: DrawContext,
    /// Initial point size and intensity range.
    pub defaults: PointCloudDefaults,
}

/// One uploaded point cloud.
pub struct PointCloud {
    gpu: GpuState,
    data: PointCloudData,
    vertex_count: u32,
    color_mode: ColorMode,
    palette: Vec<Vec3>,
    point_size: f32,
    maximum_intensity: f32,
}

impl PointCloud {
    /// Active coloring rule.
    #[must_use]
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Choose how points are colored.
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.color_mode = mode;
    }

    /// Current palette, normalized RGB.
    #[must_use]
    pub fn palette(&self) -> &[Vec3] {
        &self.palette
    }

    /// Replace the palette with 0–255 RGB colors. Returns `false` when more
    /// than [`MAX_PALETTE`] colors were given (the extra ones are dropped) or
    /// when `colors` is empty (the palette is left unchanged).
    pub fn set_color_palette(&mut self, colors: &[[f32; 3]]) -> bool {
        if colors.is_empty() {
            return false;
        }
        self.palette = colors
            .iter()
            .take(MAX_PALETTE)
            .map(|&rgb| Vec3::from_array(rgb) / 255.0)
            .collect();
        colors.len() <= MAX_PALETTE
    }

    /// Replace the palette with a single 0–255 RGB color.
    pub fn set_solid_color(&mut self, rgb: [f32; 3]) {
        self.palette = vec![Vec3::from_array(rgb) / 255.0];
    }

    /// Rendered point size.
    #[must_use]
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// Set the point size; non-positive sizes fall back to 1 and return
    /// `false`.
    pub fn set_point_size(&mut self, size: f32) -> bool {
        let valid = size > 0.0;
        self.point_size = if valid { size } else { 1.0 };
        valid
    }

    /// Intensity mapped to the top of the palette.
    #[must_use]
    pub fn maximum_intensity(&self) -> f32 {
        self.maximum_intensity
    }

    /// Set the intensity range; non-positive values fall back to 1 and
    /// return `false`.
    pub fn set_maximum_intensity(&mut self, maximum: f32) -> bool {
        let valid = maximum > 0.0;
        self.maximum_intensity = if valid { maximum } else { 1.0 };
        valid
    }

    /// Points uploaded by the last update.
    #[must_use]
    pub fn uploaded_points(&self) -> u32 {
        self.vertex_count
    }

    fn default_palette() -> Vec<Vec3> {
        vec![
            Vec3::new(0.2, 0.5, 0.7),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ]
    }
}

impl Drawable for PointCloud {
    type Input = PointCloudData;
    type Context = PointCloudContext;
    const KIND: &'static str = "point_cloud";

    fn build(context: &Self::Context, input: Self::Input) -> Self {
        let mut cloud = Self {
            gpu: GpuState::new(&context.draw, Self::KIND),
            data: input,
            vertex_count: 0,
            color_mode: ColorMode::default(),
            palette: Self::default_palette(),
            point_size: 1.0,
            maximum_intensity: 1.0,
        };
        let _ = cloud.set_point_size(context.defaults.point_size);
        let _ = cloud.set_maximum_intensity(context.defaults.maximum_intensity);
        cloud
    }

    fn change_input(&mut self, input: Self::Input) {
        self.data = input;
        self.gpu.dirty = true;
    }

    fn update(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if !self.gpu.dirty {
            return Ok(());
        }
        let vertices = self.data.vertices();
        let stride = size_of::<PointVertex>();
        let attributes = AttributeSpec::interleaved(
            &[("a_position", 3), ("a_color", 4), ("a_intensity", 1)],
            stride,
            0,
            0,
        );
        self.gpu.upload(bytemuck::cast_slice(&vertices), &attributes);
        self.vertex_count = vertices.len() as u32;
        Ok(())
    }

    fn draw(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if self.vertex_count == 0 {
            return Err(SceneError::EmptyInput);
        }
        self.gpu.set_frame_uniforms();
        self.gpu.set_uniform("u_point_size", self.point_size);
        self.gpu.set_uniform("u_color_mode", self.color_mode.uniform());
        self.gpu.set_uniform("u_maximum_intensity", self.maximum_intensity);
        self.gpu.set_uniform("u_palette_size", self.palette.len() as i32);
        for (i, color) in self.palette.iter().enumerate() {
            self.gpu.set_uniform(&format!("u_palette_{i}"), color.extend(1.0));
        }
        self.gpu.draw(Primitive::Points, 0, self.vertex_count, 1);
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
    use std::rc::Rc;

    use super::*;
    use crate::drawable::test_support;
    use crate::gpu::headless::{HeadlessBufferFactory, HeadlessShader};
    use crate::gpu::{Shader, UniformValue};

    fn context() -> (PointCloudContext, Rc<HeadlessShader>, Rc<HeadlessBufferFactory>) {
        let (draw, shader, buffers) = test_support::context("point_cloud");
        let context = PointCloudContext {
            draw,
            defaults: PointCloudDefaults::default(),
        };
        (context, shader, buffers)
    }

    fn xyzi(points: &[(f32, f32, f32, f32)]) -> PointCloudData {
        PointCloudData::Xyzi(
            points
                .iter()
                .map(|&(x, y, z, intensity)| PointXyzi {
                    position: Vec3::new(x, y, z),
                    intensity,
                })
                .collect(),
        )
    }

    #[test]
    fn update_uploads_internal_axes() {
        let (context, _, buffers) = context();
        let mut cloud = PointCloud::build(&context, xyzi(&[(1.0, 2.0, 3.0, 40.0)]));
        assert!(cloud.update().is_ok());
        assert_eq!(cloud.uploaded_points(), 1);

        let record = buffers.record(0).unwrap_or_default();
        let vertices: Vec<PointVertex> = record
            .data
            .chunks_exact(size_of::<PointVertex>())
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(vertices[0].position, [-2.0, 3.0, -1.0]);
        assert_eq!(vertices[0].intensity, 40.0);
        assert_eq!(record.layout.len(), 3);
        assert!(record.layout.iter().all(|a| a.stride == 32));
    }

    #[test]
    fn update_is_skipped_until_input_changes() {
        let (context, _, buffers) = context();
        let mut cloud = PointCloud::build(&context, xyzi(&[(0.0, 0.0, 0.0, 1.0)]));
        assert!(cloud.update().is_ok());
        assert!(cloud.update().is_ok());
        assert_eq!(buffers.total_uploads(), 1);

        cloud.change_input(xyzi(&[(0.0, 0.0, 0.0, 1.0), (1.0, 0.0, 0.0, 2.0)]));
        assert!(cloud.update().is_ok());
        assert_eq!(buffers.total_uploads(), 2);
        assert_eq!(cloud.uploaded_points(), 2);
    }

    #[test]
    fn draw_sets_uniforms_and_issues_points() {
        let (context, shader, buffers) = context();
        let mut cloud = PointCloud::build(&context, xyzi(&[(0.0, 0.0, 0.0, 1.0)]));
        cloud.set_color_mode(ColorMode::ColorMap);
        assert!(cloud.update().is_ok());
        assert!(cloud.draw().is_ok());

        assert_eq!(shader.uniform("u_color_mode"), Some(UniformValue::Int(1)));
        assert_eq!(shader.uniform("u_palette_size"), Some(UniformValue::Int(4)));
        assert_eq!(shader.uniform("u_maximum_intensity"), Some(UniformValue::Float(100.0)));
        let draws = buffers.record(0).map(|r| r.draws).unwrap_or_default();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].primitive, Primitive::Points);
        assert_eq!(draws[0].count, 1);
    }

    #[test]
    fn empty_cloud_does_not_draw() {
        let (context, _, buffers) = context();
        let mut cloud = PointCloud::build(&context, PointCloudData::Xyz(Arc::from(Vec::new())));
        assert!(cloud.update().is_ok());
        assert!(matches!(cloud.draw(), Err(SceneError::EmptyInput)));
        assert_eq!(buffers.total_draws(), 0);
    }

    #[test]
    fn unbindable_shader_reports_unavailable() {
        let (context, shader, buffers) = context();
        shader.set_bindable(false);
        let mut cloud = PointCloud::build(&context, xyzi(&[(0.0, 0.0, 0.0, 1.0)]));
        assert!(matches!(
            cloud.update(),
            Err(SceneError::ShaderUnavailable { shader: ref name }) if name == "point_cloud"
        ));
        assert_eq!(buffers.total_uploads(), 0);
        assert!(!shader.use_program());
    }

    #[test]
    fn setters_reject_non_positive_values() {
        let (context, _, _) = context();
        let mut cloud = PointCloud::build(&context, xyzi(&[]));
        assert!(!cloud.set_point_size(0.0));
        assert_eq!(cloud.point_size(), 1.0);
        assert!(cloud.set_point_size(3.0));
        assert!(!cloud.set_maximum_intensity(-5.0));
        assert_eq!(cloud.maximum_intensity(), 1.0);
    }

    #[test]
    fn palette_is_capped() {
        let (context, _, _) = context();
        let mut cloud = PointCloud::build(&context, xyzi(&[]));
        assert!(!cloud.set_color_palette(&[[255.0, 0.0, 0.0]; 12]));
        assert_eq!(cloud.palette().len(), MAX_PALETTE);
        assert!(cloud.set_color_palette(&[[0.0, 255.0, 0.0]]));
        assert_eq!(cloud.palette(), &[Vec3::Y]);
        assert!(!cloud.set_color_palette(&[]));
        cloud.set_solid_color([255.0, 255.0, 255.0]);
        assert_eq!(cloud.palette(), &[Vec3::ONE]);
    }

    #[test]
    fn rgb_points_normalize_colors() {
        let data = PointCloudData::Xyzrgb(Arc::from(vec![PointXyzrgb {
            position: Vec3::ZERO,
            color: [255, 0, 51],
        }]));
        let vertices = data.vertices();
        assert_eq!(vertices[0].color, [1.0, 0.0, 0.2, 1.0]);
    }
}
