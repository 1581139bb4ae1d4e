use std::rc::Rc;

use glam::Vec3;

use super::{AttributeSpec, DrawContext, Drawable, GpuState};
use crate::error::SceneError;
use crate::gpu::{ImageFile, Primitive, Texture, TextureFactory};
use crate::transform::Transform;

const COLUMNS: u32 = 32;
const TEXTURE_UNIT: u32 = 0;

/// Whether a feed is shown as a curved screen in the scene or as a flat
/// overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimensionality {
    /// Curved screen placed in the world.
    #[default]
    ThreeDimensional,
    /// Flat screen.
    TwoDimensional,
}

impl Dimensionality {
    fn uniform(self) -> i32 {
        match self {
            Self::ThreeDimensional => 0,
            Self::TwoDimensional => 1,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

/// Screen mesh as a triangle strip: one bottom/top pair per column edge.
/// Curvature bends the screen toward the viewer at its sides; internal axes
/// with the screen centred on x and standing on y = 0.
fn screen_mesh(width: f32, height: f32, curvature: f32) -> Vec<ScreenVertex> {
    (0..=COLUMNS)
        .flat_map(|column| {
            let u = column as f32 / COLUMNS as f32;
            let side = 2.0 * u - 1.0;
            let x = side * width * 0.5;
            let z = curvature * side * side;
            [
                ScreenVertex {
                    position: Vec3::new(x, 0.0, z).to_array(),
                    uv: [u, 1.0],
                },
                ScreenVertex {
                    position: Vec3::new(x, height, z).to_array(),
                    uv: [u, 0.0],
                },
            ]
        })
        .collect()
}

/// Build context for camera feeds.
#[derive(Clone)]
pub struct FeedContext {
    /// Shared GPU resources.
    pub draw: DrawContext,
    /// Source of per-feed textures.
    pub textures: Rc<dyn TextureFactory>,
}

/// A camera image shown on a screen mesh.
pub struct CameraFeed {
    gpu: GpuState,
    texture: Box<dyn Texture>,
    image: ImageFile,
    image_dirty: bool,
    curvature: f32,
    dimensions: (f32, f32),
    dimensionality: Dimensionality,
    vertex_count: u32,
}

impl CameraFeed {
    /// Depth of the screen's bend at its sides, metres.
    #[must_use]
    pub fn curvature(&self) -> f32 {
        self.curvature
    }

    /// Change the screen's bend.
    pub fn set_curvature(&mut self, curvature: f32) {
        self.curvature = curvature;
        self.gpu.dirty = true;
    }

    /// Screen width and height, metres.
    #[must_use]
    pub fn dimensions(&self) -> (f32, f32) {
        self.dimensions
    }

    /// Resize the screen. Non-positive values leave that side unchanged.
    pub fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 {
            self.dimensions.0 = width;
        }
        if height > 0.0 {
            self.dimensions.1 = height;
        }
        self.gpu.dirty = true;
    }

    /// Screen style.
    #[must_use]
    pub fn dimensionality(&self) -> Dimensionality {
        self.dimensionality
    }

    /// Switch between the curved world screen and a flat screen.
    pub fn set_dimensionality(&mut self, dimensionality: Dimensionality) {
        self.dimensionality = dimensionality;
        self.gpu.dirty = true;
    }

    fn effective_curvature(&self) -> f32 {
        match self.dimensionality {
            Dimensionality::ThreeDimensional => self.curvature,
            Dimensionality::TwoDimensional => 0.0,
        }
    }
}

impl Drawable for CameraFeed {
    type Input = ImageFile;
    type Context = FeedContext;
    const KIND: &'static str = "camera_feed";

    fn build(context: &Self::Context, input: Self::Input) -> Self {
        Self {
            gpu: GpuState::new(&context.draw, Self::KIND),
            texture: context.textures.create_texture(Self::KIND),
            image: input,
            image_dirty: true,
            curvature: 1.0,
            dimensions: (10.0, 5.625),
            dimensionality: Dimensionality::default(),
            vertex_count: 0,
        }
    }

    fn change_input(&mut self, input: Self::Input) {
        self.image = input;
        self.image_dirty = true;
    }

    fn update(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if self.image_dirty {
            if !self.texture.allocate(&self.image) {
                return Err(SceneError::TextureUnavailable);
            }
            self.image_dirty = false;
        }
        if self.gpu.dirty {
            let (width, height) = self.dimensions;
            let mesh = screen_mesh(width, height, self.effective_curvature());
            let attributes = AttributeSpec::interleaved(
                &[("i_position", 3), ("i_uv", 2)],
                size_of::<ScreenVertex>(),
                0,
                0,
            );
            self.gpu.upload(bytemuck::cast_slice(&mesh), &attributes);
            self.vertex_count = mesh.len() as u32;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if self.vertex_count == 0 {
            return Err(SceneError::EmptyInput);
        }
        if !self.texture.bind(TEXTURE_UNIT) {
            return Err(SceneError::TextureUnavailable);
        }
        self.gpu.set_frame_uniforms();
        self.gpu.set_uniform("u_texture", TEXTURE_UNIT as i32);
        self.gpu.set_uniform("u_dimensionality", self.dimensionality.uniform());
        self.gpu.draw(Primitive::TriangleStrip, 0, self.vertex_count, 1);
        Ok(())
    }

    fn transform(&self) -> &Transform {
        &self.gpu.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.gpu.transform
    }
}
