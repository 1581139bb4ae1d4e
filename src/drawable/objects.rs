use std::f32::consts::TAU;
use std::sync::Arc;

use glam::{Quat, Vec3};

use super::{normalize_rgba, AttributeSpec, DrawContext, Drawable, GpuState};
use crate::error::SceneError;
use crate::gpu::Primitive;
use crate::transform::{to_internal, Transform};

const SEGMENTS: usize = 16;

/// One oriented object, vehicle axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Object {
    /// Center of the object.
    pub position: Vec3,
    /// Orientation.
    pub orientation: Quat,
    /// RGBA, each channel in 0–255.
    pub color: [f32; 4],
    /// Extent along y, metres.
    pub width: f32,
    /// Extent along x, metres.
    pub length: f32,
    /// Extent along z, metres.
    pub height: f32,
    /// Filled faces instead of an outline.
    pub solid: bool,
    /// Outline width, metres.
    pub line_width: f32,
}

impl Default for Object {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            color: [255.0; 4],
            width: 1.0,
            length: 1.0,
            height: 1.0,
            solid: false,
            line_width: 0.1,
        }
    }
}

/// Unit mesh instanced for every object in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// Axis-aligned box.
    #[default]
    Box,
    /// Upright cylinder.
    Cylinder,
    /// Flat disc on the ground plane.
    Circle,
    /// Flat square on the ground plane.
    Square,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectInstance {
    position: [f32; 3],
    /// Quaternion xyzw, internal axes.
    rotation: [f32; 4],
    color: [f32; 4],
    /// Internal-axis extents: width, height, length.
    scale: [f32; 3],
    line_width: f32,
    solid: f32,
}

impl From<&Object> for ObjectInstance {
    fn from(object: &Object) -> Self {
        let [x, y, z, w] = object.orientation.normalize().to_array();
        let axis = to_internal(Vec3::new(x, y, z));
        Self {
            position: to_internal(object.position).to_array(),
            rotation: [axis.x, axis.y, axis.z, w],
            color: normalize_rgba(object.color),
            scale: [object.width, object.height, object.length],
            line_width: object.line_width,
            solid: if object.solid { 1.0 } else { 0.0 },
        }
    }
}

fn vertex(position: Vec3, normal: Vec3) -> MeshVertex {
    MeshVertex {
        position: position.to_array(),
        normal: normal.to_array(),
    }
}

/// Unit mesh centred on the origin, internal axes (y up), drawn as a
/// triangle list.
fn unit_mesh(shape: Shape) -> Vec<MeshVertex> {
    match shape {
        Shape::Box => box_mesh(),
        Shape::Square => {
            let corners = [
                Vec3::new(-0.5, 0.0, -0.5),
                Vec3::new(0.5, 0.0, -0.5),
                Vec3::new(0.5, 0.0, 0.5),
                Vec3::new(-0.5, 0.0, 0.5),
            ];
            [0, 2, 1, 0, 3, 2]
                .iter()
                .map(|&i| vertex(corners[i], Vec3::Y))
                .collect()
        }
        Shape::Circle => disc(0.0, Vec3::Y),
        Shape::Cylinder => {
            let mut mesh = disc(0.5, Vec3::Y);
            mesh.extend(disc(-0.5, Vec3::NEG_Y));
            for i in 0..SEGMENTS {
                let (a, b) = (rim(i), rim(i + 1));
                let (top_a, top_b) = (a + Vec3::Y * 0.5, b + Vec3::Y * 0.5);
                let (bottom_a, bottom_b) = (a - Vec3::Y * 0.5, b - Vec3::Y * 0.5);
                let (na, nb) = (a.normalize(), b.normalize());
                mesh.extend([
                    vertex(bottom_a, na),
                    vertex(top_b, nb),
                    vertex(bottom_b, nb),
                    vertex(bottom_a, na),
                    vertex(top_a, na),
                    vertex(top_b, nb),
                ]);
            }
            mesh
        }
    }
}

fn rim(i: usize) -> Vec3 {
    let angle = TAU * i as f32 / SEGMENTS as f32;
    Vec3::new(angle.cos() * 0.5, 0.0, angle.sin() * 0.5)
}

fn disc(height: f32, normal: Vec3) -> Vec<MeshVertex> {
    let centre = Vec3::new(0.0, height, 0.0);
    (0..SEGMENTS)
        .flat_map(|i| {
            let a = rim(i) + centre;
            let b = rim(i + 1) + centre;
            if normal.y >= 0.0 {
                [vertex(centre, normal), vertex(b, normal), vertex(a, normal)]
            } else {
                [vertex(centre, normal), vertex(a, normal), vertex(b, normal)]
            }
        })
        .collect()
}

fn box_mesh() -> Vec<MeshVertex> {
    let faces = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    faces
        .iter()
        .flat_map(|&normal| {
            // Two in-plane axes forming a right-handed basis with the normal.
            let u = normal.any_orthonormal_vector();
            let v = normal.cross(u);
            let corner = |su: f32, sv: f32| vertex((normal + u * su + v * sv) * 0.5, normal);
            [
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            ]
        })
        .collect()
}

/// A batch of objects sharing one unit mesh.
pub struct ObjectBatch {
    gpu: GpuState,
    objects: Arc<[Object]>,
    shape: Shape,
    mesh_len: u32,
    instance_count: u32,
}

impl ObjectBatch {
    /// Mesh instanced for each object.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Switch the instanced mesh; the next update re-uploads.
    pub fn set_shape(&mut self, shape: Shape) {
        if self.shape != shape {
            self.shape = shape;
            self.gpu.dirty = true;
        }
    }

    /// Objects uploaded by the last update.
    #[must_use]
    pub fn uploaded_objects(&self) -> u32 {
        self.instance_count
    }
}

impl Drawable for ObjectBatch {
    type Input = Arc<[Object]>;
    type Context = DrawContext;
    const KIND: &'static str = "objects";

    fn build(context: &Self::Context, input: Self::Input) -> Self {
        Self {
            gpu: GpuState::new(context, Self::KIND),
            objects: input,
            shape: Shape::default(),
            mesh_len: 0,
            instance_count: 0,
        }
    }

    fn change_input(&mut self, input: Self::Input) {
        self.objects = input;
        self.gpu.dirty = true;
    }

    fn update(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if !self.gpu.dirty {
            return Ok(());
        }
        let mesh = unit_mesh(self.shape);
        let instances: Vec<ObjectInstance> = self.objects.iter().map(Into::into).collect();

        let mesh_bytes: &[u8] = bytemuck::cast_slice(&mesh);
        let mut bytes =
            Vec::with_capacity(mesh_bytes.len() + instances.len() * size_of::<ObjectInstance>());
        bytes.extend_from_slice(mesh_bytes);
        bytes.extend_from_slice(bytemuck::cast_slice(&instances));

        let mut attributes = AttributeSpec::interleaved(
            &[("a_position", 3), ("a_normal", 3)],
            size_of::<MeshVertex>(),
            0,
            0,
        );
        attributes.extend(AttributeSpec::interleaved(
            &[
                ("i_position", 3),
                ("i_rotation", 4),
                ("i_color", 4),
                ("i_scale", 3),
                ("i_line_width", 1),
                ("i_solid", 1),
            ],
            size_of::<ObjectInstance>(),
            mesh_bytes.len(),
            1,
        ));
        self.gpu.upload(&bytes, &attributes);
        self.mesh_len = mesh.len() as u32;
        self.instance_count = instances.len() as u32;
        Ok(())
    }

    fn draw(&mut self) -> Result<(), SceneError> {
        self.gpu.bind()?;
        if self.instance_count == 0 {
            return Err(SceneError::EmptyInput);
        }
        self.gpu.set_frame_uniforms();
        self.gpu.draw(Primitive::Triangles, 0, self.mesh_len, self.instance_count);
        Ok(())
    }

    fn transform(&self) -> &Transform {
        &self.gpu.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.gpu.transform
    }
}
