//! Recording backend that needs no GPU.
//!
//! Every call is written to a shared record so callers can inspect what a
//! drawable uploaded and drew. Used by the unit tests and by the demo
//! binary; a shader can be told to refuse binding to exercise the
//! resource-unready path.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::buffer::{AttributeLayout, Buffer, BufferFactory, BufferUsage, Primitive};
use super::shader::{Shader, UniformValue};
use super::texture::{ImageFile, Texture, TextureFactory};
use super::{Backend, ShaderSet};

/// A shader that hands out locations on demand and remembers the last value
/// written to each uniform.
#[derive(Debug)]
pub struct HeadlessShader {
    label: String,
    bindable: Cell<bool>,
    binds: Cell<usize>,
    locations: RefCell<FxHashMap<String, u32>>,
    values: RefCell<FxHashMap<u32, UniformValue>>,
}

impl HeadlessShader {
    /// A shader that binds successfully.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            bindable: Cell::new(true),
            binds: Cell::new(0),
            locations: RefCell::new(FxHashMap::default()),
            values: RefCell::new(FxHashMap::default()),
        }
    }

    /// A shader whose `use_program` always fails.
    #[must_use]
    pub fn failing(label: &str) -> Self {
        let shader = Self::new(label);
        shader.set_bindable(false);
        shader
    }

    /// Toggle whether `use_program` succeeds.
    pub fn set_bindable(&self, bindable: bool) {
        self.bindable.set(bindable);
    }

    /// Successful `use_program` calls so far.
    #[must_use]
    pub fn bind_count(&self) -> usize {
        self.binds.get()
    }

    /// Last value written to uniform `name`.
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        let location = *self.locations.borrow().get(name)?;
        self.values.borrow().get(&location).copied()
    }

    fn location(&self, name: &str) -> u32 {
        let mut locations = self.locations.borrow_mut();
        let next = locations.len() as u32;
        *locations.entry(name.to_owned()).or_insert(next)
    }
}

impl Shader for HeadlessShader {
    fn label(&self) -> &str {
        &self.label
    }

    fn use_program(&self) -> bool {
        if self.bindable.get() {
            self.binds.set(self.binds.get() + 1);
            true
        } else {
            false
        }
    }

    fn attribute_location(&self, name: &str) -> Option<u32> {
        Some(self.location(name))
    }

    fn uniform_location(&self, name: &str) -> Option<u32> {
        Some(self.location(name))
    }

    fn set_value(&self, location: u32, value: UniformValue) {
        let _ = self.values.borrow_mut().insert(location, value);
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Topology.
    pub primitive: Primitive,
    /// First vertex.
    pub first: u32,
    /// Vertex count.
    pub count: u32,
    /// Instance count.
    pub instances: u32,
}

/// Everything a [`HeadlessBuffer`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct BufferRecord {
    /// Label given at creation.
    pub label: String,
    /// Whether `create` was called.
    pub created: bool,
    /// Whether the buffer is currently bound.
    pub bound: bool,
    /// Last uploaded contents.
    pub data: Vec<u8>,
    /// Usage hint of the last upload.
    pub usage: BufferUsage,
    /// Number of uploads.
    pub uploads: usize,
    /// Described attributes, by slot.
    pub layout: Vec<AttributeLayout>,
    /// Currently enabled attribute slots.
    pub enabled: Vec<u32>,
    /// Draws issued while bound.
    pub draws: Vec<DrawCall>,
}

impl BufferRecord {
    fn layout_mut(&mut self, index: u32) -> &mut AttributeLayout {
        let position = match self.layout.iter().position(|a| a.index == index) {
            Some(position) => position,
            None => {
                self.layout.push(AttributeLayout {
                    index,
                    components: 0,
                    offset: 0,
                    stride: 0,
                    divisor: 0,
                });
                self.layout.len() - 1
            }
        };
        &mut self.layout[position]
    }
}

/// A buffer that records into a [`BufferRecord`] shared with its factory.
#[derive(Debug)]
pub struct HeadlessBuffer {
    record: Rc<RefCell<BufferRecord>>,
}

impl Buffer for HeadlessBuffer {
    fn create(&mut self) -> bool {
        self.record.borrow_mut().created = true;
        true
    }

    fn vertex_bind(&mut self) {
        self.record.borrow_mut().bound = true;
    }

    fn vertex_release(&mut self) {
        self.record.borrow_mut().bound = false;
    }

    fn allocate_array(&mut self, data: &[u8], usage: BufferUsage) {
        let mut record = self.record.borrow_mut();
        record.data.clear();
        record.data.extend_from_slice(data);
        record.usage = usage;
        record.uploads += 1;
    }

    fn attribute_buffer(
        &mut self,
        index: u32,
        components: u32,
        offset: usize,
        stride: usize,
    ) {
        let mut record = self.record.borrow_mut();
        let slot = record.layout_mut(index);
        slot.components = components;
        slot.offset = offset;
        slot.stride = stride;
    }

    fn attribute_divisor(&mut self, index: u32, divisor: u32) {
        self.record.borrow_mut().layout_mut(index).divisor = divisor;
    }

    fn enable(&mut self, index: u32) {
        let mut record = self.record.borrow_mut();
        if !record.enabled.contains(&index) {
            record.enabled.push(index);
        }
    }

    fn disable(&mut self, index: u32) {
        self.record.borrow_mut().enabled.retain(|&i| i != index);
    }

    fn draw(&mut self, primitive: Primitive, first: u32, count: u32, instances: u32) {
        let mut record = self.record.borrow_mut();
        if !record.created || !record.bound {
            log::warn!("draw on unbound buffer '{}' ignored", record.label);
            return;
        }
        record.draws.push(DrawCall {
            primitive,
            first,
            count,
            instances,
        });
    }

    fn size(&self) -> usize {
        self.record.borrow().data.len()
    }
}

/// Hands out [`HeadlessBuffer`]s and keeps their records for inspection.
#[derive(Debug, Default)]
pub struct HeadlessBufferFactory {
    records: RefCell<Vec<Rc<RefCell<BufferRecord>>>>,
}

impl HeadlessBufferFactory {
    /// Number of buffers handed out.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.records.borrow().len()
    }

    /// Snapshot of the `index`-th buffer handed out.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<BufferRecord> {
        self.records
            .borrow()
            .get(index)
            .map(|record| record.borrow().clone())
    }

    /// Draw calls across every buffer.
    #[must_use]
    pub fn total_draws(&self) -> usize {
        self.records
            .borrow()
            .iter()
            .map(|record| record.borrow().draws.len())
            .sum()
    }

    /// Uploads across every buffer.
    #[must_use]
    pub fn total_uploads(&self) -> usize {
        self.records
            .borrow()
            .iter()
            .map(|record| record.borrow().uploads)
            .sum()
    }
}

impl BufferFactory for HeadlessBufferFactory {
    fn create_buffer(&self, label: &str) -> Box<dyn Buffer> {
        let record = Rc::new(RefCell::new(BufferRecord {
            label: label.to_owned(),
            ..BufferRecord::default()
        }));
        self.records.borrow_mut().push(Rc::clone(&record));
        Box::new(HeadlessBuffer { record })
    }
}

/// Everything a [`HeadlessTexture`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct TextureRecord {
    /// Label given at creation.
    pub label: String,
    /// Size of the last accepted image.
    pub size: Option<(u32, u32)>,
    /// Accepted uploads.
    pub uploads: usize,
    /// Successful binds.
    pub binds: usize,
}

/// A texture that records into a [`TextureRecord`].
#[derive(Debug)]
pub struct HeadlessTexture {
    record: Rc<RefCell<TextureRecord>>,
}

impl Texture for HeadlessTexture {
    fn allocate(&mut self, image: &ImageFile) -> bool {
        if !image.is_valid() {
            return false;
        }
        let mut record = self.record.borrow_mut();
        record.size = Some((image.width, image.height));
        record.uploads += 1;
        true
    }

    fn bind(&mut self, _unit: u32) -> bool {
        let mut record = self.record.borrow_mut();
        if record.size.is_none() {
            return false;
        }
        record.binds += 1;
        true
    }

    fn is_allocated(&self) -> bool {
        self.record.borrow().size.is_some()
    }
}

/// Hands out [`HeadlessTexture`]s and keeps their records for inspection.
#[derive(Debug, Default)]
pub struct HeadlessTextureFactory {
    records: RefCell<Vec<Rc<RefCell<TextureRecord>>>>,
}

impl HeadlessTextureFactory {
    /// Snapshot of the `index`-th texture handed out.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<TextureRecord> {
        self.records
            .borrow()
            .get(index)
            .map(|record| record.borrow().clone())
    }
}

impl TextureFactory for HeadlessTextureFactory {
    fn create_texture(&self, label: &str) -> Box<dyn Texture> {
        let record = Rc::new(RefCell::new(TextureRecord {
            label: label.to_owned(),
            ..TextureRecord::default()
        }));
        self.records.borrow_mut().push(Rc::clone(&record));
        Box::new(HeadlessTexture { record })
    }
}

/// A complete recording backend with typed access to every part.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    /// Point-cloud program.
    pub point_cloud: Rc<HeadlessShader>,
    /// Object program.
    pub objects: Rc<HeadlessShader>,
    /// Trajectory program.
    pub trajectories: Rc<HeadlessShader>,
    /// Covariance program.
    pub covariance: Rc<HeadlessShader>,
    /// Camera-feed program.
    pub camera_feed: Rc<HeadlessShader>,
    /// Buffer factory.
    pub buffers: Rc<HeadlessBufferFactory>,
    /// Texture factory.
    pub textures: Rc<HeadlessTextureFactory>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Backend whose shaders all bind successfully.
    #[must_use]
    pub fn new() -> Self {
        Self {
            point_cloud: Rc::new(HeadlessShader::new("point_cloud")),
            objects: Rc::new(HeadlessShader::new("objects")),
            trajectories: Rc::new(HeadlessShader::new("trajectories")),
            covariance: Rc::new(HeadlessShader::new("covariance")),
            camera_feed: Rc::new(HeadlessShader::new("camera_feed")),
            buffers: Rc::new(HeadlessBufferFactory::default()),
            textures: Rc::new(HeadlessTextureFactory::default()),
        }
    }

    /// Type-erased view for the engine and registries.
    #[must_use]
    pub fn backend(&self) -> Backend {
        Backend {
            shaders: ShaderSet {
                point_cloud: self.point_cloud.clone(),
                objects: self.objects.clone(),
                trajectories: self.trajectories.clone(),
                covariance: self.covariance.clone(),
                camera_feed: self.camera_feed.clone(),
            },
            buffers: self.buffers.clone(),
            textures: self.textures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_remembers_uniforms_and_binds() {
        let shader = HeadlessShader::new("test");
        assert!(shader.use_program());
        assert!(shader.set_named("u_point_size", UniformValue::Float(3.0)));
        assert_eq!(shader.uniform("u_point_size"), Some(UniformValue::Float(3.0)));
        assert_eq!(shader.bind_count(), 1);

        shader.set_bindable(false);
        assert!(!shader.use_program());
        assert_eq!(shader.bind_count(), 1);
    }

    #[test]
    fn draws_are_recorded_only_while_bound() {
        let factory = HeadlessBufferFactory::default();
        let mut buffer = factory.create_buffer("points");
        assert!(buffer.create());
        buffer.draw(Primitive::Points, 0, 3, 1);
        buffer.vertex_bind();
        buffer.allocate_array(&[0u8; 12], BufferUsage::Dynamic);
        buffer.attribute_buffer(0, 3, 0, 12);
        buffer.attribute_divisor(0, 1);
        buffer.enable(0);
        buffer.enable(0);
        buffer.draw(Primitive::Points, 0, 1, 1);
        buffer.vertex_release();

        let record = factory.record(0).unwrap_or_default();
        assert_eq!(record.uploads, 1);
        assert_eq!(record.enabled, vec![0]);
        assert_eq!(record.layout[0].divisor, 1);
        assert_eq!(record.draws.len(), 1);
        assert_eq!(buffer.size(), 12);
        assert_eq!(factory.total_draws(), 1);
    }

    #[test]
    fn texture_rejects_invalid_images() {
        let factory = HeadlessTextureFactory::default();
        let mut texture = factory.create_texture("feed");
        assert!(!texture.bind(0));
        assert!(!texture.allocate(&ImageFile::new(2, 2, 4, vec![0u8; 3])));
        assert!(texture.allocate(&ImageFile::new(1, 1, 4, vec![0u8; 4])));
        assert!(texture.bind(0));
        assert!(texture.is_allocated());
        assert_eq!(factory.record(0).map(|r| r.binds), Some(1));
    }
}
