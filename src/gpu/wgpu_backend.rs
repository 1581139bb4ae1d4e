//! wgpu implementation of the collaborator contracts.
//!
//! The contracts follow a bind-then-draw state machine, while wgpu wants
//! everything inside a render pass. [`FrameRecorder`] bridges the two: a
//! [`WgpuShader`] marks itself current on `use_program`, [`WgpuBuffer`]
//! records a draw together with a snapshot of the current uniforms, and the
//! host replays the recorded frame into its own render pass.
//!
//! Pipelines are authored by the host and installed per primitive with
//! [`WgpuShader::set_pipeline`]; they must use
//! [`FrameRecorder::uniform_layout`] as bind group 0 and
//! [`FrameRecorder::texture_layout`] as bind group 1.

use std::borrow::Cow;
use std::cell::RefCell;
use std::num::NonZeroU64;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::buffer::{AttributeLayout, Buffer, BufferFactory, BufferUsage, Primitive};
use super::shader::{Shader, UniformValue};
use super::texture::{ImageFile, Texture, TextureFactory};
use super::{Backend, ShaderSet};
use crate::options::RenderOptions;

/// Bytes reserved per uniform location.
const UNIFORM_SLOT: usize = 64;
/// Uniform locations per program.
const UNIFORM_SLOTS: usize = 32;
/// Size of one uniform snapshot. A multiple of the 256-byte dynamic offset
/// alignment.
pub const UNIFORM_BLOCK_SIZE: usize = UNIFORM_SLOT * UNIFORM_SLOTS;

/// Device and queue supplied by the host application.
#[derive(Debug)]
pub struct GpuContext {
    /// Logical device.
    pub device: wgpu::Device,
    /// Submission queue.
    pub queue: wgpu::Queue,
}

/// Round `data` up to the copy alignment wgpu requires for buffer writes.
fn pad_to_copy_alignment(data: &[u8]) -> Cow<'_, [u8]> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let rem = data.len() % align;
    if rem == 0 {
        Cow::Borrowed(data)
    } else {
        let mut padded = data.to_vec();
        padded.resize(data.len() + align - rem, 0);
        Cow::Owned(padded)
    }
}

/// Vertex attribute descriptors matching a buffer layout, for host-side
/// pipeline creation.
#[must_use]
pub fn vertex_attributes(layout: &[AttributeLayout]) -> Vec<wgpu::VertexAttribute> {
    layout
        .iter()
        .filter_map(|attribute| {
            let format = match attribute.components {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                4 => wgpu::VertexFormat::Float32x4,
                _ => return None,
            };
            Some(wgpu::VertexAttribute {
                format,
                offset: attribute.offset as wgpu::BufferAddress,
                shader_location: attribute.index,
            })
        })
        .collect()
}

struct ProgramState {
    label: String,
    pipelines: RefCell<FxHashMap<Primitive, Rc<wgpu::RenderPipeline>>>,
    uniforms: RefCell<FxHashMap<String, u32>>,
    attributes: RefCell<FxHashMap<String, u32>>,
    staging: RefCell<Vec<u8>>,
}

struct RecordedDraw {
    pipeline: Rc<wgpu::RenderPipeline>,
    buffer: Rc<wgpu::Buffer>,
    instance_offset: Option<u64>,
    texture: Option<Rc<wgpu::BindGroup>>,
    block: usize,
    first: u32,
    count: u32,
    instances: u32,
}

#[derive(Default)]
struct RecorderState {
    program: Option<Rc<ProgramState>>,
    texture: Option<Rc<wgpu::BindGroup>>,
    draws: Vec<RecordedDraw>,
    blocks: Vec<u8>,
}

struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
}

struct RecorderInner {
    context: Rc<GpuContext>,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    state: RefCell<RecorderState>,
    arena: RefCell<Option<UniformArena>>,
}

/// Collects one frame of draws issued through the contracts.
#[derive(Clone)]
pub struct FrameRecorder {
    inner: Rc<RecorderInner>,
}

impl FrameRecorder {
    /// Recorder with its bind group layouts created on `context`.
    #[must_use]
    pub fn new(context: Rc<GpuContext>) -> Self {
        let uniform_layout =
            context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Drawable Uniform Layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: NonZeroU64::new(UNIFORM_BLOCK_SIZE as u64),
                        },
                        count: None,
                    }],
                });
        let texture_layout =
            context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Drawable Texture Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });
        Self {
            inner: Rc::new(RecorderInner {
                context,
                uniform_layout,
                texture_layout,
                state: RefCell::new(RecorderState::default()),
                arena: RefCell::new(None),
            }),
        }
    }

    /// Layout of bind group 0 (per-draw uniform block, dynamic offset).
    #[must_use]
    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.inner.uniform_layout
    }

    /// Layout of bind group 1 (texture + sampler).
    #[must_use]
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.inner.texture_layout
    }

    /// Draws recorded since the last [`FrameRecorder::clear`].
    #[must_use]
    pub fn pending_draws(&self) -> usize {
        self.inner.state.borrow().draws.len()
    }

    fn set_program(&self, program: Rc<ProgramState>) {
        self.inner.state.borrow_mut().program = Some(program);
    }

    fn set_texture(&self, texture: Rc<wgpu::BindGroup>) {
        self.inner.state.borrow_mut().texture = Some(texture);
    }

    fn record(
        &self,
        buffer: &Rc<wgpu::Buffer>,
        instance_offset: Option<u64>,
        primitive: Primitive,
        range: (u32, u32, u32),
    ) {
        let mut state = self.inner.state.borrow_mut();
        let Some(program) = state.program.clone() else {
            log::warn!("draw recorded with no program bound");
            return;
        };
        let Some(pipeline) = program.pipelines.borrow().get(&primitive).cloned() else {
            log::debug!("program '{}' has no {primitive:?} pipeline", program.label);
            return;
        };

        let block = state.blocks.len() / UNIFORM_BLOCK_SIZE;
        let staging = program.staging.borrow();
        state.blocks.extend_from_slice(&staging);
        let texture = state.texture.take();
        let (first, count, instances) = range;
        state.draws.push(RecordedDraw {
            pipeline,
            buffer: Rc::clone(buffer),
            instance_offset,
            texture,
            block,
            first,
            count,
            instances,
        });
    }

    /// Upload the uniform snapshots of every recorded draw. Call once per
    /// frame before [`FrameRecorder::replay`].
    pub fn prepare(&self) {
        let state = self.inner.state.borrow();
        if state.blocks.is_empty() {
            return;
        }
        let needed = state.blocks.len();
        let device = &self.inner.context.device;
        let mut arena = self.inner.arena.borrow_mut();

        let grow = arena.as_ref().is_none_or(|a| a.capacity < needed);
        if grow {
            let capacity = (needed * 2).max(UNIFORM_BLOCK_SIZE * 16);
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Drawable Uniform Arena"),
                size: capacity as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Drawable Uniform Arena"),
                layout: &self.inner.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE as u64),
                    }),
                }],
            });
            *arena = Some(UniformArena {
                buffer,
                bind_group,
                capacity,
            });
        }
        if let Some(arena) = arena.as_ref() {
            self.inner
                .context
                .queue
                .write_buffer(&arena.buffer, 0, &state.blocks);
        }
    }

    /// Replay the recorded draws into `pass`, in recording order. Returns
    /// the number of draws issued.
    pub fn replay(&self, pass: &mut wgpu::RenderPass<'_>) -> usize {
        let state = self.inner.state.borrow();
        let arena = self.inner.arena.borrow();
        let Some(arena) = arena.as_ref() else {
            return 0;
        };

        for draw in &state.draws {
            let offset = (draw.block * UNIFORM_BLOCK_SIZE) as wgpu::DynamicOffset;
            pass.set_pipeline(&draw.pipeline);
            pass.set_bind_group(0, &arena.bind_group, &[offset]);
            if let Some(texture) = &draw.texture {
                pass.set_bind_group(1, texture.as_ref(), &[]);
            }
            pass.set_vertex_buffer(0, draw.buffer.slice(..));
            if let Some(instance_offset) = draw.instance_offset {
                pass.set_vertex_buffer(1, draw.buffer.slice(instance_offset..));
            }
            pass.draw(draw.first..draw.first + draw.count, 0..draw.instances);
        }
        state.draws.len()
    }

    /// Forget the recorded frame.
    pub fn clear(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.draws.clear();
        state.blocks.clear();
        state.texture = None;
        state.program = None;
    }
}

/// A program backed by host-supplied render pipelines.
pub struct WgpuShader {
    program: Rc<ProgramState>,
    recorder: FrameRecorder,
}

impl WgpuShader {
    /// Program with no pipelines yet.
    #[must_use]
    pub fn new(label: &str, recorder: &FrameRecorder) -> Self {
        Self {
            program: Rc::new(ProgramState {
                label: label.to_owned(),
                pipelines: RefCell::new(FxHashMap::default()),
                uniforms: RefCell::new(FxHashMap::default()),
                attributes: RefCell::new(FxHashMap::default()),
                staging: RefCell::new(vec![0; UNIFORM_BLOCK_SIZE]),
            }),
            recorder: recorder.clone(),
        }
    }

    /// Install the pipeline used for `primitive` draws.
    pub fn set_pipeline(&self, primitive: Primitive, pipeline: wgpu::RenderPipeline) {
        let _ = self
            .program
            .pipelines
            .borrow_mut()
            .insert(primitive, Rc::new(pipeline));
    }
}

impl Shader for WgpuShader {
    fn label(&self) -> &str {
        &self.program.label
    }

    fn use_program(&self) -> bool {
        if self.program.pipelines.borrow().is_empty() {
            return false;
        }
        self.recorder.set_program(Rc::clone(&self.program));
        true
    }

    fn attribute_location(&self, name: &str) -> Option<u32> {
        let mut attributes = self.program.attributes.borrow_mut();
        let next = attributes.len() as u32;
        Some(*attributes.entry(name.to_owned()).or_insert(next))
    }

    fn uniform_location(&self, name: &str) -> Option<u32> {
        let mut uniforms = self.program.uniforms.borrow_mut();
        if let Some(&location) = uniforms.get(name) {
            return Some(location);
        }
        if uniforms.len() >= UNIFORM_SLOTS {
            log::warn!(
                "program '{}' is out of uniform slots for '{name}'",
                self.program.label
            );
            return None;
        }
        let location = uniforms.len() as u32;
        let _ = uniforms.insert(name.to_owned(), location);
        Some(location)
    }

    fn set_value(&self, location: u32, value: UniformValue) {
        let start = location as usize * UNIFORM_SLOT;
        let bytes = value.to_bytes();
        let mut staging = self.program.staging.borrow_mut();
        if let Some(slot) = staging.get_mut(start..start + bytes.len()) {
            slot.copy_from_slice(&bytes);
        }
    }
}

/// A growable vertex buffer.
///
/// Grows 2x when an upload exceeds capacity and never shrinks.
pub struct WgpuBuffer {
    context: Rc<GpuContext>,
    recorder: FrameRecorder,
    label: String,
    buffer: Option<Rc<wgpu::Buffer>>,
    capacity: usize,
    len: usize,
    bound: bool,
    layout: Vec<AttributeLayout>,
    enabled: Vec<u32>,
}

impl WgpuBuffer {
    fn allocate(&self, capacity: usize) -> Rc<wgpu::Buffer> {
        Rc::new(self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: capacity as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

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

    /// Attributes described so far, for host-side pipeline creation.
    #[must_use]
    pub fn layout(&self) -> &[AttributeLayout] {
        &self.layout
    }

    fn instance_offset(&self) -> Option<u64> {
        self.layout
            .iter()
            .filter(|a| a.divisor > 0 && self.enabled.contains(&a.index))
            .map(|a| a.offset as u64)
            .min()
    }
}

impl Buffer for WgpuBuffer {
    fn create(&mut self) -> bool {
        if self.buffer.is_none() {
            self.capacity = 64;
            self.buffer = Some(self.allocate(self.capacity));
        }
        true
    }

    fn vertex_bind(&mut self) {
        self.bound = true;
    }

    fn vertex_release(&mut self) {
        self.bound = false;
    }

    fn allocate_array(&mut self, data: &[u8], _usage: BufferUsage) {
        let data = pad_to_copy_alignment(data);
        let needed = data.len();
        if self.buffer.is_none() || needed > self.capacity {
            // 2x growth, minimum 1KB
            let new_capacity = (needed * 2).max(self.capacity + 1024);
            self.buffer = Some(self.allocate(new_capacity));
            self.capacity = new_capacity;
        }
        if let (Some(buffer), true) = (&self.buffer, needed > 0) {
            self.context.queue.write_buffer(buffer, 0, &data);
        }
        self.len = needed;
    }

    fn attribute_buffer(
        &mut self,
        index: u32,
        components: u32,
        offset: usize,
        stride: usize,
    ) {
        let slot = self.layout_mut(index);
        slot.components = components;
        slot.offset = offset;
        slot.stride = stride;
    }

    fn attribute_divisor(&mut self, index: u32, divisor: u32) {
        self.layout_mut(index).divisor = divisor;
    }

    fn enable(&mut self, index: u32) {
        if !self.enabled.contains(&index) {
            self.enabled.push(index);
        }
    }

    fn disable(&mut self, index: u32) {
        self.enabled.retain(|&i| i != index);
    }

    fn draw(&mut self, primitive: Primitive, first: u32, count: u32, instances: u32) {
        let Some(buffer) = self.buffer.as_ref().filter(|_| self.bound) else {
            log::warn!("draw on unbound buffer '{}' ignored", self.label);
            return;
        };
        self.recorder.record(
            buffer,
            self.instance_offset(),
            primitive,
            (first, count, instances),
        );
    }

    fn size(&self) -> usize {
        self.len
    }
}

/// Hands out [`WgpuBuffer`]s sharing one device and recorder.
pub struct WgpuBufferFactory {
    context: Rc<GpuContext>,
    recorder: FrameRecorder,
}

impl BufferFactory for WgpuBufferFactory {
    fn create_buffer(&self, label: &str) -> Box<dyn Buffer> {
        Box::new(WgpuBuffer {
            context: Rc::clone(&self.context),
            recorder: self.recorder.clone(),
            label: label.to_owned(),
            buffer: None,
            capacity: 0,
            len: 0,
            bound: false,
            layout: Vec::new(),
            enabled: Vec::new(),
        })
    }
}

/// Clamp a configured anisotropy to the range wgpu accepts.
fn anisotropy_clamp(render: &RenderOptions) -> u16 {
    render.anisotropy().clamp(1.0, 16.0) as u16
}

/// A sampled RGBA8 texture.
pub struct WgpuTexture {
    context: Rc<GpuContext>,
    recorder: FrameRecorder,
    label: String,
    anisotropy: u16,
    bind_group: Option<Rc<wgpu::BindGroup>>,
}

impl Texture for WgpuTexture {
    fn allocate(&mut self, image: &ImageFile) -> bool {
        if !image.is_valid() {
            log::warn!("texture '{}' rejected a malformed image", self.label);
            return false;
        }
        let device = &self.context.device;
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&self.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.to_rgba8(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&self.label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: self.anisotropy,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.label),
            layout: self.recorder.texture_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        self.bind_group = Some(Rc::new(bind_group));
        true
    }

    fn bind(&mut self, _unit: u32) -> bool {
        match &self.bind_group {
            Some(bind_group) => {
                self.recorder.set_texture(Rc::clone(bind_group));
                true
            }
            None => false,
        }
    }

    fn is_allocated(&self) -> bool {
        self.bind_group.is_some()
    }
}

/// Hands out [`WgpuTexture`]s with the configured anisotropy.
pub struct WgpuTextureFactory {
    context: Rc<GpuContext>,
    recorder: FrameRecorder,
    anisotropy: u16,
}

impl TextureFactory for WgpuTextureFactory {
    fn create_texture(&self, label: &str) -> Box<dyn Texture> {
        Box::new(WgpuTexture {
            context: Rc::clone(&self.context),
            recorder: self.recorder.clone(),
            label: label.to_owned(),
            anisotropy: self.anisotropy,
            bind_group: None,
        })
    }
}

/// Every wgpu-side object needed to build a [`Backend`].
pub struct WgpuBackend {
    /// Shared frame recorder; replay it into the host's render pass.
    pub recorder: FrameRecorder,
    /// Point-cloud program.
    pub point_cloud: Rc<WgpuShader>,
    /// Object program.
    pub objects: Rc<WgpuShader>,
    /// Trajectory program.
    pub trajectories: Rc<WgpuShader>,
    /// Covariance program.
    pub covariance: Rc<WgpuShader>,
    /// Camera-feed program.
    pub camera_feed: Rc<WgpuShader>,
    buffers: Rc<WgpuBufferFactory>,
    textures: Rc<WgpuTextureFactory>,
}

impl WgpuBackend {
    /// Backend on the host's device. Programs start without pipelines and
    /// report not-ready until the host installs them.
    #[must_use]
    pub fn new(context: Rc<GpuContext>, render: &RenderOptions) -> Self {
        let recorder = FrameRecorder::new(Rc::clone(&context));
        let shader = |label: &str| Rc::new(WgpuShader::new(label, &recorder));
        Self {
            point_cloud: shader("point_cloud"),
            objects: shader("objects"),
            trajectories: shader("trajectories"),
            covariance: shader("covariance"),
            camera_feed: shader("camera_feed"),
            buffers: Rc::new(WgpuBufferFactory {
                context: Rc::clone(&context),
                recorder: recorder.clone(),
            }),
            textures: Rc::new(WgpuTextureFactory {
                context,
                recorder: recorder.clone(),
                anisotropy: anisotropy_clamp(render),
            }),
            recorder,
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
