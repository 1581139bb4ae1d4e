//! Vertex buffer contract.
//!
//! Mirrors the retained-mode vertex array model: a buffer is created once,
//! filled with interleaved vertex data, described attribute by attribute and
//! then drawn while bound.

/// Expected update frequency of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times.
    #[default]
    Static,
    /// Re-uploaded often.
    Dynamic,
    /// Re-uploaded every frame.
    Stream,
}

/// Primitive topology of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Individual points.
    Points,
    /// Independent line segments.
    Lines,
    /// Connected line strip.
    LineStrip,
    /// Line strip with adjacency (one extra vertex at each end).
    LineStripAdjacency,
    /// Independent triangles.
    Triangles,
    /// Connected triangle strip.
    TriangleStrip,
}

/// Layout of one vertex attribute inside the interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    /// Attribute slot.
    pub index: u32,
    /// Number of `f32` components.
    pub components: u32,
    /// Byte offset of the first element.
    pub offset: usize,
    /// Byte distance between consecutive elements.
    pub stride: usize,
    /// 0 = per vertex, n = advance once every n instances.
    pub divisor: u32,
}

/// A GPU vertex buffer exclusively owned by one drawable.
pub trait Buffer {
    /// Create the underlying GPU object. Returns `false` on failure.
    fn create(&mut self) -> bool;

    /// Bind for attribute setup and drawing.
    fn vertex_bind(&mut self);

    /// Release the binding.
    fn vertex_release(&mut self);

    /// Replace the buffer contents with `data`.
    fn allocate_array(&mut self, data: &[u8], usage: BufferUsage);

    /// Describe attribute `index` as `components` floats at `offset` with
    /// `stride`, advanced per vertex.
    fn attribute_buffer(
        &mut self,
        index: u32,
        components: u32,
        offset: usize,
        stride: usize,
    );

    /// Advance attribute `index` once every `divisor` instances.
    fn attribute_divisor(&mut self, index: u32, divisor: u32);

    /// Enable attribute `index`.
    fn enable(&mut self, index: u32);

    /// Disable attribute `index`.
    fn disable(&mut self, index: u32);

    /// Issue a draw of `count` vertices starting at `first`, repeated
    /// `instances` times, with the currently bound program.
    fn draw(&mut self, primitive: Primitive, first: u32, count: u32, instances: u32);

    /// Bytes currently allocated.
    fn size(&self) -> usize;
}

/// Produces buffers for newly added drawables.
pub trait BufferFactory {
    /// A fresh, not yet created buffer.
    fn create_buffer(&self, label: &str) -> Box<dyn Buffer>;
}

/// Describe every `(index, components)` pair as consecutive float
/// attributes of one interleaved vertex of `stride` bytes, and enable them.
pub fn describe_interleaved(
    buffer: &mut dyn Buffer,
    attributes: &[(u32, u32)],
    stride: usize,
    base_offset: usize,
) {
    let mut offset = base_offset;
    for &(index, components) in attributes {
        buffer.attribute_buffer(index, components, offset, stride);
        buffer.enable(index);
        offset += components as usize * size_of::<f32>();
    }
}
