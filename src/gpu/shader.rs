//! Shader program contract.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// A value that can be written to a shader uniform.
///
/// Every variant fits in one 64-byte uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Scalar float.
    Float(f32),
    /// Scalar signed integer.
    Int(i32),
    /// Two-component vector.
    Vec2(Vec2),
    /// Three-component vector.
    Vec3(Vec3),
    /// Four-component vector.
    Vec4(Vec4),
    /// Column-major 4x4 matrix.
    Mat4(Mat4),
}

impl UniformValue {
    /// Raw little-endian bytes as laid out in a std140 uniform slot.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Float(v) => bytemuck::bytes_of(v).to_vec(),
            Self::Int(v) => bytemuck::bytes_of(v).to_vec(),
            Self::Vec2(v) => bytemuck::bytes_of(v).to_vec(),
            Self::Vec3(v) => bytemuck::bytes_of(v).to_vec(),
            Self::Vec4(v) => bytemuck::bytes_of(v).to_vec(),
            Self::Mat4(v) => bytemuck::bytes_of(v).to_vec(),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        Self::Mat4(v)
    }
}

/// A compiled shader program shared by many drawables.
///
/// Methods take `&self`: a program is shared read-only after construction
/// and implementations keep their uniform staging behind interior
/// mutability.
pub trait Shader {
    /// Human-readable label used in diagnostics.
    fn label(&self) -> &str;

    /// Make this program current for subsequent draws. Returns `false` if
    /// the program is not ready (not linked, pipeline missing).
    fn use_program(&self) -> bool;

    /// Location of a vertex attribute, if the program declares it.
    fn attribute_location(&self, name: &str) -> Option<u32>;

    /// Location of a uniform, if the program declares it.
    fn uniform_location(&self, name: &str) -> Option<u32>;

    /// Write `value` to the uniform at `location`.
    fn set_value(&self, location: u32, value: UniformValue);

    /// Look up `name` and write `value` to it. Returns `false` when the
    /// program has no such uniform.
    fn set_named(&self, name: &str, value: UniformValue) -> bool {
        match self.uniform_location(name) {
            Some(location) => {
                self.set_value(location, value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_bytes_match_component_count() {
        assert_eq!(UniformValue::Float(1.0).to_bytes().len(), 4);
        assert_eq!(UniformValue::from(Vec3::ONE).to_bytes().len(), 12);
        assert_eq!(UniformValue::from(Mat4::IDENTITY).to_bytes().len(), 64);
    }
}
