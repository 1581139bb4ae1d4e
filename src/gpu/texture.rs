//! Decoded images and the texture contract consumed by texture-backed
//! drawables.

use std::sync::Arc;

/// A decoded image as produced by an external loader.
///
/// Pixel data is shared so a loader thread can hand it to the render thread
/// without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per pixel (1 = grey, 3 = RGB, 4 = RGBA).
    pub components: u32,
    /// Tightly packed rows, top row first.
    pub data: Arc<[u8]>,
}

impl ImageFile {
    /// Wrap decoded pixel data.
    #[must_use]
    pub fn new(width: u32, height: u32, components: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            components,
            data: data.into(),
        }
    }

    /// Whether the header agrees with the payload and the pixel format is
    /// one a texture can hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self.components, 1 | 3 | 4)
            && self.width > 0
            && self.height > 0
            && self.data.len()
                == self.width as usize * self.height as usize * self.components as usize
    }

    /// Pixel data expanded to RGBA8.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.components {
            4 => self.data.to_vec(),
            3 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                .collect(),
            _ => self
                .data
                .iter()
                .flat_map(|&g| [g, g, g, u8::MAX])
                .collect(),
        }
    }

    /// Width over height, or 1 for a degenerate image.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// A sampled GPU texture.
pub trait Texture {
    /// Upload `image`. Returns `false` if the image is unusable.
    fn allocate(&mut self, image: &ImageFile) -> bool;

    /// Bind to texture `unit` for the next draw. Returns `false` if nothing
    /// has been allocated yet.
    fn bind(&mut self, unit: u32) -> bool;

    /// Whether an image has been uploaded.
    fn is_allocated(&self) -> bool;
}

/// Produces textures for texture-backed drawables.
pub trait TextureFactory {
    /// A fresh, unallocated texture.
    fn create_texture(&self, label: &str) -> Box<dyn Texture>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_must_match_payload() {
        let ok = ImageFile::new(2, 1, 3, vec![0u8; 6]);
        assert!(ok.is_valid());
        let short = ImageFile::new(2, 2, 3, vec![0u8; 6]);
        assert!(!short.is_valid());
        let odd_format = ImageFile::new(1, 1, 2, vec![0u8; 2]);
        assert!(!odd_format.is_valid());
    }

    #[test]
    fn rgb_and_grey_expand_to_rgba() {
        let rgb = ImageFile::new(1, 1, 3, vec![1u8, 2, 3]);
        assert_eq!(rgb.to_rgba8(), vec![1, 2, 3, 255]);
        let grey = ImageFile::new(2, 1, 1, vec![7u8, 9]);
        assert_eq!(grey.to_rgba8(), vec![7, 7, 7, 255, 9, 9, 9, 255]);
        assert_eq!(grey.aspect_ratio(), 2.0);
    }
}
