//! # Pixel Buffers
//!
//! [`PixelBuffer`] is the one pixel surface type used everywhere in the engine:
//! the decoded source, the downscaled preview source, the three scratch buffers
//! of the render pool and the full-resolution export output.
//!
//! Pixels are RGBA8, tightly packed (stride is always `width * 4`), row-major.

use craft_scale::presets::Size;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A fixed-dimension RGBA8 pixel surface.
///
/// The dimensions are fixed at construction; only the pixel bytes are mutable.
/// Buffers shared with a consumer are handed out as `Arc<PixelBuffer>`, which
/// makes them read-only for as long as any clone is alive.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed (transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Allocate a buffer with the same dimensions as `other`.
    pub fn same_size_as(other: &PixelBuffer) -> Self {
        Self::new(other.width, other.height)
    }

    /// Wrap existing RGBA8 bytes. Returns `None` if the length does not match.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * BYTES_PER_PIXEL).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Allocate a buffer filled with a single RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut buffer = Self::new(width, height);
        for px in buffer.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
        buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size {
            w: self.width,
            h: self.height,
        }
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// RGBA value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy all pixels from a buffer of identical dimensions.
    ///
    /// Returns `false` without touching `self` when the dimensions differ.
    pub fn copy_from(&mut self, other: &PixelBuffer) -> bool {
        if self.size() != other.size() {
            return false;
        }
        self.data.copy_from_slice(&other.data);
        true
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_checks_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn filled_and_pixel_lookup() {
        let buffer = PixelBuffer::filled(3, 2, [1, 2, 3, 4]);
        assert_eq!(buffer.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(buffer.pixel(3, 0), None);
        assert_eq!(buffer.stride(), 12);
        assert_eq!(buffer.pixel_count(), 6);
    }

    #[test]
    fn copy_from_requires_matching_size() {
        let source = PixelBuffer::filled(2, 2, [9, 9, 9, 255]);
        let mut same = PixelBuffer::same_size_as(&source);
        assert!(same.copy_from(&source));
        assert_eq!(same, source);

        let mut other = PixelBuffer::new(3, 2);
        assert!(!other.copy_from(&source));
        assert!(other.as_bytes().iter().all(|b| *b == 0));
    }
}
