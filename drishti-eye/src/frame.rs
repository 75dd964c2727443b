//! Frame buffer shared by capture, annotation and display

use crate::config::Bgr;
use crate::error::VisionError;
use image::RgbImage;

/// Packed 8-bit BGR image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Black frame of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0])
    }

    /// Frame with every pixel set to `color`
    pub fn filled(width: u32, height: u32, color: Bgr) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&color);
        }
        Self { width, height, data }
    }

    /// Wrap raw BGR bytes; the length must be exactly `width * height * 3`
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self, VisionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|p| p.checked_mul(3))
            .ok_or_else(|| VisionError::Processing("Frame dimensions overflow".to_string()))?;

        if data.len() != expected {
            return Err(VisionError::Processing(format!(
                "Frame buffer has {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }

        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 3)
    }

    /// Pixel at (x, y), or `None` outside the frame
    pub fn pixel(&self, x: i32, y: i32) -> Option<Bgr> {
        self.offset(x, y)
            .map(|i| [self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Set one pixel; coordinates outside the frame are ignored
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Bgr) {
        if let Some(i) = self.offset(x, y) {
            self.data[i..i + 3].copy_from_slice(&color);
        }
    }

    /// Flip left to right in place
    pub fn mirror_horizontal(&mut self) {
        let stride = self.width as usize * 3;
        if stride == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(stride) {
            let width = row.len() / 3;
            for x in 0..width / 2 {
                let left = x * 3;
                let right = (width - 1 - x) * 3;
                for c in 0..3 {
                    row.swap(left + c, right + c);
                }
            }
        }
    }

    /// RGB copy for inference backends
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut rgb = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(3) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        // Length always matches width * height * 3.
        RgbImage::from_raw(self.width, self.height, rgb)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}
