//! Frame data structures for captured camera content

use image::{GrayImage, Luma, RgbaImage};
use imageproc::rect::Rect;
use std::time::Instant;

/// A captured frame from the camera
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when the frame was acquired
    pub timestamp: Instant,
}

impl Frame {
    /// Create a new frame from raw RGBA data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Convert the frame to grayscale
    pub fn to_gray(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width, self.height);

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = ((y * self.width + x) * 4) as usize;
                if idx + 2 < self.data.len() {
                    let r = self.data[idx] as f32;
                    let g = self.data[idx + 1] as f32;
                    let b = self.data[idx + 2] as f32;
                    // Standard grayscale conversion
                    let gray_val = (0.299 * r + 0.587 * g + 0.114 * b) as u8;
                    gray.put_pixel(x, y, Luma([gray_val]));
                }
            }
        }

        gray
    }

    /// Crop an axis-aligned sub-rectangle out of the frame.
    ///
    /// The rectangle is intersected with the frame bounds first, so a guide
    /// larger than the frame yields the overlapping portion rather than a
    /// panic.
    pub fn crop(&self, rect: Rect) -> RgbaImage {
        let x1 = rect.left().max(0) as u32;
        let y1 = rect.top().max(0) as u32;
        let x2 = (rect.left() + rect.width() as i32).clamp(0, self.width as i32) as u32;
        let y2 = (rect.top() + rect.height() as i32).clamp(0, self.height as i32) as u32;

        if x2 <= x1 || y2 <= y1 {
            return RgbaImage::new(0, 0);
        }

        RgbaImage::from_fn(x2 - x1, y2 - y1, |x, y| {
            let idx = (((y1 + y) * self.width + (x1 + x)) * 4) as usize;
            image::Rgba([
                self.data[idx],
                self.data[idx + 1],
                self.data[idx + 2],
                self.data[idx + 3],
            ])
        })
    }
}
