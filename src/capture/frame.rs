//! Frame data structures for captured camera content

use std::time::Instant;

/// A recognition-ready snapshot of the scan region
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Raw RGB pixel data
    pub data: Vec<u8>,
    /// Snapshot width in pixels
    pub width: u32,
    /// Snapshot height in pixels
    pub height: u32,
    /// Timestamp when the source frame was read
    pub timestamp: Instant,
}

impl Snapshot {
    /// Create a new snapshot
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Get snapshot dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// View the pixel data as an owned RGB image
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// A downscaled RGBA frame for the live UI preview
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    /// RGBA pixel data, ready for texture upload
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}
