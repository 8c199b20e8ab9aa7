//! Screen capture handling
//!
//! Receives raw RGBA screen capture buffers and turns them into frames the
//! recognition pipeline can work on.

use std::sync::Arc;

use image::{ImageBuffer, RgbaImage};
use serde::{Deserialize, Serialize};

use super::VisionError;

/// One captured screen image.
///
/// Cheap to clone; the pixel buffer is shared and never mutated.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
}

impl Frame {
    /// Create a frame from tightly packed RGBA bytes.
    pub fn from_raw(frame_data: &[u8], width: u32, height: u32) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidFrameSize { width, height });
        }

        let expected = (width as usize) * (height as usize) * 4;
        if frame_data.len() != expected {
            return Err(VisionError::InvalidFrameData {
                expected,
                actual: frame_data.len(),
            });
        }

        let image: RgbaImage = ImageBuffer::from_raw(width, height, frame_data.to_vec()).ok_or(
            VisionError::InvalidFrameData {
                expected,
                actual: frame_data.len(),
            },
        )?;

        Ok(Self::from_image(image))
    }

    /// Create a frame from an RGBA buffer whose rows are padded.
    ///
    /// Capture surfaces often hand out rows longer than `4 * width` bytes.
    /// The last row may omit its padding.
    pub fn from_padded_rgba(
        frame_data: &[u8],
        row_stride: usize,
        width: u32,
        height: u32,
    ) -> Result<Self, VisionError> {
        let row_bytes = width as usize * 4;
        if width == 0 || height == 0 || row_stride < row_bytes {
            return Err(VisionError::InvalidFrameSize { width, height });
        }

        let expected = row_stride * (height as usize - 1) + row_bytes;
        if frame_data.len() < expected {
            return Err(VisionError::InvalidFrameData {
                expected,
                actual: frame_data.len(),
            });
        }

        let mut packed = Vec::with_capacity(row_bytes * height as usize);
        for row in frame_data.chunks(row_stride).take(height as usize) {
            packed.extend_from_slice(&row[..row_bytes]);
        }

        Self::from_raw(&packed, width, height)
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// System UI geometry of the captured screen, in captured pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenMetrics {
    /// Height of the status bar at the top of the capture
    pub status_bar_height: u32,
    /// Height of the navigation bar at the bottom of the capture
    pub navigation_bar_height: u32,
}

impl ScreenMetrics {
    /// Remove the status bar and navigation bar from a capture.
    pub fn crop_content(&self, frame: &Frame) -> Result<Frame, VisionError> {
        if self.status_bar_height == 0 && self.navigation_bar_height == 0 {
            return Ok(frame.clone());
        }

        let (width, height) = frame.dimensions();
        let bars = self
            .status_bar_height
            .saturating_add(self.navigation_bar_height);
        if bars >= height {
            return Err(VisionError::InvalidRegion {
                x: 0,
                y: self.status_bar_height as i64,
                width: width as i64,
                height: height as i64 - bars as i64,
                frame_width: width,
                frame_height: height,
            });
        }

        let content = image::imageops::crop_imm(
            frame.image(),
            0,
            self.status_bar_height,
            width,
            height - bars,
        )
        .to_image();
        Ok(Frame::from_image(content))
    }
}
