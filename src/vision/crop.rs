//! Screen-region cropping
//!
//! Sampling rectangles are stored as fractions of the screen **width** so that
//! the same configuration works across devices as long as the game is laid
//! out against the width (which is how the game scales its portrait UI).

use image::{GenericImageView, SubImage};
use serde::{Deserialize, Serialize};

use super::VisionError;

/// A screen-resolution independent rectangle.
///
/// All four values are fractions of the frame width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SamplingRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check that every component lies in `[0, 1]` and the size is positive.
    ///
    /// `y + height` is allowed to exceed 1 since the height of a portrait
    /// screen is larger than its width.
    pub fn is_valid(&self) -> bool {
        let in_unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        in_unit(self.x)
            && in_unit(self.y)
            && in_unit(self.width)
            && in_unit(self.height)
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0
    }

    /// Resolve this rect into pixel coordinates for a frame of the given size.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> Result<PixelRect, VisionError> {
        let scale = frame_width as f32;
        let x = (scale * self.x).round() as i64;
        let y = (scale * self.y).round() as i64;
        let width = (scale * self.width).round() as i64;
        let height = (scale * self.height).round() as i64;

        if width <= 0
            || height <= 0
            || x < 0
            || y < 0
            || x + width > frame_width as i64
            || y + height > frame_height as i64
        {
            return Err(VisionError::InvalidRegion {
                x,
                y,
                width,
                height,
                frame_width,
                frame_height,
            });
        }

        Ok(PixelRect {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// A rectangle in pixel coordinates, already checked against a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Crop `rect` out of `image` without copying.
pub fn crop<'a, I>(image: &'a I, rect: &SamplingRect) -> Result<SubImage<&'a I>, VisionError>
where
    I: GenericImageView,
{
    let (w, h) = image.dimensions();
    let px = rect.to_pixels(w, h)?;
    Ok(image::imageops::crop_imm(image, px.x, px.y, px.width, px.height))
}

/// Something that owns a sampling rect and can cut it out of a frame.
pub trait ScreenCropper {
    fn sampling_rect(&self) -> &SamplingRect;

    fn crop<'a, I>(&self, image: &'a I) -> Result<SubImage<&'a I>, VisionError>
    where
        I: GenericImageView,
    {
        crop(image, self.sampling_rect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba, RgbaImage};

    fn frame(width: u32, height: u32) -> RgbaImage {
        ImageBuffer::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255]))
    }

    #[test]
    fn test_crop_dimensions_follow_width() {
        let img = frame(720, 1280);
        let rect = SamplingRect::new(0.1, 0.5, 0.25, 0.1);
        let sub = crop(&img, &rect).unwrap();

        assert_eq!(sub.dimensions(), (180, 72));
        // origin is at (72, 360)
        assert_eq!(sub.get_pixel(0, 0), Rgba([72, 104, 0, 255]));
    }

    #[test]
    fn test_crop_rounds_fractions() {
        let img = frame(101, 101);
        let rect = SamplingRect::new(0.0, 0.0, 0.505, 0.334);
        let sub = crop(&img, &rect).unwrap();
        // 101 * 0.505 = 51.005, 101 * 0.334 = 33.734
        assert_eq!(sub.dimensions(), (51, 34));
    }

    #[test]
    fn test_crop_is_idempotent() {
        let img = frame(400, 700);
        let rect = SamplingRect::new(0.2, 0.3, 0.5, 0.2);
        let a = crop(&img, &rect).unwrap().to_image();
        let b = crop(&img, &rect).unwrap().to_image();
        assert_eq!(a, b);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        // landscape frame: y scaled by width runs past the bottom
        let img = frame(1280, 720);
        let rect = SamplingRect::new(0.0, 0.5, 0.5, 0.2);
        assert!(matches!(
            crop(&img, &rect),
            Err(VisionError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_crop_zero_size() {
        let img = frame(10, 10);
        let rect = SamplingRect::new(0.0, 0.0, 0.01, 0.5);
        assert!(crop(&img, &rect).is_err());
    }

    #[test]
    fn test_rect_validation() {
        assert!(!SamplingRect::new(0.0, 0.0, 1.0, 1.5).is_valid());
        assert!(SamplingRect::new(0.1, 0.2, 0.3, 0.4).is_valid());
        assert!(!SamplingRect::new(0.8, 0.2, 0.3, 0.4).is_valid());
        assert!(!SamplingRect::new(0.1, 0.2, 0.0, 0.4).is_valid());
        assert!(!SamplingRect::new(f32::NAN, 0.2, 0.1, 0.4).is_valid());
    }
}
