//! Template matching
//!
//! Frames are cropped to a sampling rect and scaled back to the screen width
//! the templates were captured at, then scored with a zero-mean normalized
//! cross-correlation. The score is the best correlation anywhere in the
//! cropped region, so templates only need a roughly known location.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage};
use imageproc::template_matching::{match_template, MatchTemplateMethod};

use super::capture::Frame;
use super::crop::{SamplingRect, ScreenCropper};
use super::{VisionError, BINARY_THRESHOLD};

/// Color conversion applied as the last pre-processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorConversion {
    /// Plain grayscale
    #[default]
    Luma,
    /// Grayscale, then pixels brighter than `threshold` become black and
    /// everything else white
    BinaryInverted { threshold: u8 },
}

impl ColorConversion {
    pub fn binary_inverted() -> Self {
        ColorConversion::BinaryInverted {
            threshold: BINARY_THRESHOLD,
        }
    }

    pub fn apply(&self, gray: GrayImage) -> GrayImage {
        match *self {
            ColorConversion::Luma => gray,
            ColorConversion::BinaryInverted { threshold } => binarize_inverted(gray, threshold),
        }
    }
}

/// Pixels above `threshold` map to 0, the rest to 255.
pub fn binarize_inverted(mut gray: GrayImage, threshold: u8) -> GrayImage {
    for p in gray.pixels_mut() {
        p[0] = if p[0] > threshold { 0 } else { 255 };
    }
    gray
}

/// A named grayscale reference image.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    image: GrayImage,
}

impl Template {
    pub fn new(name: impl Into<String>, image: GrayImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Build a template from any decoded image, converting it to grayscale.
    pub fn from_image(name: impl Into<String>, image: &DynamicImage) -> Self {
        Self::new(name, image.to_luma8())
    }

    /// Build a template resized to `width`, keeping the aspect ratio.
    pub fn resized(name: impl Into<String>, image: &DynamicImage, width: u32) -> Self {
        let (w, h) = image.dimensions();
        let height = ((h as f64 * width as f64 / w.max(1) as f64).round() as u32).max(1);
        let gray = image.to_luma8();
        let resized = if (w, h) == (width, height) {
            gray
        } else {
            image::imageops::resize(&gray, width.max(1), height, FilterType::Triangle)
        };
        Self::new(name, resized)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Crops, rescales and scores frames against templates.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    rect: SamplingRect,
    /// Screen width the templates were captured at
    origin_width: f32,
    conversion: ColorConversion,
}

impl ScreenCropper for TemplateMatcher {
    fn sampling_rect(&self) -> &SamplingRect {
        &self.rect
    }
}

impl TemplateMatcher {
    pub fn new(rect: SamplingRect, origin_width: f32, conversion: ColorConversion) -> Self {
        Self {
            rect,
            origin_width,
            conversion,
        }
    }

    pub fn origin_width(&self) -> f32 {
        self.origin_width
    }

    /// Crop the sampling rect and normalize it to the template scale.
    pub fn pre_process(&self, frame: &Frame) -> Result<GrayImage, VisionError> {
        let cropped = self.crop(frame.image())?;
        let scale = self.origin_width / frame.width() as f32;
        let (cw, ch) = cropped.dimensions();
        let width = ((cw as f32 * scale).round() as u32).max(1);
        let height = ((ch as f32 * scale).round() as u32).max(1);

        let resized = if (width, height) == (cw, ch) {
            cropped.to_image()
        } else {
            image::imageops::resize(&*cropped, width, height, FilterType::Triangle)
        };

        Ok(self.conversion.apply(image::imageops::grayscale(&resized)))
    }

    /// Best correlation of `template` anywhere inside `image`, in `[0, 1]`.
    pub fn match_score(&self, image: &GrayImage, template: &Template) -> Result<f32, VisionError> {
        let (iw, ih) = image.dimensions();
        let (tw, th) = template.dimensions();
        if tw > iw || th > ih || tw == 0 || th == 0 {
            return Err(VisionError::TemplateTooLarge {
                name: template.name().to_string(),
                template_width: tw,
                template_height: th,
                image_width: iw,
                image_height: ih,
            });
        }

        Ok(max_correlation(image, template.image()))
    }
}

/// Zero-mean normalized cross-correlation, maximized over all positions.
///
/// Windows or templates without any variance cannot correlate and score 0.
/// Negative correlations are clamped to 0.
fn max_correlation(image: &GrayImage, template: &GrayImage) -> f32 {
    let (tw, th) = template.dimensions();
    let n = (tw as f64) * (th as f64);

    let (t_sum, t_sq) = template.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });
    let t_var = t_sq - t_sum * t_sum / n;
    if t_var <= f64::EPSILON {
        return 0.0;
    }

    let cross = match_template(image, template, MatchTemplateMethod::CrossCorrelation);
    let table = SummedArea::new(image);

    let mut best = 0.0f64;
    for (x, y, value) in cross.enumerate_pixels() {
        let (w_sum, w_sq) = table.window(x, y, tw, th);
        let w_var = w_sq - w_sum * w_sum / n;
        if w_var <= f64::EPSILON {
            continue;
        }
        let numerator = value[0] as f64 - t_sum * w_sum / n;
        let score = numerator / (t_var * w_var).sqrt();
        if score > best {
            best = score;
        }
    }

    best.min(1.0) as f32
}

/// Summed-area tables of pixel values and squared pixel values.
struct SummedArea {
    stride: usize,
    sum: Vec<u64>,
    sq: Vec<u64>,
}

impl SummedArea {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let stride = w as usize + 1;
        let mut sum = vec![0u64; stride * (h as usize + 1)];
        let mut sq = vec![0u64; stride * (h as usize + 1)];

        for y in 0..h as usize {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w as usize {
                let v = image.get_pixel(x as u32, y as u32)[0] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq[idx] = sq[idx - stride] + row_sq;
            }
        }

        Self { stride, sum, sq }
    }

    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let at = |table: &[u64], x: usize, y: usize| table[y * self.stride + x];
        let area = |table: &[u64]| {
            (at(table, x1, y1) + at(table, x0, y0)) - (at(table, x0, y1) + at(table, x1, y0))
        };
        (area(&self.sum) as f64, area(&self.sq) as f64)
    }
}
