//! Event title extraction
//!
//! Produces the monochrome image handed to the OCR engine. Character events
//! draw a small outfit icon over the left edge of the title; when it is
//! present the title is re-cropped past it.

use image::imageops::FilterType;
use image::{GenericImageView, GrayImage};

use crate::config::TitleSettings;
use crate::event::EventCategory;

use super::capture::Frame;
use super::crop::{SamplingRect, ScreenCropper};
use super::matcher::binarize_inverted;
use super::{VisionError, BINARY_THRESHOLD};

pub struct EventTitleProcessor {
    settings: TitleSettings,
}

impl ScreenCropper for EventTitleProcessor {
    fn sampling_rect(&self) -> &SamplingRect {
        &self.settings.sampling
    }
}

impl EventTitleProcessor {
    pub fn new(settings: TitleSettings) -> Self {
        Self { settings }
    }

    pub fn pre_process(
        &self,
        frame: &Frame,
        category: EventCategory,
    ) -> Result<GrayImage, VisionError> {
        let cropped = self.crop(frame.image())?;
        let mut gray = image::imageops::grayscale(&*cropped);

        if category == EventCategory::Chara && self.has_icon(&gray, frame.width())? {
            log::debug!("outfit icon removed from title");
            let offset = (frame.width() as f32 * self.settings.resampling_offset_x).round() as u32;
            if offset >= gray.width() {
                return Err(self.inner_region_error(offset, gray.width(), &gray));
            }
            gray =
                image::imageops::crop_imm(&gray, offset, 0, gray.width() - offset, gray.height())
                    .to_image();
        }

        let upscaled = image::imageops::resize(
            &gray,
            gray.width() * 2,
            gray.height() * 2,
            FilterType::CatmullRom,
        );
        Ok(binarize_inverted(upscaled, BINARY_THRESHOLD))
    }

    /// Mean brightness of the icon patch is above the threshold.
    fn has_icon(&self, gray: &GrayImage, frame_width: u32) -> Result<bool, VisionError> {
        let x = (frame_width as f32 * self.settings.icon_sampling_x).round() as u32;
        let width = self.settings.icon_sampling_width;
        let fits = matches!(x.checked_add(width), Some(end) if end <= gray.width());
        if width == 0 || !fits {
            return Err(self.inner_region_error(x, width, gray));
        }

        let patch = gray.view(x, 0, width, gray.height());
        let sum: u64 = patch.pixels().map(|(_, _, p)| p[0] as u64).sum();
        let mean = sum as f32 / (width * gray.height()) as f32;
        Ok(mean > self.settings.icon_threshold)
    }

    fn inner_region_error(&self, x: u32, width: u32, gray: &GrayImage) -> VisionError {
        VisionError::InvalidRegion {
            x: x as i64,
            y: 0,
            width: width as i64,
            height: gray.height() as i64,
            frame_width: gray.width(),
            frame_height: gray.height(),
        }
    }
}
