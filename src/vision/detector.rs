//! Screen detectors
//!
//! [`GameHeaderDetector`] is a cheap gate run on every frame; only frames that
//! pass it go on to [`EventTypeDetector`] and the rest of the pipeline.

use crate::config::MatcherSettings;
use crate::event::EventCategory;

use super::capture::Frame;
use super::matcher::{ColorConversion, Template, TemplateMatcher};
use super::VisionError;

/// Detects whether a frame shows the game at all.
pub struct GameHeaderDetector {
    matcher: TemplateMatcher,
    template: Template,
    threshold: f32,
}

impl GameHeaderDetector {
    pub fn new(settings: &MatcherSettings, template: Template) -> Self {
        Self {
            matcher: TemplateMatcher::new(
                settings.sampling,
                settings.origin_width,
                ColorConversion::Luma,
            ),
            template,
            threshold: settings.threshold,
        }
    }

    pub fn score(&self, frame: &Frame) -> Result<f32, VisionError> {
        let img = self.matcher.pre_process(frame)?;
        self.matcher.match_score(&img, &self.template)
    }

    pub fn detect(&self, frame: &Frame) -> Result<bool, VisionError> {
        let score = self.score(frame)?;
        log::debug!("game header score {:.3}", score);
        Ok(score > self.threshold)
    }
}

/// Classifies which kind of event is shown.
pub struct EventTypeDetector {
    matcher: TemplateMatcher,
    /// Checked in order; the first one above the threshold wins
    templates: [(EventCategory, Template); 3],
    threshold: f32,
}

impl EventTypeDetector {
    pub fn new(
        settings: &MatcherSettings,
        chara: Template,
        support: Template,
        scenario: Template,
    ) -> Self {
        Self {
            matcher: TemplateMatcher::new(
                settings.sampling,
                settings.origin_width,
                ColorConversion::binary_inverted(),
            ),
            templates: [
                (EventCategory::Chara, chara),
                (EventCategory::Support, support),
                (EventCategory::Scenario, scenario),
            ],
            threshold: settings.threshold,
        }
    }

    pub fn detect(&self, frame: &Frame) -> Result<Option<EventCategory>, VisionError> {
        let img = self.matcher.pre_process(frame)?;
        for (category, template) in &self.templates {
            let score = self.matcher.match_score(&img, template)?;
            if score > self.threshold {
                log::debug!("event type {:?} score {:.3}", category, score);
                return Ok(Some(*category));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::SamplingRect;
    use image::{GrayImage, ImageBuffer, Rgba, RgbaImage};

    const WIDTH: u32 = 120;

    fn settings() -> MatcherSettings {
        MatcherSettings {
            sampling: SamplingRect::new(0.0, 0.0, 1.0, 0.5),
            origin_width: WIDTH as f32,
            threshold: 0.9,
        }
    }

    /// A frame with a white glyph drawn by `ink` on a dark background.
    fn frame_with(ink: impl Fn(u32, u32) -> bool) -> Frame {
        let image: RgbaImage = ImageBuffer::from_fn(WIDTH, 180, |x, y| {
            if ink(x, y) {
                Rgba([250, 250, 250, 255])
            } else {
                Rgba([30, 40, 60, 255])
            }
        });
        Frame::from_image(image)
    }

    fn cross(x: u32, y: u32) -> bool {
        (x >= 20 && x < 50 && y >= 28 && y < 32) || (y >= 15 && y < 45 && x >= 33 && x < 37)
    }

    fn bar(x: u32, y: u32) -> bool {
        x >= 60 && x < 100 && y >= 10 && y < 20
    }

    fn ring(x: u32, y: u32) -> bool {
        let (dx, dy) = (x as i32 - 80, y as i32 - 35);
        let d = dx * dx + dy * dy;
        (100..200).contains(&d)
    }

    /// Template cut from the processed region of a frame.
    fn template_from(frame: &Frame, conversion: ColorConversion, x: u32, y: u32) -> Template {
        let m = TemplateMatcher::new(settings().sampling, WIDTH as f32, conversion);
        let processed: GrayImage = m.pre_process(frame).unwrap();
        Template::new("t", image::imageops::crop_imm(&processed, x, y, 50, 40).to_image())
    }

    #[test]
    fn test_header_detection() {
        let game = frame_with(cross);
        let template = template_from(&game, ColorConversion::Luma, 10, 10);
        let detector = GameHeaderDetector::new(&settings(), template);

        assert!(detector.detect(&game).unwrap());

        let blank = frame_with(|_, _| false);
        assert!(!detector.detect(&blank).unwrap());
    }

    #[test]
    fn test_header_detection_invalid_region() {
        let template = Template::new("t", GrayImage::new(4, 4));
        let detector = GameHeaderDetector::new(&settings(), template);
        // landscape frame is too short for the sampling rect
        let frame = Frame::from_image(RgbaImage::new(WIDTH, 40));
        assert!(matches!(
            detector.detect(&frame),
            Err(VisionError::InvalidRegion { .. })
        ));
    }

    fn type_detector() -> EventTypeDetector {
        let conversion = ColorConversion::binary_inverted();
        EventTypeDetector::new(
            &settings(),
            template_from(&frame_with(cross), conversion, 10, 10),
            template_from(&frame_with(bar), conversion, 55, 0),
            template_from(&frame_with(ring), conversion, 55, 15),
        )
    }

    #[test]
    fn test_event_type_classification() {
        let detector = type_detector();
        assert_eq!(
            detector.detect(&frame_with(cross)).unwrap(),
            Some(EventCategory::Chara)
        );
        assert_eq!(
            detector.detect(&frame_with(bar)).unwrap(),
            Some(EventCategory::Support)
        );
        assert_eq!(
            detector.detect(&frame_with(ring)).unwrap(),
            Some(EventCategory::Scenario)
        );
        assert_eq!(detector.detect(&frame_with(|_, _| false)).unwrap(), None);
    }

    #[test]
    fn test_event_type_first_match_wins() {
        // both the chara and the support glyph are visible
        let detector = type_detector();
        let both = frame_with(|x, y| cross(x, y) || bar(x, y));
        assert_eq!(detector.detect(&both).unwrap(), Some(EventCategory::Chara));
    }
}
