//! Recognition settings
//!
//! Sampling rects, template scales and thresholds for every stage of the
//! recognition pipeline. Defaults are calibrated against the templates
//! captured on a 1080px wide portrait screen.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::vision::{SamplingRect, ScreenMetrics};

/// Lower bound of the frame interval
pub const MIN_UPDATE_INTERVAL_MS: u64 = 100;

/// Main settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gate that tells whether the game is on screen
    pub game_header: MatcherSettings,
    /// Event type icon next to the title
    pub event_type: MatcherSettings,
    /// Title region fed to OCR
    pub event_title: TitleSettings,
    /// Character icon shown on character events
    pub chara_owner: OwnerBankSettings,
    /// Support card icon shown on support events
    pub support_owner: OwnerBankSettings,
    /// Minimum title similarity for an event to be selected
    pub ocr_title_threshold: f32,
    /// Minimum time between two processed frames
    pub min_update_interval_ms: u64,
    /// System bars to strip from captures
    pub screen: ScreenMetrics,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            game_header: MatcherSettings {
                sampling: SamplingRect::new(0.0, 0.0, 1.0, 0.12),
                origin_width: 1080.0,
                threshold: 0.6,
            },
            event_type: MatcherSettings {
                sampling: SamplingRect::new(0.1, 0.17, 0.15, 0.08),
                origin_width: 1080.0,
                threshold: 0.6,
            },
            event_title: TitleSettings::default(),
            chara_owner: OwnerBankSettings {
                sampling: SamplingRect::new(0.0, 0.16, 0.25, 0.14),
                icon_width: 0.12,
                resized_width: 96,
                threshold: 0.5,
            },
            support_owner: OwnerBankSettings {
                sampling: SamplingRect::new(0.0, 0.16, 0.25, 0.14),
                icon_width: 0.14,
                resized_width: 112,
                threshold: 0.5,
            },
            ocr_title_threshold: 0.5,
            min_update_interval_ms: 500,
            screen: ScreenMetrics::default(),
        }
    }
}

impl Settings {
    /// Stricter title matching at a slower frame rate
    pub fn high_accuracy_preset() -> Self {
        let mut settings = Self::default();
        settings.game_header.threshold = 0.7;
        settings.event_type.threshold = 0.7;
        settings.ocr_title_threshold = 0.7;
        settings.min_update_interval_ms = 1000;
        settings
    }

    /// Faster updates, accepting noisier OCR
    pub fn responsive_preset() -> Self {
        Self {
            ocr_title_threshold: 0.4,
            min_update_interval_ms: MIN_UPDATE_INTERVAL_MS,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Time to wait between frames, never below [`MIN_UPDATE_INTERVAL_MS`].
    pub fn min_update_interval(&self) -> Duration {
        Duration::from_millis(self.min_update_interval_ms.max(MIN_UPDATE_INTERVAL_MS))
    }

    /// Check every rect and threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rects = [
            ("game_header", &self.game_header.sampling),
            ("event_type", &self.event_type.sampling),
            ("event_title", &self.event_title.sampling),
            ("chara_owner", &self.chara_owner.sampling),
            ("support_owner", &self.support_owner.sampling),
        ];
        for (name, rect) in rects {
            if !rect.is_valid() {
                return Err(ConfigError::InvalidRect {
                    name: name.to_string(),
                    rect: *rect,
                });
            }
        }

        let thresholds = [
            ("game_header.threshold", self.game_header.threshold),
            ("event_type.threshold", self.event_type.threshold),
            ("chara_owner.threshold", self.chara_owner.threshold),
            ("support_owner.threshold", self.support_owner.threshold),
            ("ocr_title_threshold", self.ocr_title_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold {
                    name: name.to_string(),
                    value,
                });
            }
        }

        let matchers = [
            ("game_header", &self.game_header),
            ("event_type", &self.event_type),
        ];
        for (name, matcher) in matchers {
            if !(matcher.origin_width.is_finite() && matcher.origin_width > 0.0) {
                return Err(ConfigError::InvalidValue(format!(
                    "{}.origin_width must be positive",
                    name
                )));
            }
        }

        let owners = [
            ("chara_owner", &self.chara_owner),
            ("support_owner", &self.support_owner),
        ];
        for (name, owner) in owners {
            if owner.resized_width == 0 || !(owner.icon_width > 0.0 && owner.icon_width <= 1.0) {
                return Err(ConfigError::InvalidValue(format!(
                    "{}: icon_width must be in (0, 1] and resized_width positive",
                    name
                )));
            }
        }

        let title = &self.event_title;
        if title.icon_sampling_width == 0
            || !(0.0..=1.0).contains(&title.icon_sampling_x)
            || !(0.0..1.0).contains(&title.resampling_offset_x)
        {
            return Err(ConfigError::InvalidValue(
                "event_title icon sampling is out of range".to_string(),
            ));
        }

        Ok(())
    }
}

/// A single template matching stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherSettings {
    pub sampling: SamplingRect,
    /// Screen width the template was captured at
    pub origin_width: f32,
    /// Score a frame must exceed
    pub threshold: f32,
}

/// Event title crop and outfit icon handling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleSettings {
    pub sampling: SamplingRect,
    /// Left edge of the icon sample patch, as a fraction of the frame width
    pub icon_sampling_x: f32,
    /// Width of the icon sample patch in pixels
    pub icon_sampling_width: u32,
    /// Mean gray level above which the icon is considered present
    pub icon_threshold: f32,
    /// Where the title starts when the icon is present
    pub resampling_offset_x: f32,
}

impl Default for TitleSettings {
    fn default() -> Self {
        Self {
            sampling: SamplingRect::new(0.2, 0.19, 0.6, 0.045),
            icon_sampling_x: 0.005,
            icon_sampling_width: 8,
            icon_threshold: 200.0,
            resampling_offset_x: 0.06,
        }
    }
}

/// Owner icon search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OwnerBankSettings {
    pub sampling: SamplingRect,
    /// Icon width as a fraction of the screen width
    pub icon_width: f32,
    /// Width icons are resized to when loaded
    pub resized_width: u32,
    pub threshold: f32,
}

impl OwnerBankSettings {
    /// Screen width at which icons appear `resized_width` pixels wide.
    pub fn origin_width(&self) -> f32 {
        self.resized_width as f32 / self.icon_width
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Sampling rect '{name}' is invalid: {rect:?}")]
    InvalidRect { name: String, rect: SamplingRect },
    #[error("Threshold '{name}' must be within [0, 1], got {value}")]
    InvalidThreshold { name: String, value: f32 },
    #[error("Invalid setting: {0}")]
    InvalidValue(String),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        Settings::default().validate().unwrap();
        Settings::high_accuracy_preset().validate().unwrap();
        Settings::responsive_preset().validate().unwrap();
    }

    #[test]
    fn test_interval_is_clamped() {
        let mut settings = Settings::default();
        assert_eq!(settings.min_update_interval(), Duration::from_millis(500));

        settings.min_update_interval_ms = 10;
        assert_eq!(settings.min_update_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_invalid_rect_rejected() {
        let mut settings = Settings::default();
        settings.event_title.sampling = SamplingRect::new(0.8, 0.2, 0.5, 0.1);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidRect { name, .. }) if name == "event_title"
        ));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut settings = Settings::default();
        settings.ocr_title_threshold = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings =
            Settings::from_json(r#"{"ocr_title_threshold": 0.8, "min_update_interval_ms": 250}"#)
                .unwrap();
        assert_eq!(settings.ocr_title_threshold, 0.8);
        assert_eq!(settings.min_update_interval(), Duration::from_millis(250));
        assert_eq!(settings.event_title, TitleSettings::default());

        assert!(matches!(
            Settings::from_json("{\"ocr_title_threshold\": 2.0}"),
            Err(ConfigError::InvalidThreshold { .. })
        ));
        assert!(matches!(Settings::from_json("not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_owner_origin_width() {
        let owner = OwnerBankSettings {
            sampling: SamplingRect::new(0.0, 0.0, 0.5, 0.5),
            icon_width: 0.1,
            resized_width: 108,
            threshold: 0.5,
        };
        assert!((owner.origin_width() - 1080.0).abs() < 1e-3);
    }
}
