//! Uma Event Checker - event recognition for Uma Musume on Android
//!
//! This library watches captured frames of the game, detects event screens,
//! reads the event title with OCR and resolves it to the matching entry of
//! the reference event dataset, so the effects of each choice can be shown.
//!
//! ## Pipeline
//!
//! The `vision` module turns frames into scores and title images, the
//! `event` module owns the dataset and fuzzy search, and `recognition`
//! ties both together into a throttled frame loop.

pub mod android;
pub mod config;
pub mod event;
pub mod recognition;
pub mod vision;

use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use crate::config::{ConfigError, Settings};
use crate::event::{DataError, EventDataset, EventSearch, SearchResult};
use crate::recognition::{PipelineStage, RecognitionPipeline, RecognitionState};
use crate::vision::{Frame, OCRError, OcrEngine, TemplateAssets, VisionError};

/// Dataset file inside the asset directory
pub const DATA_FILE: &str = "data.json";

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error(transparent)]
    Ocr(#[from] OCRError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Event data is not loaded")]
    NotLoaded,
}

/// Global application state
pub struct UmaChecker {
    settings: Settings,
    dataset: Option<EventDataset>,
    pipeline: Option<RecognitionPipeline>,
    /// Start of the last frame let through the update interval
    last_frame: Option<Instant>,
}

impl UmaChecker {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            dataset: None,
            pipeline: None,
            last_frame: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load the dataset and templates from `dir` and build the pipeline.
    pub fn load(
        &mut self,
        dir: impl AsRef<Path>,
        ocr: Box<dyn OcrEngine>,
    ) -> Result<(), CheckerError> {
        let dir = dir.as_ref();
        let dataset = EventDataset::load(dir.join(DATA_FILE))?;
        let assets = TemplateAssets::load_from_dir(dir, dataset.owners(), &self.settings)?;
        let pipeline = RecognitionPipeline::new(self.settings.clone(), assets, &dataset, ocr)?;

        self.pipeline = Some(pipeline);
        self.dataset = Some(dataset);
        self.last_frame = None;
        Ok(())
    }

    /// Process a tightly packed RGBA frame.
    ///
    /// Returns `None` without looking at the frame when it arrives before
    /// the update interval has passed since the last processed frame.
    pub fn process_frame(
        &mut self,
        frame_data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<PipelineStage>, CheckerError> {
        let pipeline = self.pipeline.as_mut().ok_or(CheckerError::NotLoaded)?;

        let now = Instant::now();
        if let Some(last) = self.last_frame {
            if now.duration_since(last) < self.settings.min_update_interval() {
                return Ok(None);
            }
        }
        self.last_frame = Some(now);

        let frame = Frame::from_raw(frame_data, width, height)?;
        pipeline.process_frame(&frame).map(Some)
    }

    pub fn state(&self) -> RecognitionState {
        self.pipeline
            .as_ref()
            .map(|p| p.state().clone())
            .unwrap_or_default()
    }

    pub fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, CheckerError> {
        let dataset = self.dataset.as_ref().ok_or(CheckerError::NotLoaded)?;
        Ok(EventSearch::new(dataset.shared_events()).search_top_k(query, max_results))
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<(), CheckerError> {
        settings.validate()?;
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.update_settings(settings.clone())?;
        }
        self.settings = settings;
        Ok(())
    }
}

/// Global checker instance for JNI access
static CHECKER_INSTANCE: OnceCell<Mutex<UmaChecker>> = OnceCell::new();

/// Initialize the global checker instance
pub fn init_checker(settings: Settings) {
    let _ = CHECKER_INSTANCE.set(Mutex::new(UmaChecker::new(settings)));
}

/// Get a reference to the global checker instance
pub fn get_checker() -> Option<&'static Mutex<UmaChecker>> {
    CHECKER_INSTANCE.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_checker_requires_data() {
        let mut checker = UmaChecker::new(Settings::default());
        assert!(matches!(
            checker.process_frame(&[0; 16], 2, 2),
            Err(CheckerError::NotLoaded)
        ));
        assert!(matches!(
            checker.search("title", 3),
            Err(CheckerError::NotLoaded)
        ));
        assert_eq!(checker.state().stage, PipelineStage::Idle);
    }

    #[test]
    fn test_checker_missing_dir() {
        let mut checker = UmaChecker::new(Settings::default());
        let ocr = |_: &image::GrayImage| Ok::<_, OCRError>(String::new());
        let result = checker.load("/nonexistent/uma-checker", Box::new(ocr));
        assert!(matches!(result, Err(CheckerError::Data(DataError::Io(_)))));
    }

    fn asset_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "uma-checker-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("template")).unwrap();
        for file in [
            "game_header.png",
            "event_chara.png",
            "event_support.png",
            "event_main.png",
        ] {
            image::GrayImage::from_pixel(20, 10, image::Luma([128]))
                .save(dir.join("template").join(file))
                .unwrap();
        }
        std::fs::write(dir.join(DATA_FILE), r#"{"events": []}"#).unwrap();
        dir
    }

    #[test]
    fn test_frames_within_interval_are_skipped() {
        let dir = asset_dir("throttle");
        let mut checker = UmaChecker::new(Settings::responsive_preset());
        let ocr = |_: &image::GrayImage| Ok::<_, OCRError>(String::new());
        checker.load(&dir, Box::new(ocr)).unwrap();

        // a truncated frame still counts as processed
        assert!(matches!(
            checker.process_frame(&[0; 3], 1, 1),
            Err(CheckerError::Vision(VisionError::InvalidFrameData { .. }))
        ));
        assert!(matches!(checker.process_frame(&[0; 3], 1, 1), Ok(None)));

        let interval = checker.settings().min_update_interval();
        std::thread::sleep(interval + Duration::from_millis(20));
        assert!(checker.process_frame(&[0; 3], 1, 1).is_err());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_checker_settings_validated() {
        let mut checker = UmaChecker::new(Settings::default());
        let mut bad = Settings::default();
        bad.min_update_interval_ms = 50;
        bad.game_header.threshold = 3.0;
        assert!(checker.update_settings(bad).is_err());

        checker
            .update_settings(Settings::high_accuracy_preset())
            .unwrap();
        assert_eq!(checker.settings().ocr_title_threshold, 0.7);
    }

    #[test]
    fn test_global_instance() {
        init_checker(Settings::default());
        init_checker(Settings::high_accuracy_preset());
        let checker = get_checker().unwrap().lock().unwrap();
        // the first initialization wins
        assert_eq!(checker.settings().ocr_title_threshold, 0.5);
    }
}
