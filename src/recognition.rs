//! Recognition pipeline
//!
//! Runs one frame at a time through
//! header gate → event type → title crop → OCR → search → owner resolution,
//! and publishes the outcome as a [`RecognitionState`] snapshot.
//!
//! The async [`RecognitionPipeline::run`] loop feeds it from a capture
//! channel, always processing the newest frame and never faster than the
//! configured update interval.

use std::sync::Arc;

use image::GrayImage;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{OwnerBankSettings, Settings};
use crate::event::{
    normalize_for_comparison, select_event, top_candidates, EventCategory, EventDataset,
    EventRecord, EventSearch, SearchResult,
};
use crate::vision::{
    clean_text, EventTitleProcessor, EventTypeDetector, Frame, GameHeaderDetector, OcrEngine,
    OwnerMatch, OwnerTemplate, OwnerTemplateBank, TemplateAssets, VisionError,
};
use crate::CheckerError;

/// Where the last frame ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PipelineStage {
    /// Nothing processed yet
    #[default]
    Idle,
    HeaderChecking,
    TypeClassifying,
    TitleExtracting,
    Searching,
    /// An event is selected
    Stable,
    /// Not an event screen, or no event matched the title
    NoMatch,
}

/// Snapshot of what is currently on screen.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecognitionState {
    pub stage: PipelineStage,
    pub is_game_screen: bool,
    pub category: Option<EventCategory>,
    /// OCR output with whitespace removed
    pub raw_text: Option<String>,
    /// Normalized title the current selection was searched with
    pub title: Option<String>,
    pub event: Option<EventRecord>,
    /// Owner icon found while disambiguating, if the search needed it
    pub owner: Option<OwnerMatch>,
    /// Binarized image handed to OCR
    #[serde(skip)]
    pub title_image: Option<Arc<GrayImage>>,
    pub last_error: Option<String>,
}

impl RecognitionState {
    fn clear_event(&mut self) {
        self.category = None;
        self.raw_text = None;
        self.title = None;
        self.event = None;
        self.owner = None;
        self.title_image = None;
    }
}

/// Detectors built from the settings and templates.
struct Detectors {
    header: GameHeaderDetector,
    event_type: EventTypeDetector,
    title: EventTitleProcessor,
    chara_bank: Option<OwnerTemplateBank>,
    support_bank: Option<OwnerTemplateBank>,
}

impl Detectors {
    fn build(settings: &Settings, assets: &TemplateAssets) -> Result<Self, VisionError> {
        Ok(Self {
            header: GameHeaderDetector::new(&settings.game_header, assets.header.clone()),
            event_type: EventTypeDetector::new(
                &settings.event_type,
                assets.event_chara.clone(),
                assets.event_support.clone(),
                assets.event_scenario.clone(),
            ),
            title: EventTitleProcessor::new(settings.event_title),
            chara_bank: owner_bank("chara", &settings.chara_owner, &assets.chara_owners)?,
            support_bank: owner_bank("support", &settings.support_owner, &assets.support_owners)?,
        })
    }
}

fn owner_bank(
    name: &str,
    settings: &OwnerBankSettings,
    owners: &[OwnerTemplate],
) -> Result<Option<OwnerTemplateBank>, VisionError> {
    if owners.is_empty() {
        log::warn!("no {} owner icons, owner search disabled", name);
        return Ok(None);
    }
    OwnerTemplateBank::new(name, settings, owners.to_vec()).map(Some)
}

pub struct RecognitionPipeline {
    settings: Settings,
    assets: TemplateAssets,
    detectors: Detectors,
    search: EventSearch,
    ocr: Box<dyn OcrEngine>,
    state: RecognitionState,
    state_tx: watch::Sender<RecognitionState>,
    searches: u64,
}

impl RecognitionPipeline {
    pub fn new(
        settings: Settings,
        assets: TemplateAssets,
        dataset: &EventDataset,
        ocr: Box<dyn OcrEngine>,
    ) -> Result<Self, CheckerError> {
        settings.validate()?;
        let detectors = Detectors::build(&settings, &assets)?;
        let (state_tx, _) = watch::channel(RecognitionState::default());

        Ok(Self {
            settings,
            assets,
            detectors,
            search: EventSearch::new(dataset.shared_events()),
            ocr,
            state: RecognitionState::default(),
            state_tx,
            searches: 0,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Receive every published state; the latest one is always available.
    pub fn subscribe(&self) -> watch::Receiver<RecognitionState> {
        self.state_tx.subscribe()
    }

    /// Current state, including changes not yet published.
    pub fn state(&self) -> &RecognitionState {
        &self.state
    }

    /// Number of title searches run so far.
    pub fn searches_performed(&self) -> u64 {
        self.searches
    }

    /// Manual lookup of the best `max_results` events for free text.
    pub fn search_by_query(&self, text: &str, max_results: usize) -> Vec<SearchResult> {
        self.search.search_top_k(text, max_results)
    }

    /// Swap the dataset and templates. The next frame searches again.
    pub fn update_data(
        &mut self,
        dataset: &EventDataset,
        assets: TemplateAssets,
    ) -> Result<(), CheckerError> {
        self.detectors = Detectors::build(&self.settings, &assets)?;
        self.assets = assets;
        self.search = EventSearch::new(dataset.shared_events());
        self.state.clear_event();
        log::info!("recognition data updated: {} events", dataset.len());
        Ok(())
    }

    /// Replace the settings, rebuilding every detector.
    ///
    /// Owner icons keep the size they were loaded with.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), CheckerError> {
        settings.validate()?;
        self.detectors = Detectors::build(&settings, &self.assets)?;
        self.settings = settings;
        self.state.clear_event();
        Ok(())
    }

    /// Process a frame and publish the resulting state.
    ///
    /// Errors are recorded in the published state as well as returned.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<PipelineStage, CheckerError> {
        let result = self.recognize(frame);
        self.finish(result)
    }

    /// Process a frame without publishing.
    pub fn recognize(&mut self, frame: &Frame) -> Result<PipelineStage, CheckerError> {
        let frame = self.settings.screen.crop_content(frame)?;

        self.state.stage = PipelineStage::HeaderChecking;
        self.state.is_game_screen = self.detectors.header.detect(&frame)?;
        if !self.state.is_game_screen {
            self.state.clear_event();
            return Ok(self.set_stage(PipelineStage::NoMatch));
        }

        self.state.stage = PipelineStage::TypeClassifying;
        let Some(category) = self.detectors.event_type.detect(&frame)? else {
            self.state.clear_event();
            return Ok(self.set_stage(PipelineStage::NoMatch));
        };

        self.state.stage = PipelineStage::TitleExtracting;
        let image = self.detectors.title.pre_process(&frame, category)?;
        let text = clean_text(&self.ocr.recognize(&image)?);
        let title = normalize_for_comparison(&text);
        self.state.raw_text = Some(text);
        self.state.title_image = Some(Arc::new(image));

        let unchanged = self.state.category == Some(category)
            && self.state.title.as_deref() == Some(title.as_str());
        if unchanged {
            log::debug!("title unchanged, keeping selection");
            let stage = if self.state.event.is_some() {
                PipelineStage::Stable
            } else {
                PipelineStage::NoMatch
            };
            return Ok(self.set_stage(stage));
        }

        // The title is only stored once the search went through, so a frame
        // failing below is searched again next time.
        self.state.stage = PipelineStage::Searching;
        self.state.category = None;
        self.state.title = None;
        self.state.event = None;
        self.state.owner = None;

        let mut event = None;
        let mut owner = None;
        if !title.is_empty() {
            self.searches += 1;
            let threshold = self.settings.ocr_title_threshold;
            let results = self
                .search
                .search_by_threshold(&title, threshold, Some(category));
            let candidates = top_candidates(&results);
            if candidates.len() > 1 {
                owner = self.find_owner(&frame, category)?;
            }

            match select_event(candidates, owner.as_ref().map(|m| &m.owner)) {
                Some(result) => {
                    log::info!(
                        "event '{}' ({:?}) score {:.3}, {} candidates",
                        result.event.title(),
                        category,
                        result.score,
                        candidates.len()
                    );
                    event = Some(result.event.clone());
                }
                None => log::debug!("no event matches '{}'", title),
            }
        }

        let stage = if event.is_some() {
            PipelineStage::Stable
        } else {
            PipelineStage::NoMatch
        };
        self.state.category = Some(category);
        self.state.title = Some(title);
        self.state.event = event;
        self.state.owner = owner;
        Ok(self.set_stage(stage))
    }

    /// Owner shown on screen, if the category has icons and one is visible.
    fn find_owner(
        &self,
        frame: &Frame,
        category: EventCategory,
    ) -> Result<Option<OwnerMatch>, VisionError> {
        let bank = match category {
            EventCategory::Chara => self.detectors.chara_bank.as_ref(),
            EventCategory::Support => self.detectors.support_bank.as_ref(),
            EventCategory::Scenario => None,
        };
        let Some(bank) = bank else {
            return Ok(None);
        };

        let found = bank.find(frame)?;
        if found.score > bank.threshold() {
            Ok(Some(found))
        } else {
            log::debug!(
                "{} owner score {:.3} below threshold",
                bank.name(),
                found.score
            );
            Ok(None)
        }
    }

    fn set_stage(&mut self, stage: PipelineStage) -> PipelineStage {
        self.state.stage = stage;
        stage
    }

    fn finish(
        &mut self,
        result: Result<PipelineStage, CheckerError>,
    ) -> Result<PipelineStage, CheckerError> {
        match &result {
            Ok(_) => self.state.last_error = None,
            Err(e) => {
                self.state.stage = PipelineStage::NoMatch;
                self.state.last_error = Some(e.to_string());
            }
        }
        self.state_tx.send_replace(self.state.clone());
        result
    }

    /// Process frames until `cancel` fires or the capture channel closes.
    ///
    /// Frames queued while a frame was processed are skipped in favor of the
    /// newest one.
    pub async fn run(self, mut frames: mpsc::Receiver<Frame>, cancel: CancellationToken) {
        log::info!("recognition loop started");
        let mut pipeline = self;
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = frames.recv() => frame,
            };
            let Some(mut frame) = received else {
                break;
            };

            let mut skipped = 0;
            while let Ok(newer) = frames.try_recv() {
                frame = newer;
                skipped += 1;
            }
            if skipped > 0 {
                log::debug!("skipped {} stale frames", skipped);
            }

            let start = Instant::now();
            let task = tokio::task::spawn_blocking(move || {
                let result = pipeline.recognize(&frame);
                (pipeline, result)
            });
            let result = match task.await {
                Ok((returned, result)) => {
                    pipeline = returned;
                    result
                }
                Err(e) => {
                    log::error!("recognition task failed: {}", e);
                    break;
                }
            };
            if cancel.is_cancelled() {
                break;
            }
            if let Err(e) = pipeline.finish(result) {
                log::warn!("frame failed: {}", e);
            }

            let next = start + pipeline.settings.min_update_interval();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(next) => {}
            }
        }
        log::info!("recognition loop stopped");
    }
}
