//! Event owner resolution
//!
//! When several events share a title, the icon shown next to the title tells
//! which character or support card the event belongs to. A bank holds one
//! entry per owner, each with one or more icon variants, and scores them all
//! against the frame in parallel.

use image::{DynamicImage, GrayImage};
use serde::Serialize;

use crate::config::OwnerBankSettings;
use crate::event::EventOwner;

use super::capture::Frame;
use super::matcher::{ColorConversion, Template, TemplateMatcher};
use super::VisionError;

/// Partitions at or below this size are scored on a single worker.
pub const DEFAULT_LEAF_SIZE: usize = 8;

/// Icon variants of a single owner.
#[derive(Debug, Clone)]
pub struct OwnerTemplate {
    owner: EventOwner,
    images: Vec<Template>,
}

impl OwnerTemplate {
    /// Resize every icon to `width` and keep them as variants of `owner`.
    pub fn new(owner: EventOwner, icons: &[DynamicImage], width: u32) -> Self {
        let images = icons
            .iter()
            .map(|icon| Template::resized(owner.name(), icon, width))
            .collect();
        Self { owner, images }
    }

    pub fn from_templates(owner: EventOwner, images: Vec<Template>) -> Self {
        Self { owner, images }
    }

    pub fn owner(&self) -> &EventOwner {
        &self.owner
    }

    pub fn variants(&self) -> &[Template] {
        &self.images
    }
}

/// Winning owner of a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerMatch {
    pub owner: EventOwner,
    pub score: f32,
    /// Index of the best scoring icon variant
    pub variant: usize,
}

/// All candidate owners of one category.
pub struct OwnerTemplateBank {
    name: String,
    matcher: TemplateMatcher,
    templates: Vec<OwnerTemplate>,
    threshold: f32,
    leaf_size: usize,
}

impl OwnerTemplateBank {
    pub fn new(
        name: impl Into<String>,
        settings: &OwnerBankSettings,
        templates: Vec<OwnerTemplate>,
    ) -> Result<Self, VisionError> {
        let name = name.into();
        if templates.is_empty() {
            return Err(VisionError::EmptyTemplateBank(name));
        }
        if let Some(empty) = templates.iter().find(|t| t.images.is_empty()) {
            return Err(VisionError::EmptyOwnerTemplate(empty.owner.name().to_string()));
        }

        Ok(Self {
            name,
            matcher: TemplateMatcher::new(
                settings.sampling,
                settings.origin_width(),
                ColorConversion::Luma,
            ),
            templates,
            threshold: settings.threshold,
            leaf_size: DEFAULT_LEAF_SIZE,
        })
    }

    /// Change the partition size at which scoring stops splitting.
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Find the best matching owner, scoring partitions on the rayon pool.
    pub fn find(&self, frame: &Frame) -> Result<OwnerMatch, VisionError> {
        let target = self.matcher.pre_process(frame)?;
        let mut scores = vec![(0.0f32, 0usize); self.templates.len()];
        self.score_partition(&target, &self.templates, &mut scores)?;
        let best = self.select(&scores);
        log::debug!(
            "{}: owner '{}' score {:.3}",
            self.name,
            best.owner.name(),
            best.score
        );
        Ok(best)
    }

    /// Same result as [`find`](Self::find) without any fan-out.
    pub fn find_sequential(&self, frame: &Frame) -> Result<OwnerMatch, VisionError> {
        let target = self.matcher.pre_process(frame)?;
        let scores = self
            .templates
            .iter()
            .map(|owner| self.best_variant(&target, owner))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.select(&scores))
    }

    /// Split until a partition is small enough, then score it in place.
    ///
    /// Each partition writes only to its own slice of `scores`.
    fn score_partition(
        &self,
        target: &GrayImage,
        owners: &[OwnerTemplate],
        scores: &mut [(f32, usize)],
    ) -> Result<(), VisionError> {
        if owners.len() > self.leaf_size {
            let mid = owners.len() / 2;
            let (left, right) = owners.split_at(mid);
            let (left_scores, right_scores) = scores.split_at_mut(mid);
            let (a, b) = rayon::join(
                || self.score_partition(target, left, left_scores),
                || self.score_partition(target, right, right_scores),
            );
            a.and(b)
        } else {
            for (owner, slot) in owners.iter().zip(scores.iter_mut()) {
                *slot = self.best_variant(target, owner)?;
            }
            Ok(())
        }
    }

    fn best_variant(
        &self,
        target: &GrayImage,
        owner: &OwnerTemplate,
    ) -> Result<(f32, usize), VisionError> {
        let mut best = (f32::MIN, 0);
        for (idx, template) in owner.images.iter().enumerate() {
            let score = self.matcher.match_score(target, template)?;
            if score > best.0 {
                best = (score, idx);
            }
        }
        Ok(best)
    }

    /// Highest score wins; the earlier owner wins a tie.
    fn select(&self, scores: &[(f32, usize)]) -> OwnerMatch {
        let mut best_idx = 0;
        for (idx, &(score, _)) in scores.iter().enumerate() {
            if score > scores[best_idx].0 {
                best_idx = idx;
            }
        }
        let (score, variant) = scores[best_idx];
        OwnerMatch {
            owner: self.templates[best_idx].owner.clone(),
            score,
            variant,
        }
    }
}
