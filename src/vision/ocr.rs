//! OCR collaborator
//!
//! Text recognition itself is provided by the host (ML Kit on Android, a
//! test double elsewhere). This module defines the seam and cleans up what
//! comes back.

use image::GrayImage;

/// Reads the text of a binarized title image.
pub trait OcrEngine: Send {
    fn recognize(&mut self, image: &GrayImage) -> Result<String, OCRError>;
}

impl<F> OcrEngine for F
where
    F: FnMut(&GrayImage) -> Result<String, OCRError> + Send,
{
    fn recognize(&mut self, image: &GrayImage) -> Result<String, OCRError> {
        self(image)
    }
}

/// Remove every whitespace character, including the ideographic space.
///
/// OCR engines split Japanese titles at arbitrary points.
pub fn clean_text(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OCRError {
    #[error("Failed to process image: {0}")]
    ProcessingError(String),
    #[error("No text found")]
    NoTextFound,
}
