//! Vision and image processing module
//!
//! Handles frame ingestion, template matching against the game's event screen,
//! event title extraction for OCR and owner icon search.

pub mod assets;
pub mod capture;
pub mod crop;
pub mod detector;
pub mod matcher;
pub mod ocr;
pub mod owner;
pub mod title;

pub use assets::TemplateAssets;
pub use capture::{Frame, ScreenMetrics};
pub use crop::{SamplingRect, ScreenCropper};
pub use detector::{EventTypeDetector, GameHeaderDetector};
pub use matcher::{ColorConversion, Template, TemplateMatcher};
pub use ocr::{clean_text, OCRError, OcrEngine};
pub use owner::{OwnerMatch, OwnerTemplate, OwnerTemplateBank};
pub use title::EventTitleProcessor;

/// Pixel value used to binarize images before matching and OCR.
///
/// In-game text and event-type icons are drawn in near white, so everything
/// brighter than this becomes black ink on a white background.
pub const BINARY_THRESHOLD: u8 = 220;

/// Vision system errors
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error(
        "Sampling region ({x}, {y}) {width}x{height} does not fit in frame {frame_width}x{frame_height}"
    )]
    InvalidRegion {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        frame_width: u32,
        frame_height: u32,
    },
    #[error(
        "Template '{name}' ({template_width}x{template_height}) exceeds image {image_width}x{image_height}"
    )]
    TemplateTooLarge {
        name: String,
        template_width: u32,
        template_height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("Template bank '{0}' has no templates")]
    EmptyTemplateBank(String),
    #[error("Owner '{0}' has no icon images")]
    EmptyOwnerTemplate(String),
    #[error("Failed to load template: {0}")]
    TemplateLoadError(String),
    #[error("Invalid frame data: expected {expected} bytes, got {actual}")]
    InvalidFrameData { expected: usize, actual: usize },
    #[error("Invalid frame size {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
