use crate::error::OcrError;
use crate::language::ResolvedLanguages;
use crate::preprocess::PreprocessedImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for one in-flight recognition call.
///
/// The pipeline trips it when the invocation deadline passes; engines check
/// it between stages and bail out, so a timed-out call has stopped and
/// released its resources before control returns to the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Bail-out helper for engine stage boundaries.
    pub fn check(&self) -> Result<(), OcrError> {
        if self.is_cancelled() {
            Err(OcrError::Engine("recognition cancelled".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Axis-aligned bounding region of a recognized segment, in pixels of the
/// preprocessed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A contiguous span of recognized text.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    /// Confidence in [0, 1] when the engine reports one.
    pub confidence: Option<f32>,
    pub region: Option<Region>,
}

/// Recognized text segments in the engine's emitted reading order.
#[derive(Debug, Clone, Default)]
pub struct RecognitionResult {
    pub segments: Vec<Segment>,
}

impl RecognitionResult {
    /// Build a result from line-structured text with a single confidence
    /// for every line. Engines that only report whole-page text use this.
    pub fn from_lines(text: &str, confidence: Option<f32>) -> Self {
        let segments = text
            .lines()
            .map(|line| Segment {
                text: line.to_string(),
                confidence,
                region: None,
            })
            .collect();
        Self { segments }
    }

    /// True when no segment carries any visible text.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    /// Mean confidence over segments that report one.
    pub fn mean_confidence(&self) -> Option<f32> {
        let scores: Vec<f32> = self.segments.iter().filter_map(|s| s.confidence).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f32>() / scores.len() as f32)
        }
    }
}

/// Trait that all OCR engines must implement.
///
/// This is the sole boundary to the external recognition engine; everything
/// engine-specific (trained model paths, downloads, invocation flags) stays
/// behind it.
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g. "ocrs", "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in a prepared image using the resolved language set.
    ///
    /// Blocking call; the pipeline runs it on the blocking pool under the
    /// configured timeout. Implementations must check `cancel` between
    /// stages and return promptly once it trips.
    fn recognize(
        &self,
        image: &PreprocessedImage,
        languages: &ResolvedLanguages,
        cancel: &CancelToken,
    ) -> Result<RecognitionResult, OcrError>;

    /// Language packs this engine has available.
    fn installed_languages(&self) -> Vec<String>;

    /// Get supported MIME types
    fn supported_formats(&self) -> Vec<String>;
}
