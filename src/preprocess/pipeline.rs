use crate::error::OcrError;
use image::{DynamicImage, GrayImage, ImageFormat};

use super::steps;

/// Image formats accepted for recognition.
const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
    ImageFormat::Tiff,
];

/// Below this contrast estimate the image is considered washed out and gets
/// denoised and binarized before recognition. Clean scans skip both steps:
/// unnecessary transforms introduce artifacts.
const CONTRAST_THRESHOLD: f32 = 40.0;

/// A decoded, normalized image ready for the recognition engine.
///
/// Owned by one request for its duration; never persisted.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub image: GrayImage,
    pub width: u32,
    pub height: u32,
    /// Bits per pixel after normalization (always 8-bit grayscale here).
    pub bit_depth: u8,
    pub binarized: bool,
}

impl PreprocessedImage {
    fn new(image: GrayImage, binarized: bool) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image,
            width,
            height,
            bit_depth: 8,
            binarized,
        }
    }

    /// View as a DynamicImage for engines that want one.
    pub fn dynamic(&self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image.clone())
    }
}

/// Preprocessing pipeline: decode, bounded downscale, grayscale, and
/// contrast-gated binarization.
pub struct Preprocessor {
    max_dimension: u32,
}

impl Preprocessor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Normalize raw image bytes for recognition.
    ///
    /// Fails with `UnsupportedFormat` when the bytes carry a recognizable
    /// but unaccepted format, and `Decode` when they are unreadable.
    pub fn prepare(&self, bytes: &[u8]) -> Result<PreprocessedImage, OcrError> {
        let format = image::guess_format(bytes)
            .map_err(|_| OcrError::Decode("unrecognized image data".to_string()))?;

        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(OcrError::UnsupportedFormat(format!("{:?}", format)));
        }

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| OcrError::Decode(e.to_string()))?;

        let gray = steps::grayscale::apply(&decoded);
        let gray = steps::downscale::apply(gray, self.max_dimension);

        let contrast = steps::contrast::estimate(&gray);
        let binarize = contrast < CONTRAST_THRESHOLD;
        tracing::debug!(
            "preprocessed {}x{} image, contrast {:.1}, binarize: {}",
            gray.width(),
            gray.height(),
            contrast,
            binarize
        );

        if binarize {
            let denoised = steps::denoise::apply(&gray);
            let binary = steps::binarize::apply(&denoised);
            Ok(PreprocessedImage::new(binary, true))
        } else {
            Ok(PreprocessedImage::new(gray, false))
        }
    }

    /// Shrink an already prepared image to a tighter dimension bound.
    /// Used by the retry path after an engine timeout.
    pub fn shrink(&self, image: &PreprocessedImage, max_dimension: u32) -> PreprocessedImage {
        let smaller = steps::downscale::apply(image.image.clone(), max_dimension);
        PreprocessedImage::new(smaller, image.binarized)
    }
}
