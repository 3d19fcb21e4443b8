//! Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Better for noisy/messy images like phone
//! photos, and the only engine with multi-language support. Uses the
//! tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use crate::config::Config;
use crate::engine::{CancelToken, OcrEngine, RecognitionResult, Segment};
use crate::error::OcrError;
use crate::language::ResolvedLanguages;
use crate::preprocess::PreprocessedImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR engine
pub struct TesseractEngine {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Language packs with tessdata present on disk
    installed: Vec<String>,
}

impl TesseractEngine {
    /// Create a new Tesseract-based OCR engine.
    ///
    /// Ensures tessdata for every configured language pack is on disk,
    /// downloading missing ones. A language whose download fails is left
    /// out of the installed set rather than failing startup.
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => default_tessdata_dir()?,
        };

        let mut installed = Vec::new();
        for language in &config.installed_languages {
            match ensure_tessdata_available(&tessdata_path, language) {
                Ok(()) => installed.push(language.clone()),
                Err(e) => {
                    tracing::warn!("Skipping language pack '{}': {}", language, e);
                }
            }
        }

        if !installed.contains(&config.default_language) {
            ensure_tessdata_available(&tessdata_path, &config.default_language)?;
            installed.push(config.default_language.clone());
        }

        // Validate that tessdata is usable with a throwaway instance
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(&config.default_language))
            .map_err(|e| {
                OcrError::Initialization(format!("Failed to initialize Tesseract: {}", e))
            })?;
        drop(test_tess);

        tracing::info!(
            "Tesseract engine initialized (tessdata: {}, languages: {})",
            tessdata_path,
            installed.join(",")
        );

        Ok(Self {
            tessdata_path,
            installed,
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn recognize(
        &self,
        image: &PreprocessedImage,
        languages: &ResolvedLanguages,
        cancel: &CancelToken,
    ) -> Result<RecognitionResult, OcrError> {
        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        {
            let mut cursor = std::io::Cursor::new(&mut bmp_data);
            image
                .image
                .write_to(&mut cursor, image::ImageFormat::Bmp)
                .map_err(|e| OcrError::Engine(format!("Failed to convert to BMP: {}", e)))?;
        }

        tracing::debug!(
            "Recognizing {}x{} image, BMP size: {} bytes, languages: {}",
            image.width,
            image.height,
            bmp_data.len(),
            languages.joint()
        );

        // Tesseract recognizes all requested languages in one pass when
        // given a "+"-joined language string.
        cancel.check()?;
        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&languages.joint()))
            .map_err(|e| OcrError::Engine(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess
            .set_image_from_mem(&bmp_data)
            .map_err(|e| OcrError::Engine(format!("Failed to set image: {}", e)))?;

        cancel.check()?;
        tess = tess
            .recognize()
            .map_err(|e| OcrError::Engine(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| OcrError::Engine(format!("Failed to get text: {}", e)))?;

        // Mean confidence is 0-100; segments get the page-level score since
        // the plain-text API has no per-line scores.
        let confidence = (tess.mean_text_conf() as f32 / 100.0).clamp(0.0, 1.0);

        let segments: Vec<Segment> = text
            .lines()
            .map(|line| Segment {
                text: line.to_string(),
                confidence: Some(confidence),
                region: None,
            })
            .collect();

        Ok(RecognitionResult { segments })
    }

    fn installed_languages(&self) -> Vec<String> {
        self.installed.clone()
    }

    fn supported_formats(&self) -> Vec<String> {
        vec![
            "image/png".to_string(),
            "image/jpeg".to_string(),
            "image/gif".to_string(),
            "image/bmp".to_string(),
            "image/webp".to_string(),
            "image/tiff".to_string(),
        ]
    }
}

// ============================================================================
// Tessdata download helpers
// ============================================================================

/// Default tessdata cache directory when TESSDATA_PREFIX is unset
fn default_tessdata_dir() -> Result<String, OcrError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("img2text")
        .join("tessdata");

    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::Initialization("Invalid tessdata path".to_string()))
}

/// Ensure tessdata for one language exists under `tessdata_path`
fn ensure_tessdata_available(tessdata_path: &str, language: &str) -> Result<(), OcrError> {
    std::fs::create_dir_all(tessdata_path).map_err(|e| {
        OcrError::Initialization(format!("Failed to create tessdata directory: {}", e))
    })?;

    let traineddata_path = Path::new(tessdata_path).join(format!("{}.traineddata", language));

    if !traineddata_path.exists() {
        let url = tessdata_url(language);
        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&url, &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    }

    Ok(())
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::Initialization(format!("Failed to download tessdata: {}", e)))?;

    let mut file = File::create(path)
        .map_err(|e| OcrError::Initialization(format!("Failed to create tessdata file: {}", e)))?;

    let buffer = response
        .into_body()
        .read_to_vec()
        .map_err(|e| OcrError::Initialization(format!("Failed to read tessdata response: {}", e)))?;

    file.write_all(&buffer)
        .map_err(|e| OcrError::Initialization(format!("Failed to write tessdata file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tessdata_url_shape() {
        assert_eq!(
            tessdata_url("deu"),
            "https://github.com/tesseract-ocr/tessdata_fast/raw/main/deu.traineddata"
        );
    }
}
