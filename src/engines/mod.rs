//! OCR engine implementations
//!
//! Implementations of the OcrEngine trait for different OCR backends.
//! Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine, as reported by the info endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_formats: Vec<String>,
    pub installed_languages: Vec<String>,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all available engines initialized
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();
        let mut default_engine = String::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            let ocrs_engine = ocrs::OcrsEngine::new(config)?;
            if default_engine.is_empty() {
                default_engine = ocrs_engine.name().to_string();
            }
            engines.push(Arc::new(ocrs_engine));
        }

        #[cfg(feature = "engine-tesseract")]
        {
            tracing::info!("Initializing tesseract engine...");
            let tesseract_engine = tesseract::TesseractEngine::new(config)?;
            if default_engine.is_empty() {
                default_engine = tesseract_engine.name().to_string();
            }
            engines.push(Arc::new(tesseract_engine));
        }

        if engines.is_empty() {
            return Err(OcrError::Initialization(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-tesseract".to_string()
            ));
        }

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default(&self) -> Option<Arc<dyn OcrEngine>> {
        self.get(&self.default_engine)
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_formats: e.supported_formats(),
                installed_languages: e.installed_languages(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CancelToken, RecognitionResult};
    use crate::language::ResolvedLanguages;
    use crate::preprocess::PreprocessedImage;

    struct StubEngine {
        name: &'static str,
    }

    impl OcrEngine for StubEngine {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "stub engine"
        }

        fn recognize(
            &self,
            _image: &PreprocessedImage,
            _languages: &ResolvedLanguages,
            _cancel: &CancelToken,
        ) -> Result<RecognitionResult, OcrError> {
            Ok(RecognitionResult::default())
        }

        fn installed_languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }

        fn supported_formats(&self) -> Vec<String> {
            vec!["image/png".to_string()]
        }
    }

    fn registry() -> EngineRegistry {
        EngineRegistry {
            engines: vec![
                Arc::new(StubEngine { name: "alpha" }),
                Arc::new(StubEngine { name: "beta" }),
            ],
            default_engine: "alpha".to_string(),
        }
    }

    #[test]
    fn test_get_by_name() {
        let registry = registry();
        assert_eq!(registry.get("beta").unwrap().name(), "beta");
        assert!(registry.get("gamma").is_none());
    }

    #[test]
    fn test_default_engine() {
        let registry = registry();
        assert_eq!(registry.default_name(), "alpha");
        assert_eq!(registry.default().unwrap().name(), "alpha");
    }

    #[test]
    fn test_list_and_info_cover_all_engines() {
        let registry = registry();
        assert_eq!(registry.list(), vec!["alpha", "beta"]);

        let info = registry.info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].name, "alpha");
        assert_eq!(info[0].installed_languages, vec!["eng"]);
    }
}
