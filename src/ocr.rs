//! Request orchestration.
//!
//! Runs one image-to-text request through its stages in order:
//! preprocessing, language resolution, bounded recognition, formatting.
//! Every request ends with an outcome recorded in the usage tracker,
//! including requests that abort before reaching the engine.

use crate::config::Config;
use crate::engine::{CancelToken, OcrEngine, RecognitionResult};
use crate::error::OcrError;
use crate::format::{OutputFormat, NO_TEXT_DETECTED};
use crate::language::{LanguagePackResolver, ResolvedLanguages};
use crate::preprocess::{PreprocessedImage, Preprocessor};
use crate::stats::{Outcome, UsageTracker};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One normalized request from the transport layer.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub image_bytes: Vec<u8>,
    pub requested_languages: Vec<String>,
    /// Raw output format selector; `None` means plain text.
    pub format: Option<String>,
}

/// Result relayed back to the transport layer.
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    pub format: OutputFormat,
    pub outcome: Outcome,
    pub languages: Vec<String>,
    pub substituted: Vec<String>,
    pub confidence: Option<f32>,
    pub segments: usize,
}

pub struct OcrProcessor {
    engine: Arc<dyn OcrEngine>,
    preprocessor: Preprocessor,
    resolver: LanguagePackResolver,
    tracker: Arc<UsageTracker>,
    timeout: Duration,
}

impl OcrProcessor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &Config, tracker: Arc<UsageTracker>) -> Self {
        // The engine knows which packs it actually has; the config's list
        // drives engine initialization, not resolution.
        let resolver =
            LanguagePackResolver::new(engine.installed_languages(), &config.default_language);
        Self {
            engine,
            preprocessor: Preprocessor::new(config.max_image_dimension_px),
            resolver,
            tracker,
            timeout: Duration::from_millis(config.engine_timeout_ms),
        }
    }

    pub fn resolver(&self) -> &LanguagePackResolver {
        &self.resolver
    }

    /// Process one request end to end, recording its outcome.
    pub async fn process(&self, user_id: &str, request: OcrRequest) -> Result<OcrOutput, OcrError> {
        let start = Instant::now();
        let resolved = self.resolver.resolve(&request.requested_languages);

        let result = self.run(&request, &resolved).await;

        let outcome = match &result {
            Ok(output) => output.outcome,
            Err(_) => Outcome::Failure,
        };
        self.tracker
            .record_event(user_id, resolved.languages(), outcome);

        match &result {
            Ok(output) => tracing::info!(
                "OCR {} for user {} in {}ms ({} segments, languages: {})",
                output.outcome.as_str(),
                user_id,
                start.elapsed().as_millis(),
                output.segments,
                resolved.joint(),
            ),
            Err(e) => tracing::warn!(
                "OCR failed for user {} after {}ms: {}",
                user_id,
                start.elapsed().as_millis(),
                e
            ),
        }

        result
    }

    async fn run(
        &self,
        request: &OcrRequest,
        resolved: &ResolvedLanguages,
    ) -> Result<OcrOutput, OcrError> {
        // A bad format selector is a caller bug, not something the user
        // can fix with a different image.
        let format = match request.format.as_deref() {
            Some(raw) => OutputFormat::parse(raw).map_err(|e| {
                tracing::error!("Unrecognized output format selector '{}'", raw);
                e
            })?,
            None => OutputFormat::default(),
        };

        // Preprocessing failures abort before any engine work.
        let prepared = self.preprocessor.prepare(&request.image_bytes)?;

        let recognition = match self.recognize_with_retry(&prepared, resolved).await {
            Ok(recognition) if recognition.is_empty() => {
                return Ok(self.empty_output(format, resolved));
            }
            Ok(recognition) => recognition,
            // Not a failure to the caller: surfaced as a distinct
            // "no text detected" outcome.
            Err(OcrError::EmptyResult) => {
                return Ok(self.empty_output(format, resolved));
            }
            Err(e) => return Err(e),
        };

        Ok(OcrOutput {
            text: format.render(&recognition),
            format,
            outcome: Outcome::Success,
            languages: resolved.languages().to_vec(),
            substituted: resolved.substituted().to_vec(),
            confidence: recognition.mean_confidence(),
            segments: recognition.segments.len(),
        })
    }

    /// Engine-side failures and timeouts get one retry with a smaller
    /// image before being surfaced.
    async fn recognize_with_retry(
        &self,
        image: &PreprocessedImage,
        languages: &ResolvedLanguages,
    ) -> Result<RecognitionResult, OcrError> {
        match self.recognize_bounded(image, languages).await {
            Err(e @ (OcrError::Engine(_) | OcrError::Timeout { .. })) => {
                let retry_dimension = (image.width.max(image.height) / 2).max(1);
                tracing::warn!(
                    "Recognition failed ({}), retrying at max dimension {}px",
                    e,
                    retry_dimension
                );
                let smaller = self.preprocessor.shrink(image, retry_dimension);
                self.recognize_bounded(&smaller, languages).await
            }
            other => other,
        }
    }

    /// Run one blocking engine invocation under the configured timeout.
    ///
    /// A timed-out call is cancelled and awaited before this returns, so
    /// no engine invocation keeps running in the background.
    async fn recognize_bounded(
        &self,
        image: &PreprocessedImage,
        languages: &ResolvedLanguages,
    ) -> Result<RecognitionResult, OcrError> {
        let engine = Arc::clone(&self.engine);
        let image = image.clone();
        let languages = languages.clone();
        let cancel = CancelToken::new();
        let task_cancel = cancel.clone();

        let mut task =
            tokio::task::spawn_blocking(move || engine.recognize(&image, &languages, &task_cancel));

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(OcrError::Engine(format!(
                "recognition task failed: {}",
                join_error
            ))),
            Err(_) => {
                // Deadline passed: trip the flag and wait for the engine
                // to bail out at its next stage boundary.
                cancel.cancel();
                let _ = (&mut task).await;
                Err(OcrError::Timeout {
                    limit_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    fn empty_output(&self, format: OutputFormat, resolved: &ResolvedLanguages) -> OcrOutput {
        OcrOutput {
            text: NO_TEXT_DETECTED.to_string(),
            format,
            outcome: Outcome::Empty,
            languages: resolved.languages().to_vec(),
            substituted: resolved.substituted().to_vec(),
            confidence: None,
            segments: 0,
        }
    }
}
