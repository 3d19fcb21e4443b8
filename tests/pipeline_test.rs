//! End-to-end pipeline tests driven through the library API with a
//! scripted engine, so they run without model downloads or a network.

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use img2text_server::config::Config;
use img2text_server::engine::{CancelToken, OcrEngine, RecognitionResult, Segment};
use img2text_server::error::OcrError;
use img2text_server::format::{OutputFormat, NO_TEXT_DETECTED};
use img2text_server::language::ResolvedLanguages;
use img2text_server::ocr::{OcrProcessor, OcrRequest};
use img2text_server::preprocess::PreprocessedImage;
use img2text_server::stats::{JsonStatsStore, Outcome, UsageTracker};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type RecognizeFn = dyn Fn(
        usize,
        &PreprocessedImage,
        &ResolvedLanguages,
        &CancelToken,
    ) -> Result<RecognitionResult, OcrError>
    + Send
    + Sync;

struct ScriptedEngine {
    calls: AtomicUsize,
    seen: Mutex<Vec<(u32, u32, String)>>,
    behavior: Box<RecognizeFn>,
}

impl ScriptedEngine {
    fn new(
        behavior: impl Fn(
                usize,
                &PreprocessedImage,
                &ResolvedLanguages,
                &CancelToken,
            ) -> Result<RecognitionResult, OcrError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            behavior: Box::new(behavior),
        }
    }

    fn returning(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _, _, _| Ok(RecognitionResult::from_lines(&text, Some(0.85))))
    }
}

impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn description(&self) -> &'static str {
        "scripted engine for pipeline tests"
    }

    fn recognize(
        &self,
        image: &PreprocessedImage,
        languages: &ResolvedLanguages,
        cancel: &CancelToken,
    ) -> Result<RecognitionResult, OcrError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((image.width, image.height, languages.joint()));
        (self.behavior)(call, image, languages, cancel)
    }

    fn installed_languages(&self) -> Vec<String> {
        vec!["eng".to_string(), "deu".to_string(), "fra".to_string()]
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["image/png".to_string()]
    }
}

fn config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        installed_languages: vec!["eng".into(), "deu".into(), "fra".into()],
        default_language: "eng".into(),
        engine_timeout_ms: 5000,
        max_image_dimension_px: 200,
        max_file_size: 10 * 1024 * 1024,
        stats_path: None,
        tessdata_path: None,
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |_, y| {
        if y % 10 < 3 {
            Luma([20])
        } else {
            Luma([235])
        }
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn request(languages: &[&str], format: OutputFormat) -> OcrRequest {
    OcrRequest {
        image_bytes: png_bytes(160, 120),
        requested_languages: languages.iter().map(|l| l.to_string()).collect(),
        format: Some(format.as_str().to_string()),
    }
}

#[tokio::test]
async fn test_session_of_mixed_outcomes_aggregates_stats() {
    let engine = Arc::new(ScriptedEngine::new(|call, _, _, _| match call {
        0 => Ok(RecognitionResult::from_lines("first result", Some(0.9))),
        1 => Err(OcrError::EmptyResult),
        _ => Err(OcrError::Engine("persistent failure".into())),
    }));
    let tracker = Arc::new(UsageTracker::in_memory());
    let processor = OcrProcessor::new(engine, &config(), Arc::clone(&tracker));

    let ok = processor
        .process("alice", request(&["eng"], OutputFormat::Plain))
        .await
        .unwrap();
    assert_eq!(ok.outcome, Outcome::Success);

    let empty = processor
        .process("alice", request(&["eng"], OutputFormat::Plain))
        .await
        .unwrap();
    assert_eq!(empty.outcome, Outcome::Empty);
    assert_eq!(empty.text, NO_TEXT_DETECTED);

    // Engine error fails both the first attempt and the retry
    let err = processor
        .process("alice", request(&["eng"], OutputFormat::Plain))
        .await
        .unwrap_err();
    assert!(matches!(err, OcrError::Engine(_)));

    let stats = tracker.get_stats("alice");
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.empties, 1);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.languages["eng"], 3);
}

#[tokio::test]
async fn test_unavailable_languages_fall_back_to_default() {
    let engine = Arc::new(ScriptedEngine::returning("bonjour"));
    let tracker = Arc::new(UsageTracker::in_memory());
    let processor = OcrProcessor::new(
        Arc::clone(&engine) as Arc<dyn OcrEngine>,
        &config(),
        Arc::clone(&tracker),
    );

    let output = processor
        .process("bob", request(&["xyz", "abc"], OutputFormat::Plain))
        .await
        .unwrap();

    assert_eq!(output.languages, vec!["eng"]);
    assert_eq!(output.substituted, vec!["xyz", "abc"]);

    // The engine was invoked with the resolved set, not the requested one
    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen[0].2, "eng");

    // Stats track the language actually used
    let stats = tracker.get_stats("bob");
    assert_eq!(stats.languages["eng"], 1);
    assert!(!stats.languages.contains_key("xyz"));
}

#[tokio::test]
async fn test_multi_language_request_reaches_engine_joint() {
    let engine = Arc::new(ScriptedEngine::returning("hallo"));
    let processor = OcrProcessor::new(
        Arc::clone(&engine) as Arc<dyn OcrEngine>,
        &config(),
        Arc::new(UsageTracker::in_memory()),
    );

    processor
        .process("bob", request(&["deu", "fra"], OutputFormat::Plain))
        .await
        .unwrap();

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen[0].2, "deu+fra");
}

#[tokio::test]
async fn test_oversized_image_is_downscaled_before_recognition() {
    let engine = Arc::new(ScriptedEngine::returning("small now"));
    let processor = OcrProcessor::new(
        Arc::clone(&engine) as Arc<dyn OcrEngine>,
        &config(), // max dimension 200
        Arc::new(UsageTracker::in_memory()),
    );

    processor
        .process(
            "carol",
            OcrRequest {
                image_bytes: png_bytes(800, 400),
                requested_languages: vec!["eng".into()],
                format: None,
            },
        )
        .await
        .unwrap();

    let seen = engine.seen.lock().unwrap();
    let (width, height, _) = seen[0].clone();
    assert_eq!(width, 200);
    assert_eq!(height, 100);
}

#[tokio::test]
async fn test_markdown_output_groups_paragraphs() {
    let engine = Arc::new(ScriptedEngine::new(|_, _, _, _| {
        Ok(RecognitionResult {
            segments: ["First line", "second line", "", "New paragraph"]
                .iter()
                .map(|text| Segment {
                    text: text.to_string(),
                    confidence: Some(0.9),
                    region: None,
                })
                .collect(),
        })
    }));
    let processor = OcrProcessor::new(engine, &config(), Arc::new(UsageTracker::in_memory()));

    let output = processor
        .process("dave", request(&["eng"], OutputFormat::Markdown))
        .await
        .unwrap();

    assert_eq!(output.text, "First line\nsecond line\n\nNew paragraph");
}

#[tokio::test]
async fn test_concurrent_requests_lose_no_stats() {
    let engine = Arc::new(ScriptedEngine::returning("parallel"));
    let tracker = Arc::new(UsageTracker::in_memory());
    let processor = Arc::new(OcrProcessor::new(engine, &config(), Arc::clone(&tracker)));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let processor = Arc::clone(&processor);
        handles.push(tokio::spawn(async move {
            processor
                .process("shared", request(&["eng"], OutputFormat::Plain))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = tracker.get_stats("shared");
    assert_eq!(stats.total_requests, 16);
    assert_eq!(stats.successes, 16);
    assert_eq!(stats.languages["eng"], 16);
}

#[tokio::test]
async fn test_stats_survive_tracker_reload() {
    let dir = std::env::temp_dir().join(format!("img2text-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("stats.json");

    {
        let engine = Arc::new(ScriptedEngine::returning("persisted"));
        let tracker =
            Arc::new(UsageTracker::with_store(Box::new(JsonStatsStore::new(&path))).unwrap());
        let processor = OcrProcessor::new(engine, &config(), tracker);
        processor
            .process("erin", request(&["eng"], OutputFormat::Plain))
            .await
            .unwrap();
    }

    let reloaded = UsageTracker::with_store(Box::new(JsonStatsStore::new(&path))).unwrap();
    let stats = reloaded.get_stats("erin");
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.successes, 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_unsupported_format_rejected_without_engine_call() {
    let engine = Arc::new(ScriptedEngine::returning("unreachable"));
    let processor = OcrProcessor::new(
        Arc::clone(&engine) as Arc<dyn OcrEngine>,
        &config(),
        Arc::new(UsageTracker::in_memory()),
    );

    // ICO magic bytes: a decodable-looking header in a format outside the
    // supported set
    let err = processor
        .process(
            "frank",
            OcrRequest {
                image_bytes: vec![0x00, 0x00, 0x01, 0x00, 0x01, 0x00],
                requested_languages: vec!["eng".into()],
                format: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OcrError::UnsupportedFormat(_)));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}
