use crate::config::Config;
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::OcrError;
use crate::ocr::{OcrProcessor, OcrRequest};
use crate::stats::{JsonStatsStore, UsageTracker, UserStats};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<OcrProcessor>,
    pub tracker: Arc<UsageTracker>,
    pub registry: Arc<EngineRegistry>,
    pub config: Arc<Config>,
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub text: String,
    pub format: String,
    pub outcome: String,
    pub languages: Vec<String>,
    /// Requested codes that had no installed pack
    pub substituted: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub segments: usize,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: String,
    pub engines: Vec<EngineInfo>,
    pub default_language: String,
    pub max_file_size_bytes: usize,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let registry = EngineRegistry::new(&config)?;
    let engine = registry
        .default()
        .ok_or_else(|| OcrError::Initialization("No default engine".to_string()))?;
    tracing::info!(
        "Available OCR engines: {} (default: {})",
        registry.list().join(", "),
        registry.default_name()
    );

    let tracker = Arc::new(match &config.stats_path {
        Some(path) => UsageTracker::with_store(Box::new(JsonStatsStore::new(path.clone())))?,
        None => UsageTracker::in_memory(),
    });

    let processor = OcrProcessor::new(engine, &config, Arc::clone(&tracker));

    let addr = format!("{}:{}", config.host, config.port);
    let max_file_size = config.max_file_size;

    let state = AppState {
        processor: Arc::new(processor),
        tracker,
        registry: Arc::new(registry),
        config: Arc::new(config),
    };

    let app = router(state, max_file_size);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, max_file_size: usize) -> Router {
    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/stats/:user_id", get(handle_stats))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut user_id: Option<String> = None;
    let mut languages: Option<String> = None;
    let mut format: Option<String> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_data = Some(field.bytes().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "user_id" => {
                user_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| OcrError::InvalidRequest(format!("Invalid user_id: {}", e)))?,
                );
            }
            "languages" => {
                languages = Some(
                    field.text().await.map_err(|e| {
                        OcrError::InvalidRequest(format!("Invalid languages: {}", e))
                    })?,
                );
            }
            "format" => {
                format = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| OcrError::InvalidRequest(format!("Invalid format: {}", e)))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = file_data.ok_or(OcrError::MissingImage)?;
    let user_id = user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| OcrError::InvalidRequest("Missing user_id field".to_string()))?;

    if data.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let requested_languages = languages
        .map(|raw| crate::config::parse_language_list(&raw))
        .unwrap_or_default();

    let request = OcrRequest {
        image_bytes: data.to_vec(),
        requested_languages,
        format,
    };

    let output = state.processor.process(&user_id, request).await?;

    Ok(Json(OcrResponse {
        text: output.text,
        format: output.format.as_str().to_string(),
        outcome: output.outcome.as_str().to_string(),
        languages: output.languages,
        substituted: output.substituted,
        confidence: output.confidence,
        segments: output.segments,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Handle per-user statistics lookups.
///
/// Unknown users get a zeroed record rather than 404.
async fn handle_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserStats> {
    Json(state.tracker.get_stats(&user_id))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.registry.default_name().to_string(),
        engines: state.registry.info(),
        default_language: state.config.default_language.clone(),
        max_file_size_bytes: state.config.max_file_size,
    })
}
