use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    Initialization(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("OCR engine failure: {0}")]
    Engine(String),

    #[error("Recognition timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("Engine produced no text")]
    EmptyResult,

    #[error("Unknown output format: {0}")]
    Format(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing image in request")]
    MissingImage,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Whether the user can fix this by sending a different image.
    pub fn user_correctable(&self) -> bool {
        matches!(
            self,
            OcrError::Decode(_)
                | OcrError::UnsupportedFormat(_)
                | OcrError::ImageTooLarge { .. }
                | OcrError::MissingImage
                | OcrError::InvalidRequest(_)
        )
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OcrError::Initialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            OcrError::Decode(_) => (StatusCode::BAD_REQUEST, "DECODE_ERROR"),
            OcrError::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
            }
            OcrError::Engine(_) => (StatusCode::BAD_GATEWAY, "ENGINE_ERROR"),
            OcrError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            // The pipeline converts empty results into a "no text detected"
            // success response; this mapping only covers a direct leak.
            OcrError::EmptyResult => (StatusCode::UNPROCESSABLE_ENTITY, "NO_TEXT_DETECTED"),
            // A bad format selector is a caller integration bug, not bad
            // image input, so it surfaces as an internal error.
            OcrError::Format(_) => (StatusCode::INTERNAL_SERVER_ERROR, "FORMAT_ERROR"),
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::MissingImage => (StatusCode::BAD_REQUEST, "MISSING_IMAGE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_user_correctable() {
        assert!(OcrError::Decode("bad bytes".into()).user_correctable());
        assert!(OcrError::UnsupportedFormat("ico".into()).user_correctable());
        assert!(!OcrError::Engine("crash".into()).user_correctable());
        assert!(!OcrError::Timeout { limit_ms: 100 }.user_correctable());
        assert!(!OcrError::Format("xml".into()).user_correctable());
    }

    #[test]
    fn test_format_error_surfaces_as_internal() {
        let response = OcrError::Format("xml".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
