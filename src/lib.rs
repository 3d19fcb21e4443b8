//! OCR processing and language orchestration pipeline for the img2text bot.
//!
//! Accepts raw image uploads, normalizes them for recognition, runs a
//! pluggable OCR engine under a timeout with a single downscaled retry,
//! renders the recognized text in the requested representation, and keeps
//! per-user usage statistics.

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod format;
pub mod language;
pub mod ocr;
pub mod preprocess;
pub mod server;
pub mod stats;
