//! Image preprocessing for OCR.
//!
//! Normalizes raw image bytes into a grayscale buffer the recognition
//! engine can work with. Preprocessing is deterministic: identical input
//! bytes always yield an identical output buffer.

pub mod pipeline;
pub mod steps;

pub use pipeline::{PreprocessedImage, Preprocessor};
