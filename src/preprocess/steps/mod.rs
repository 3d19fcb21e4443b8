//! Individual preprocessing steps

pub mod binarize;
pub mod contrast;
pub mod denoise;
pub mod downscale;
pub mod grayscale;
