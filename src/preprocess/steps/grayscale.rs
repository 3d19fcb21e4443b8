use image::{DynamicImage, GrayImage};

/// Convert image to grayscale
/// This is the foundation for the remaining preprocessing steps
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}
