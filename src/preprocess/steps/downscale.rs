use image::{imageops::FilterType, GrayImage};

/// Constrain an image to a maximum dimension, preserving aspect ratio.
///
/// Images already within the bound pass through untouched. Never upscales:
/// upscaling degrades recognition without adding information.
pub fn apply(image: GrayImage, max_dimension: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    let largest = width.max(height);

    if largest <= max_dimension {
        return image;
    }

    let scale = max_dimension as f32 / largest as f32;
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);

    image::imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}
