use image::GrayImage;

/// Estimate image contrast as the standard deviation of pixel intensity.
///
/// Clean scans of dark text on a light background score high (text and
/// background occupy opposite ends of the range); washed-out photos score
/// low and benefit from binarization.
pub fn estimate(image: &GrayImage) -> f32 {
    let count = image.pixels().len();
    if count == 0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for pixel in image.pixels() {
        let v = pixel.0[0] as f64;
        sum += v;
        sum_sq += v * v;
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - mean * mean;
    variance.max(0.0).sqrt() as f32
}
