use image::GrayImage;
use imageproc::filter::median_filter;

/// Apply median filter to reduce noise
/// Median filter preserves edges better than Gaussian blur
pub fn apply(image: &GrayImage) -> GrayImage {
    // 3x3 median filter (radius 1) - effective for salt-and-pepper noise
    median_filter(image, 1, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_denoise_reduces_salt_pepper_noise() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([128]));
        img.put_pixel(5, 5, Luma([0])); // "pepper" noise
        img.put_pixel(6, 5, Luma([255])); // "salt" noise

        let result = apply(&img);

        let original_variance = calculate_variance(&img);
        let result_variance = calculate_variance(&result);
        assert!(result_variance <= original_variance);
    }

    fn calculate_variance(img: &GrayImage) -> f64 {
        let pixels: Vec<f64> = img.pixels().map(|p| p.0[0] as f64).collect();
        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
        pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pixels.len() as f64
    }
}
