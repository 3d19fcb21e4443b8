use image::{GrayImage, Luma};

/// Sauvola threshold parameters
const WINDOW_SIZE: u32 = 15;
const K: f32 = 0.2;
const R: f32 = 128.0; // Dynamic range / 2

/// Apply Sauvola adaptive thresholding
/// Better than Otsu for documents with uneven lighting
pub fn apply(image: &GrayImage) -> GrayImage {
    sauvola_threshold(image, WINDOW_SIZE, K)
}

/// Sauvola adaptive thresholding
///
/// For each pixel, threshold = mean * (1 + k * (std_dev / R - 1))
/// where R is max standard deviation (128 for 8-bit images)
fn sauvola_threshold(img: &GrayImage, window_size: u32, k: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    let half_window = window_size as i32 / 2;
    let integrals = IntegralImages::new(img);

    GrayImage::from_fn(width, height, |x, y| {
        let x1 = (x as i32 - half_window).max(0) as u32;
        let y1 = (y as i32 - half_window).max(0) as u32;
        let x2 = (x as i32 + half_window).min(width as i32 - 1) as u32;
        let y2 = (y as i32 + half_window).min(height as i32 - 1) as u32;

        let (mean, std_dev) = integrals.window_stats(x1, y1, x2, y2);
        let threshold = mean * (1.0 + k * (std_dev / R - 1.0));

        if img.get_pixel(x, y).0[0] as f32 > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Integral image plus integral of squared values, for O(1) window
/// statistics. Stored flat, row-major, with a one-pixel zero border.
struct IntegralImages {
    sums: Vec<f64>,
    sums_sq: Vec<f64>,
    stride: usize,
}

impl IntegralImages {
    fn new(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let stride = width as usize + 1;
        let rows = height as usize + 1;
        let mut sums = vec![0.0f64; stride * rows];
        let mut sums_sq = vec![0.0f64; stride * rows];

        for y in 0..height as usize {
            for x in 0..width as usize {
                let val = img.get_pixel(x as u32, y as u32).0[0] as f64;
                let idx = (y + 1) * stride + (x + 1);
                sums[idx] =
                    val + sums[y * stride + (x + 1)] + sums[(y + 1) * stride + x] - sums[y * stride + x];
                sums_sq[idx] = val * val
                    + sums_sq[y * stride + (x + 1)]
                    + sums_sq[(y + 1) * stride + x]
                    - sums_sq[y * stride + x];
            }
        }

        Self {
            sums,
            sums_sq,
            stride,
        }
    }

    /// Mean and standard deviation of the inclusive window [x1..x2, y1..y2].
    fn window_stats(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> (f32, f32) {
        let (x1, y1) = (x1 as usize, y1 as usize);
        let (x2, y2) = (x2 as usize + 1, y2 as usize + 1);
        let area = ((x2 - x1) * (y2 - y1)) as f64;
        let s = self.stride;

        let sum = self.sums[y2 * s + x2] - self.sums[y1 * s + x2] - self.sums[y2 * s + x1]
            + self.sums[y1 * s + x1];
        let sum_sq = self.sums_sq[y2 * s + x2] - self.sums_sq[y1 * s + x2]
            - self.sums_sq[y2 * s + x1]
            + self.sums_sq[y1 * s + x1];

        let mean = sum / area;
        let variance = (sum_sq / area) - (mean * mean);
        (mean as f32, variance.max(0.0).sqrt() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binarize_produces_only_black_and_white() {
        // Simple gradient image
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8).saturating_mul(5)]));

        let result = apply(&img);

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_binarize_separates_text_from_background() {
        // Dark text stroke on a light background
        let mut img = GrayImage::from_pixel(50, 20, Luma([240]));
        for x in 10..40 {
            img.put_pixel(x, 10, Luma([20]));
        }

        let result = apply(&img);

        // Text pixel goes black, background stays white
        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        assert_eq!(result.get_pixel(25, 5).0[0], 255);
    }

    #[test]
    fn test_binarize_is_deterministic() {
        let img = GrayImage::from_fn(30, 30, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        assert_eq!(apply(&img).as_raw(), apply(&img).as_raw());
    }
}
