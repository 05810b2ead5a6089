//! Blur gate based on Laplacian variance.
//!
//! The Laplacian operator detects edges. Sharp tiles have well-defined edges
//! and therefore a high variance in the Laplacian response; motion blur and
//! defocus flatten it. Tiles below the floor are not hashed at all.

use crate::core::hasher::{resize_nearest, GrayscaleImage};

/// Default variance floor below which a tile is considered too blurry
pub const DEFAULT_BLUR_FLOOR: f64 = 12.0;
/// Tiles are measured at a fixed size so the floor doesn't depend on
/// how large the card appears in the frame
const MEASURE_SIDE: u32 = 64;

/// Variance of the 4-neighbour Laplacian over the interior pixels
pub fn laplacian_variance(gray: &GrayscaleImage) -> f64 {
    let (width, height) = (gray.width(), gray.height());
    if width < 3 || height < 3 {
        return 0.0;
    }

    // Laplacian kernel: [0, 1, 0; 1, -4, 1; 0, 1, 0]
    let mut values: Vec<f64> = Vec::with_capacity(((width - 2) * (height - 2)) as usize);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray.get(x, y) as f64;
            let laplacian = gray.get(x, y - 1) as f64
                + gray.get(x, y + 1) as f64
                + gray.get(x - 1, y) as f64
                + gray.get(x + 1, y) as f64
                - 4.0 * center;
            values.push(laplacian);
        }
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Sharpness of a tile measured at the fixed 64x64 scale
pub fn tile_sharpness(gray: &GrayscaleImage) -> f64 {
    resize_nearest(gray, MEASURE_SIDE, MEASURE_SIDE)
        .map(|tile| laplacian_variance(&tile))
        .unwrap_or(0.0)
}

/// Whether a tile is sharp enough to hash
pub fn passes_blur_gate(gray: &GrayscaleImage, floor: f64) -> bool {
    tile_sharpness(gray) >= floor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_tile_is_blurry() {
        let flat = GrayscaleImage::from_fn(64, 64, |_, _| 128);
        assert_eq!(laplacian_variance(&flat), 0.0);
        assert!(!passes_blur_gate(&flat, DEFAULT_BLUR_FLOOR));
    }

    #[test]
    fn checkerboard_is_sharp() {
        let checker = GrayscaleImage::from_fn(64, 64, |x, y| if (x + y) % 2 == 0 { 0 } else { 255 });
        assert!(laplacian_variance(&checker) > 10_000.0);
        assert!(passes_blur_gate(&checker, DEFAULT_BLUR_FLOOR));
    }

    #[test]
    fn smooth_gradient_is_blurry() {
        // A linear ramp has zero second derivative
        let ramp = GrayscaleImage::from_fn(64, 64, |x, _| (x * 4) as u8);
        assert!(laplacian_variance(&ramp) < 1.0);
    }

    #[test]
    fn tiny_tile_scores_zero() {
        let tiny = GrayscaleImage::from_fn(2, 2, |x, _| (x * 255) as u8);
        assert_eq!(laplacian_variance(&tiny), 0.0);
    }
}
