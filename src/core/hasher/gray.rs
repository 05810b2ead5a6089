//! Grayscale buffers and the deterministic pixel operations hashing relies on.
//!
//! Every operation here is integer-exact or uses fixed rounding, so the same
//! input always yields the same bytes. Hash bits depend on it.

use image::GrayImage;

/// ITU-R BT.601 luma weights
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Default lower percentile for the contrast stretch
pub const DEFAULT_LOW_PERCENTILE: f64 = 0.03;
/// Default upper percentile for the contrast stretch
pub const DEFAULT_HIGH_PERCENTILE: f64 = 0.97;

/// Row-major 8-bit luma buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GrayscaleImage {
    /// Wrap a pixel buffer. Returns `None` if the buffer doesn't hold
    /// exactly `width * height` bytes.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build an image by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Whether the image holds no pixels
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel value at (x, y). Caller guarantees bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Copy out a sub-rectangle. Returns `None` if it doesn't fit.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if x.checked_add(width)? > self.width || y.checked_add(height)? > self.height {
            return None;
        }
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in y..y + height {
            let start = row as usize * self.width as usize + x as usize;
            pixels.extend_from_slice(&self.pixels[start..start + width as usize]);
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Mean pixel value
    pub fn mean(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().map(|&p| p as f64).sum::<f64>() / self.pixels.len() as f64
    }

    fn histogram(&self) -> [usize; 256] {
        let mut histogram = [0usize; 256];
        for &p in &self.pixels {
            histogram[p as usize] += 1;
        }
        histogram
    }
}

impl From<&GrayImage> for GrayscaleImage {
    fn from(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.as_raw().clone(),
        }
    }
}

impl From<GrayscaleImage> for GrayImage {
    fn from(image: GrayscaleImage) -> Self {
        let (width, height) = (image.width, image.height);
        // Buffer length is an invariant of GrayscaleImage
        GrayImage::from_raw(width, height, image.pixels)
            .unwrap_or_else(|| GrayImage::new(width, height))
    }
}

/// Convert an RGBA buffer to luma: `0.299R + 0.587G + 0.114B`, rounded.
///
/// Returns `None` if the buffer is shorter than `width * height * 4`.
pub fn to_grayscale(rgba: &[u8], width: u32, height: u32) -> Option<GrayscaleImage> {
    let count = width as usize * height as usize;
    if width == 0 || height == 0 || rgba.len() < count * 4 {
        return None;
    }

    let pixels = rgba
        .chunks_exact(4)
        .take(count)
        .map(|px| {
            let luma = LUMA_R * px[0] as f64 + LUMA_G * px[1] as f64 + LUMA_B * px[2] as f64;
            luma.round().clamp(0.0, 255.0) as u8
        })
        .collect();

    GrayscaleImage::new(width, height, pixels)
}

/// Percentile-based histogram stretch.
///
/// Maps the `low_pct` percentile to 0 and the `high_pct` percentile to 255,
/// clamping outside values, then applies `gamma`. If the two bounds collapse
/// (`high <= low`) the input is returned unchanged.
pub fn normalize_contrast(
    gray: &GrayscaleImage,
    low_pct: f64,
    high_pct: f64,
    gamma: f64,
) -> GrayscaleImage {
    if gray.is_empty() {
        return gray.clone();
    }

    let histogram = gray.histogram();
    let low = percentile_value(&histogram, gray.pixels.len(), low_pct);
    let high = percentile_value(&histogram, gray.pixels.len(), high_pct);
    if high <= low {
        return gray.clone();
    }

    let range = (high - low) as f64;
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let mut t = ((value as f64 - low as f64) / range).clamp(0.0, 1.0);
        if gamma != 1.0 && gamma > 0.0 {
            t = t.powf(gamma);
        }
        *slot = (t * 255.0).round() as u8;
    }

    apply_lut(gray, &lut)
}

/// Classic CDF histogram equalization.
///
/// A single-valued image is returned unchanged.
pub fn equalize_histogram(gray: &GrayscaleImage) -> GrayscaleImage {
    if gray.is_empty() {
        return gray.clone();
    }

    let histogram = gray.histogram();
    let total = gray.pixels.len();
    let mut cdf = [0usize; 256];
    let mut running = 0;
    for (value, count) in histogram.iter().enumerate() {
        running += count;
        cdf[value] = running;
    }

    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == cdf_min {
        return gray.clone();
    }

    let denominator = (total - cdf_min) as f64;
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let numerator = cdf[value].saturating_sub(cdf_min) as f64;
        *slot = (numerator / denominator * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    apply_lut(gray, &lut)
}

/// Nearest-neighbor resize. Source pixel for destination `x` is
/// `floor(x * src_w / dst_w)`; no interpolation, so output is reproducible.
pub fn resize_nearest(gray: &GrayscaleImage, dst_w: u32, dst_h: u32) -> Option<GrayscaleImage> {
    if gray.is_empty() || dst_w == 0 || dst_h == 0 {
        return None;
    }
    let (src_w, src_h) = (gray.width as u64, gray.height as u64);

    let columns: Vec<u32> = (0..dst_w as u64)
        .map(|x| ((x * src_w) / dst_w as u64) as u32)
        .collect();

    Some(GrayscaleImage::from_fn(dst_w, dst_h, |x, y| {
        let sy = ((y as u64 * src_h) / dst_h as u64) as u32;
        gray.get(columns[x as usize], sy)
    }))
}

/// Preprocessing applied to every tile before hashing.
///
/// Contrast stretch with default percentiles; histogram equalization is a
/// build-time choice so catalog and device hashes always agree.
pub fn preprocess(gray: &GrayscaleImage) -> GrayscaleImage {
    let stretched = normalize_contrast(gray, DEFAULT_LOW_PERCENTILE, DEFAULT_HIGH_PERCENTILE, 1.0);
    if cfg!(feature = "histogram-equalization") {
        equalize_histogram(&stretched)
    } else {
        stretched
    }
}

fn percentile_value(histogram: &[usize; 256], total: usize, pct: f64) -> u8 {
    let rank = ((total - 1) as f64 * pct.clamp(0.0, 1.0)).floor() as usize;
    let mut running = 0;
    for (value, count) in histogram.iter().enumerate() {
        running += count;
        if running > rank {
            return value as u8;
        }
    }
    255
}

fn apply_lut(gray: &GrayscaleImage, lut: &[u8; 256]) -> GrayscaleImage {
    GrayscaleImage {
        width: gray.width,
        height: gray.height,
        pixels: gray.pixels.iter().map(|&p| lut[p as usize]).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_uses_bt601_weights() {
        let rgba = [255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255];
        let gray = to_grayscale(&rgba, 4, 1).unwrap();
        assert_eq!(gray.pixels(), &[76, 150, 29, 255]);
    }

    #[test]
    fn grayscale_rejects_short_buffer() {
        assert!(to_grayscale(&[0; 12], 2, 2).is_none());
        assert!(to_grayscale(&[], 0, 0).is_none());
    }

    #[test]
    fn stretch_expands_narrow_range() {
        let gray = GrayscaleImage::from_fn(100, 1, |x, _| 100 + (x % 50) as u8);
        let stretched = normalize_contrast(&gray, 0.0, 1.0, 1.0);
        assert_eq!(*stretched.pixels().iter().min().unwrap(), 0);
        assert_eq!(*stretched.pixels().iter().max().unwrap(), 255);
    }

    #[test]
    fn stretch_returns_input_when_bounds_collapse() {
        let gray = GrayscaleImage::from_fn(10, 10, |_, _| 90);
        assert_eq!(normalize_contrast(&gray, 0.03, 0.97, 1.0), gray);
    }

    #[test]
    fn equalization_spans_full_range() {
        let gray = GrayscaleImage::from_fn(4, 1, |x, _| [10, 20, 30, 40][x as usize]);
        let equalized = equalize_histogram(&gray);
        assert_eq!(equalized.pixels(), &[0, 85, 170, 255]);
    }

    #[test]
    fn equalization_keeps_flat_image() {
        let gray = GrayscaleImage::from_fn(3, 3, |_, _| 42);
        assert_eq!(equalize_histogram(&gray), gray);
    }

    #[test]
    fn nearest_resize_picks_floor_sample() {
        let gray = GrayscaleImage::from_fn(4, 1, |x, _| (x * 10) as u8);
        let half = resize_nearest(&gray, 2, 1).unwrap();
        assert_eq!(half.pixels(), &[0, 20]);

        let double = resize_nearest(&gray, 8, 1).unwrap();
        assert_eq!(double.pixels(), &[0, 0, 10, 10, 20, 20, 30, 30]);
    }

    #[test]
    fn nearest_resize_is_deterministic() {
        let gray = GrayscaleImage::from_fn(97, 61, |x, y| ((x * 7 + y * 13) % 256) as u8);
        let a = resize_nearest(&gray, 32, 32).unwrap();
        let b = resize_nearest(&gray, 32, 32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn crop_rejects_out_of_bounds() {
        let gray = GrayscaleImage::from_fn(10, 10, |x, y| (x + y) as u8);
        assert!(gray.crop(5, 5, 6, 1).is_none());
        let tile = gray.crop(2, 3, 2, 2).unwrap();
        assert_eq!(tile.pixels(), &[5, 6, 6, 7]);
    }
}
