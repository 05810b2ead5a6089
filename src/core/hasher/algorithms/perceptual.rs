//! Perceptual Hash (pHash) implementation.
//!
//! pHash runs a 2D DCT-II over a 32x32 tile and keeps the 8x8 lowest
//! frequencies. Each AC coefficient becomes one bit: 1 if it is above the
//! median of the 63 AC coefficients. The DC term carries only overall
//! brightness, so its bit is always 0. This makes the hash robust to:
//! - Uniform brightness changes
//! - Mild blur
//! - Compression artifacts

use super::super::gray::GrayscaleImage;
use super::super::traits::{HashAlgorithm, HashAlgorithmKind};
use std::f64::consts::PI;

/// Side length of the DCT input tile
pub const PHASH_TILE: u32 = 32;
/// Side length of the retained low-frequency block
const LOW_FREQ: usize = 8;

/// Perceptual Hash (pHash) implementation using DCT
pub struct PerceptualHasher {
    /// cos_table[k][n] = c(k) * cos((2n + 1) k pi / 2N), orthonormal scaling
    cos_table: [[f64; PHASH_TILE as usize]; LOW_FREQ],
}

impl PerceptualHasher {
    /// Create a new pHash hasher
    pub fn new() -> Self {
        let n = PHASH_TILE as usize;
        let mut cos_table = [[0.0; PHASH_TILE as usize]; LOW_FREQ];
        for (k, row) in cos_table.iter_mut().enumerate() {
            let scale = if k == 0 {
                (1.0 / n as f64).sqrt()
            } else {
                (2.0 / n as f64).sqrt()
            };
            for (i, value) in row.iter_mut().enumerate() {
                *value = scale * ((2 * i + 1) as f64 * k as f64 * PI / (2 * n) as f64).cos();
            }
        }
        Self { cos_table }
    }

    /// The 8x8 low-frequency DCT-II coefficients of the top-left 32x32 block,
    /// row-major by (vertical, horizontal) frequency
    fn low_frequency_dct(&self, tile: &GrayscaleImage) -> [f64; LOW_FREQ * LOW_FREQ] {
        let n = PHASH_TILE as usize;

        // Horizontal pass: rows[y][v]
        let mut rows = [[0.0f64; LOW_FREQ]; PHASH_TILE as usize];
        for (y, row) in rows.iter_mut().enumerate() {
            for (v, out) in row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for x in 0..n {
                    sum += tile.get(x as u32, y as u32) as f64 * self.cos_table[v][x];
                }
                *out = sum;
            }
        }

        // Vertical pass
        let mut coefficients = [0.0f64; LOW_FREQ * LOW_FREQ];
        for u in 0..LOW_FREQ {
            for v in 0..LOW_FREQ {
                let mut sum = 0.0;
                for (y, row) in rows.iter().enumerate() {
                    sum += self.cos_table[u][y] * row[v];
                }
                coefficients[u * LOW_FREQ + v] = sum;
            }
        }
        coefficients
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn tile_size(&self) -> (u32, u32) {
        (PHASH_TILE, PHASH_TILE)
    }

    fn hash_tile(&self, tile: &GrayscaleImage) -> Option<u64> {
        if tile.width() < PHASH_TILE || tile.height() < PHASH_TILE {
            return None;
        }

        let coefficients = self.low_frequency_dct(tile);

        let mut ac: Vec<f64> = coefficients[1..].to_vec();
        ac.sort_by(|a, b| a.total_cmp(b));
        let median = ac[ac.len() / 2];

        // Bit 63 is the DC term and stays 0
        let mut hash = 0u64;
        for (index, &coefficient) in coefficients.iter().enumerate().skip(1) {
            if coefficient > median {
                hash |= 1 << (63 - index);
            }
        }
        Some(hash)
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Perceptual
    }
}

/// Compute the pHash of a 32x32 grayscale tile
pub fn compute_phash64(gray32x32: &GrayscaleImage) -> Option<u64> {
    PerceptualHasher::new().hash_tile(gray32x32)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random texture in [lo, lo + span)
    fn texture(seed: u32, lo: u8, span: u32) -> GrayscaleImage {
        let mut state = seed;
        GrayscaleImage::from_fn(PHASH_TILE, PHASH_TILE, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            lo + ((state >> 16) % span) as u8
        })
    }

    #[test]
    fn identical_tiles_produce_identical_hash() {
        let tile = texture(7, 20, 180);
        assert_eq!(compute_phash64(&tile), compute_phash64(&tile));
    }

    #[test]
    fn dc_bit_is_always_zero() {
        for seed in 1..6 {
            let hash = compute_phash64(&texture(seed, 0, 255)).unwrap();
            assert_eq!(hash >> 63, 0);
        }
    }

    #[test]
    fn uniform_brightness_offset_does_not_change_hash() {
        let tile = texture(11, 20, 150);
        let brighter = GrayscaleImage::from_fn(PHASH_TILE, PHASH_TILE, |x, y| tile.get(x, y) + 40);
        assert_eq!(compute_phash64(&tile), compute_phash64(&brighter));
    }

    #[test]
    fn mirrored_step_changes_hash() {
        let left = GrayscaleImage::from_fn(PHASH_TILE, PHASH_TILE, |x, _| if x < 16 { 220 } else { 30 });
        let right = GrayscaleImage::from_fn(PHASH_TILE, PHASH_TILE, |x, _| if x < 16 { 30 } else { 220 });
        let a = compute_phash64(&left).unwrap();
        let b = compute_phash64(&right).unwrap();
        assert!((a ^ b).count_ones() > 0);
    }

    #[test]
    fn undersized_tile_is_unavailable() {
        let small = GrayscaleImage::from_fn(31, 32, |_, _| 0);
        assert_eq!(compute_phash64(&small), None);
        assert_eq!(PerceptualHasher::new().hash_tile_hex(&small), "");
    }

    #[test]
    fn hex_output_is_sixteen_digits() {
        let hex = PerceptualHasher::new().hash_tile_hex(&texture(3, 0, 255));
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn kind_returns_perceptual() {
        assert_eq!(PerceptualHasher::new().kind(), HashAlgorithmKind::Perceptual);
    }
}
