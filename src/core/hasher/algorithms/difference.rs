//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Taking a 9x8 grayscale tile
//! 2. Comparing each pixel to the one to its right
//! 3. If left pixel is brighter, set bit to 1, else 0
//!
//! This captures the relative gradient of brightness changes. Bits are
//! packed MSB-first in row-major order.

use super::super::gray::GrayscaleImage;
use super::super::traits::{HashAlgorithm, HashAlgorithmKind};

/// Width of the dHash input tile (one extra column for differences)
pub const DHASH_TILE_WIDTH: u32 = 9;
/// Height of the dHash input tile
pub const DHASH_TILE_HEIGHT: u32 = 8;

/// Difference Hash (dHash) implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct DifferenceHasher;

impl DifferenceHasher {
    /// Create a new dHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn tile_size(&self) -> (u32, u32) {
        (DHASH_TILE_WIDTH, DHASH_TILE_HEIGHT)
    }

    fn hash_tile(&self, tile: &GrayscaleImage) -> Option<u64> {
        if tile.width() < DHASH_TILE_WIDTH || tile.height() < DHASH_TILE_HEIGHT {
            return None;
        }

        let mut hash = 0u64;
        let mut bit = 63i32;
        for y in 0..DHASH_TILE_HEIGHT {
            for x in 0..DHASH_TILE_WIDTH - 1 {
                // Set bit if left is brighter than right
                if tile.get(x, y) > tile.get(x + 1, y) {
                    hash |= 1 << bit;
                }
                bit -= 1;
            }
        }
        Some(hash)
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Difference
    }
}

/// Compute the dHash of a 9x8 grayscale tile
pub fn compute_dhash64(gray9x8: &GrayscaleImage) -> Option<u64> {
    DifferenceHasher.hash_tile(gray9x8)
}
