//! Trait definitions for perceptual hashing.

use super::gray::{resize_nearest, GrayscaleImage};
use serde::{Deserialize, Serialize};

/// Available hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithmKind {
    /// Difference Hash (dHash) - horizontal gradient structure
    Difference,
    /// Perceptual Hash (pHash) - DCT low frequencies
    Perceptual,
}

impl HashAlgorithmKind {
    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
            HashAlgorithmKind::Perceptual => {
                "Perceptual Hash (pHash) - DCT-based, robust to brightness and mild blur"
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithmKind::Difference => write!(f, "dHash"),
            HashAlgorithmKind::Perceptual => write!(f, "pHash"),
        }
    }
}

/// A 64-bit tile hash
pub trait HashAlgorithm: Send + Sync {
    /// Width and height of the tile this algorithm consumes
    fn tile_size(&self) -> (u32, u32);

    /// Hash a tile already at `tile_size()`.
    ///
    /// Returns `None` if the tile is smaller than required; callers treat
    /// that as "no fingerprint for this variant".
    fn hash_tile(&self, tile: &GrayscaleImage) -> Option<u64>;

    /// Resize an arbitrary grayscale image to the tile size and hash it
    fn hash_gray(&self, gray: &GrayscaleImage) -> Option<u64> {
        let (width, height) = self.tile_size();
        let tile = resize_nearest(gray, width, height)?;
        self.hash_tile(&tile)
    }

    /// Hash a tile and render it as 16 lowercase hex digits, or an empty
    /// string when the tile is unusable
    fn hash_tile_hex(&self, tile: &GrayscaleImage) -> String {
        self.hash_tile(tile)
            .map(|hash| format!("{:016x}", hash))
            .unwrap_or_default()
    }

    /// Get the algorithm kind
    fn kind(&self) -> HashAlgorithmKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_kind_display() {
        assert_eq!(HashAlgorithmKind::Difference.to_string(), "dHash");
        assert_eq!(HashAlgorithmKind::Perceptual.to_string(), "pHash");
    }

    #[test]
    fn descriptions_name_the_algorithm() {
        assert!(HashAlgorithmKind::Perceptual.description().contains("DCT"));
        assert!(HashAlgorithmKind::Difference.description().contains("gradients"));
    }
}
