//! # Hasher Module
//!
//! Computes the perceptual hashes that fingerprint a card.
//!
//! ## Supported Algorithms
//! - **pHash (Perceptual Hash)** - DCT low frequencies, robust to brightness and blur
//! - **dHash (Difference Hash)** - horizontal gradients, cheap and robust to lighting
//!
//! ## How It Works
//! 1. Convert to grayscale
//! 2. Stretch contrast (percentile-based)
//! 3. Resize with nearest-neighbor sampling (32x32 for pHash, 9x8 for dHash)
//! 4. Compute both hashes, split into 32-bit halves
//! 5. Compare hashes using Hamming distance
//!
//! Every step is deterministic: the same frame always yields the same bits,
//! so device hashes line up with catalog hashes computed offline.

mod algorithms;
mod fingerprint;
mod gray;
mod hex;
mod traits;

pub use algorithms::{
    compute_dhash64, compute_phash64, DifferenceHasher, PerceptualHasher, DHASH_TILE_HEIGHT,
    DHASH_TILE_WIDTH, PHASH_TILE,
};
pub use fingerprint::{Fingerprint, RawFingerprint};
pub use gray::{
    equalize_histogram, normalize_contrast, preprocess, resize_nearest, to_grayscale,
    GrayscaleImage, DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE,
};
pub use hex::{
    derive_bucket16, hamming_distance64, hi_lo_to_hex64, join_u64, split_hex64_to_hi_lo, split_u64,
};
pub use traits::{HashAlgorithm, HashAlgorithmKind};

/// Hashes a preprocessed tile with both algorithms
#[derive(Default)]
pub struct FingerprintHasher {
    phash: PerceptualHasher,
    dhash: DifferenceHasher,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize `tile` to each algorithm's input and hash it.
    ///
    /// Returns `None` if either hash is unavailable.
    pub fn fingerprint(&self, tile: &GrayscaleImage, variant_tag: &str) -> Option<Fingerprint> {
        let phash = self.phash.hash_gray(tile)?;
        let dhash = self.dhash.hash_gray(tile)?;
        Some(Fingerprint::from_hashes(phash, dhash, variant_tag))
    }

    /// Hash tiles that are already at each algorithm's input size
    pub fn fingerprint_tiles(
        &self,
        phash_tile: &GrayscaleImage,
        dhash_tile: &GrayscaleImage,
        variant_tag: &str,
    ) -> Option<Fingerprint> {
        let phash = self.phash.hash_tile(phash_tile)?;
        let dhash = self.dhash.hash_tile(dhash_tile)?;
        Some(Fingerprint::from_hashes(phash, dhash, variant_tag))
    }
}
