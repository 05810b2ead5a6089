//! Hash algorithm implementations.

mod difference;
mod perceptual;

pub use difference::{compute_dhash64, DifferenceHasher, DHASH_TILE_HEIGHT, DHASH_TILE_WIDTH};
pub use perceptual::{compute_phash64, PerceptualHasher, PHASH_TILE};
