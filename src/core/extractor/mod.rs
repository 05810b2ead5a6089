//! # Extractor Module
//!
//! Turns one captured frame into a list of fingerprints, one per usable
//! crop variant.
//!
//! ## Per variant
//! 1. Crop the variant rectangle out of the frame
//! 2. Drop it if it is too small or fails the blur gate
//! 3. Stretch contrast
//! 4. Optionally rectify a detected card quad
//! 5. Hash at 32x32 (pHash) and 9x8 (dHash)
//!
//! Variants are hashed in parallel with rayon. Dropped variants are simply
//! absent from the output, which may be empty for an unusable frame.

use crate::core::geometry::{
    jittered_variants, passes_blur_gate, rectify_or_resize, FrameRect, GeometryVariant, RegionKind,
    DEFAULT_BLUR_FLOOR,
};
use crate::core::hasher::{
    preprocess, Fingerprint, FingerprintHasher, GrayscaleImage, DHASH_TILE_HEIGHT,
    DHASH_TILE_WIDTH, PHASH_TILE,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum number of crop variants to hash per frame
    pub max_variants: usize,
    /// Apply the percentile contrast stretch before hashing
    pub normalize_contrast: bool,
    /// Detect and rectify a card quad inside each crop
    pub rectify_quads: bool,
    /// Laplacian variance floor for the blur gate
    pub blur_floor: f64,
    /// Crops smaller than the pHash input on either side are dropped
    pub min_tile_side: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_variants: 5,
            normalize_contrast: true,
            rectify_quads: false,
            blur_floor: DEFAULT_BLUR_FLOOR,
            min_tile_side: PHASH_TILE,
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_variants(mut self, max_variants: usize) -> Self {
        self.max_variants = max_variants;
        self
    }

    pub fn normalize_contrast(mut self, enabled: bool) -> Self {
        self.normalize_contrast = enabled;
        self
    }

    pub fn rectify_quads(mut self, enabled: bool) -> Self {
        self.rectify_quads = enabled;
        self
    }

    pub fn blur_floor(mut self, floor: f64) -> Self {
        self.blur_floor = floor;
        self
    }
}

/// Produces fingerprints from captured frames
pub struct FingerprintExtractor {
    config: ExtractorConfig,
    hasher: FingerprintHasher,
}

impl FingerprintExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            hasher: FingerprintHasher::new(),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Fingerprint `region` (relative to the card) of the card located at
    /// `card_frame` (relative to the frame)
    pub fn extract(
        &self,
        frame: &GrayscaleImage,
        card_frame: &FrameRect,
        region: &FrameRect,
    ) -> Vec<Fingerprint> {
        let variants = jittered_variants(card_frame, region, self.config.max_variants);
        let fingerprints: Vec<Fingerprint> = variants
            .par_iter()
            .filter_map(|variant| self.fingerprint_variant(frame, variant))
            .collect();

        debug!(
            variants = variants.len(),
            fingerprints = fingerprints.len(),
            "extracted fingerprints"
        );
        fingerprints
    }

    /// Same as [`extract`](Self::extract) for a named region
    pub fn extract_region(
        &self,
        frame: &GrayscaleImage,
        card_frame: &FrameRect,
        region: RegionKind,
    ) -> Vec<Fingerprint> {
        self.extract(frame, card_frame, &region.card_ratio())
    }

    fn fingerprint_variant(&self, frame: &GrayscaleImage, variant: &GeometryVariant) -> Option<Fingerprint> {
        let px = variant.rect.to_pixels(frame.width(), frame.height())?;
        if px.width < self.config.min_tile_side || px.height < self.config.min_tile_side {
            debug!(variant = %variant.tag, width = px.width, height = px.height, "variant too small");
            return None;
        }

        let tile = frame.crop(px.x, px.y, px.width, px.height)?;
        if !passes_blur_gate(&tile, self.config.blur_floor) {
            debug!(variant = %variant.tag, "variant rejected by blur gate");
            return None;
        }

        let tile = if self.config.normalize_contrast {
            preprocess(&tile)
        } else {
            tile
        };

        let tag = variant.tag.as_str();
        if self.config.rectify_quads {
            let phash_tile = rectify_or_resize(&tile, PHASH_TILE, PHASH_TILE)?;
            let dhash_tile = rectify_or_resize(&tile, DHASH_TILE_WIDTH, DHASH_TILE_HEIGHT)?;
            return self.hasher.fingerprint_tiles(&phash_tile, &dhash_tile, tag);
        }
        self.hasher.fingerprint(&tile, tag)
    }
}

impl Default for FingerprintExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 200x280 frame with a textured card in the middle
    fn textured_frame() -> GrayscaleImage {
        GrayscaleImage::from_fn(200, 280, |x, y| {
            if (20..180).contains(&x) && (20..260).contains(&y) {
                (((x / 7) * 37 + (y / 5) * 91) % 256) as u8
            } else {
                10
            }
        })
    }

    fn card_frame() -> FrameRect {
        FrameRect::new(0.1, 20.0 / 280.0, 0.8, 240.0 / 280.0)
    }

    #[test]
    fn extracts_one_fingerprint_per_variant() {
        let extractor = FingerprintExtractor::default();
        let fingerprints = extractor.extract_region(&textured_frame(), &card_frame(), RegionKind::FullCard);
        let tags: Vec<_> = fingerprints.iter().map(|f| f.variant_tag.as_str()).collect();
        assert_eq!(tags, vec!["base", "left", "right", "up", "down"]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = FingerprintExtractor::default();
        let frame = textured_frame();
        let a = extractor.extract_region(&frame, &card_frame(), RegionKind::Artwork);
        let b = extractor.extract_region(&frame, &card_frame(), RegionKind::Artwork);
        assert_eq!(a, b);
    }

    #[test]
    fn blurry_frame_yields_nothing() {
        let flat = GrayscaleImage::from_fn(200, 280, |_, _| 120);
        let extractor = FingerprintExtractor::default();
        assert!(extractor.extract(&flat, &FrameRect::FULL, &FrameRect::FULL).is_empty());
    }

    #[test]
    fn tiny_crop_is_dropped() {
        let frame = textured_frame();
        let extractor = FingerprintExtractor::default();
        let sliver = FrameRect::new(0.5, 0.5, 0.02, 0.02);
        assert!(extractor.extract(&frame, &sliver, &FrameRect::FULL).is_empty());
    }

    #[test]
    fn crop_below_hash_input_size_is_dropped() {
        // Card box about 20x28 px: upsampling it would hash blocks, not detail
        let frame = textured_frame();
        let extractor = FingerprintExtractor::default();
        let small = FrameRect::new(0.45, 0.45, 0.1, 0.1);
        assert!(extractor.extract(&frame, &small, &FrameRect::FULL).is_empty());
    }

    #[test]
    fn max_variants_bounds_output() {
        let extractor = FingerprintExtractor::new(ExtractorConfig::new().max_variants(2));
        let fingerprints = extractor.extract(&textured_frame(), &card_frame(), &FrameRect::FULL);
        assert!(fingerprints.len() <= 2);
    }

    #[test]
    fn rectification_still_produces_fingerprints() {
        let extractor = FingerprintExtractor::new(ExtractorConfig::new().rectify_quads(true).max_variants(1));
        let fingerprints = extractor.extract(&textured_frame(), &FrameRect::FULL, &FrameRect::FULL);
        assert_eq!(fingerprints.len(), 1);
        assert_eq!(fingerprints[0].variant_tag, "base");
    }
}
