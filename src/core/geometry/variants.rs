//! Jittered crop variants.
//!
//! Users never frame a card perfectly, so each frame is fingerprinted from a
//! handful of slightly shifted and scaled crops of the same region. One of
//! them usually lines up with how the catalog image was cropped.

use super::rect::FrameRect;
use serde::{Deserialize, Serialize};

/// Translation step, as a fraction of the crop size
const SHIFT: f64 = 0.05;
/// Scale factor for the tight variant
const TIGHT_SCALE: f64 = 0.94;
/// Scale factor for the wide variant
const WIDE_SCALE: f64 = 1.06;

/// Name of a crop variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantTag {
    Base,
    Left,
    Right,
    Up,
    Down,
    Tight,
    Wide,
}

impl VariantTag {
    /// All variants in generation order
    pub const ALL: [VariantTag; 7] = [
        VariantTag::Base,
        VariantTag::Left,
        VariantTag::Right,
        VariantTag::Up,
        VariantTag::Down,
        VariantTag::Tight,
        VariantTag::Wide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantTag::Base => "base",
            VariantTag::Left => "left",
            VariantTag::Right => "right",
            VariantTag::Up => "up",
            VariantTag::Down => "down",
            VariantTag::Tight => "tight",
            VariantTag::Wide => "wide",
        }
    }

    /// Apply this variant's perturbation to a rectangle
    fn apply(&self, rect: &FrameRect) -> FrameRect {
        match self {
            VariantTag::Base => *rect,
            VariantTag::Left => rect.translated(-SHIFT, 0.0),
            VariantTag::Right => rect.translated(SHIFT, 0.0),
            VariantTag::Up => rect.translated(0.0, -SHIFT),
            VariantTag::Down => rect.translated(0.0, SHIFT),
            VariantTag::Tight => rect.scaled(TIGHT_SCALE),
            VariantTag::Wide => rect.scaled(WIDE_SCALE),
        }
    }
}

impl std::fmt::Display for VariantTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One crop to fingerprint, in full-frame ratio coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryVariant {
    pub tag: VariantTag,
    pub rect: FrameRect,
}

/// The un-jittered crop: `region` (relative to the card) clamped into the
/// card's own box, then placed in frame coordinates
pub fn base_crop(card_frame: &FrameRect, region: &FrameRect) -> Option<FrameRect> {
    let card = card_frame.clamp_unit()?;
    let inner = region.clamp_unit()?;
    card.compose(&inner).clamp_unit()
}

/// Up to `max_variants` distinct jittered crops, base first.
///
/// Perturbations are applied in card coordinates and clamped to the card's
/// box, so a variant never reaches past the detected card edge. A variant
/// that clamps back onto an earlier crop is skipped.
pub fn jittered_variants(
    card_frame: &FrameRect,
    region: &FrameRect,
    max_variants: usize,
) -> Vec<GeometryVariant> {
    if max_variants == 0 {
        return Vec::new();
    }
    let Some(base) = base_crop(card_frame, region) else {
        return Vec::new();
    };
    let (Some(card), Some(inner)) = (card_frame.clamp_unit(), region.clamp_unit()) else {
        return Vec::new();
    };

    let mut variants = vec![GeometryVariant {
        tag: VariantTag::Base,
        rect: base,
    }];
    for tag in &VariantTag::ALL[1..] {
        if variants.len() >= max_variants {
            break;
        }
        let Some(rect) = tag
            .apply(&inner)
            .clamp_unit()
            .and_then(|jittered| card.compose(&jittered).clamp_unit())
        else {
            continue;
        };
        if variants.iter().any(|v| same_rect(&v.rect, &rect)) {
            continue;
        }
        variants.push(GeometryVariant { tag: *tag, rect });
    }
    variants
}

fn same_rect(a: &FrameRect, b: &FrameRect) -> bool {
    const EPS: f64 = 1e-9;
    (a.x - b.x).abs() < EPS
        && (a.y - b.y).abs() < EPS
        && (a.width - b.width).abs() < EPS
        && (a.height - b.height).abs() < EPS
}
