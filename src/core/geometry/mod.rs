//! # Geometry Module
//!
//! Where to crop a captured frame before hashing it.
//!
//! - `rect` - ratio rectangles (card box, art box) and pixel mapping
//! - `variants` - jittered crops that absorb framing error
//! - `quad` - optional corner detection and perspective rectification
//! - `blur` - Laplacian-variance gate that drops unusable tiles

mod blur;
mod quad;
mod rect;
mod variants;

pub use blur::{laplacian_variance, passes_blur_gate, tile_sharpness, DEFAULT_BLUR_FLOOR};
pub use quad::{detect_quad, rectify_or_resize, sobel_magnitude, warp_bilinear, Point, Quad, MIN_QUAD_AREA_RATIO};
pub use rect::{FrameRect, PixelRect, RegionKind};
pub use variants::{base_crop, jittered_variants, GeometryVariant, VariantTag};
