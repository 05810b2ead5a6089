//! Normalized rectangles and their mapping to pixels.

use serde::{Deserialize, Serialize};

/// A rectangle in ratio coordinates, relative to some parent box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FrameRect {
    pub const FULL: FrameRect = FrameRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether every component is finite and the size is positive
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Clamp into the unit square. Returns `None` if nothing is left.
    pub fn clamp_unit(&self) -> Option<FrameRect> {
        if !self.is_valid() {
            return None;
        }
        let left = self.x.clamp(0.0, 1.0);
        let top = self.y.clamp(0.0, 1.0);
        let right = (self.x + self.width).clamp(0.0, 1.0);
        let bottom = (self.y + self.height).clamp(0.0, 1.0);
        if right <= left || bottom <= top {
            return None;
        }
        Some(FrameRect::new(left, top, right - left, bottom - top))
    }

    /// Express `inner` (relative to `self`) in `self`'s parent coordinates
    pub fn compose(&self, inner: &FrameRect) -> FrameRect {
        FrameRect::new(
            self.x + inner.x * self.width,
            self.y + inner.y * self.height,
            inner.width * self.width,
            inner.height * self.height,
        )
    }

    /// Shift by a fraction of this rectangle's own size
    pub fn translated(&self, dx: f64, dy: f64) -> FrameRect {
        FrameRect::new(
            self.x + dx * self.width,
            self.y + dy * self.height,
            self.width,
            self.height,
        )
    }

    /// Scale about the centre
    pub fn scaled(&self, factor: f64) -> FrameRect {
        let width = self.width * factor;
        let height = self.height * factor;
        FrameRect::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }

    /// Map to integer pixels inside a `frame_width` x `frame_height` image.
    ///
    /// Returns `None` when the rectangle is invalid or collapses to zero pixels.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        let unit = self.clamp_unit()?;
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let left = (unit.x * fw).round() as u32;
        let top = (unit.y * fh).round() as u32;
        let right = ((unit.x + unit.width) * fw).round().min(fw) as u32;
        let bottom = ((unit.y + unit.height) * fh).round().min(fh) as u32;
        if right <= left || bottom <= top {
            return None;
        }
        Some(PixelRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }
}

/// Which part of the card to fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// The whole card face
    #[default]
    FullCard,
    /// The illustration box only
    Artwork,
}

impl RegionKind {
    /// The region's rectangle relative to the card's bounding box
    pub fn card_ratio(&self) -> FrameRect {
        match self {
            RegionKind::FullCard => FrameRect::FULL,
            RegionKind::Artwork => FrameRect::new(0.08, 0.11, 0.84, 0.45),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::FullCard => "full",
            RegionKind::Artwork => "artwork",
        }
    }
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
