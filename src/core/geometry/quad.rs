//! Card-edge quad detection and perspective rectification.
//!
//! A tilted card shows up as a quadrilateral inside its crop. We look for
//! the strongest edge response near each corner of the tile, and if the four
//! points enclose enough of the tile we warp that quad back to a rectangle
//! before hashing.

use crate::core::hasher::{resize_nearest, GrayscaleImage};

/// Minimum quad area, as a fraction of the tile area, for rectification
pub const MIN_QUAD_AREA_RATIO: f64 = 0.18;
/// Edge score lost per unit of normalized distance from the tile corner
const CORNER_PENALTY: f64 = 400.0;
/// Smallest tile we attempt to search
const MIN_TILE_SIDE: u32 = 8;

/// Sub-pixel point in tile coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Quadrilateral in tile coordinates: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Point; 4],
}

impl Quad {
    /// Shoelace area
    pub fn area(&self) -> f64 {
        let c = &self.corners;
        let mut twice = 0.0;
        for i in 0..4 {
            let (a, b) = (c[i], c[(i + 1) % 4]);
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() / 2.0
    }

    /// Bilinear blend of the four corners at (u, v) in the unit square
    fn point_at(&self, u: f64, v: f64) -> Point {
        let [tl, tr, br, bl] = self.corners;
        Point {
            x: (1.0 - u) * (1.0 - v) * tl.x + u * (1.0 - v) * tr.x + u * v * br.x + (1.0 - u) * v * bl.x,
            y: (1.0 - u) * (1.0 - v) * tl.y + u * (1.0 - v) * tr.y + u * v * br.y + (1.0 - u) * v * bl.y,
        }
    }
}

/// Sobel gradient magnitude. Border pixels are 0.
pub fn sobel_magnitude(gray: &GrayscaleImage) -> Vec<f64> {
    let (w, h) = (gray.width(), gray.height());
    let mut magnitude = vec![0.0; w as usize * h as usize];
    if w < 3 || h < 3 {
        return magnitude;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = |dx: i32, dy: i32| gray.get((x as i32 + dx) as u32, (y as i32 + dy) as u32) as f64;
            let gx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            let gy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
            magnitude[(y * w + x) as usize] = (gx * gx + gy * gy).sqrt();
        }
    }
    magnitude
}

/// Find the card corner in each quadrant of the tile.
///
/// Each quadrant's corner is the pixel maximizing Sobel magnitude minus a
/// penalty proportional to its distance from that quadrant's outer corner.
/// Returns `None` for tiles too small to search or with no edge energy.
pub fn detect_quad(gray: &GrayscaleImage) -> Option<Quad> {
    let (w, h) = (gray.width(), gray.height());
    if w < MIN_TILE_SIDE || h < MIN_TILE_SIDE {
        return None;
    }

    let magnitude = sobel_magnitude(gray);
    let (mid_x, mid_y) = (w / 2, h / 2);
    let half_diagonal = ((mid_x * mid_x + mid_y * mid_y) as f64).sqrt().max(1.0);
    let (right, bottom) = ((w - 1) as f64, (h - 1) as f64);

    let quadrants = [
        (1..mid_x, 1..mid_y, Point { x: 0.0, y: 0.0 }),
        (mid_x..w - 1, 1..mid_y, Point { x: right, y: 0.0 }),
        (mid_x..w - 1, mid_y..h - 1, Point { x: right, y: bottom }),
        (1..mid_x, mid_y..h - 1, Point { x: 0.0, y: bottom }),
    ];

    let mut corners = [Point { x: 0.0, y: 0.0 }; 4];
    for (slot, (xs, ys, anchor)) in corners.iter_mut().zip(quadrants) {
        let mut best: Option<(f64, Point)> = None;
        for y in ys.clone() {
            for x in xs.clone() {
                let energy = magnitude[(y * w + x) as usize];
                if energy <= 0.0 {
                    continue;
                }
                let dist = ((x as f64 - anchor.x).powi(2) + (y as f64 - anchor.y).powi(2)).sqrt();
                let score = energy - CORNER_PENALTY * dist / half_diagonal;
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, Point { x: x as f64, y: y as f64 }));
                }
            }
        }
        *slot = best?.1;
    }

    Some(Quad { corners })
}

/// Warp the quad onto a `dst_w` x `dst_h` rectangle with bilinear sampling
pub fn warp_bilinear(gray: &GrayscaleImage, quad: &Quad, dst_w: u32, dst_h: u32) -> Option<GrayscaleImage> {
    if gray.is_empty() || dst_w == 0 || dst_h == 0 {
        return None;
    }
    let (max_x, max_y) = ((gray.width() - 1) as f64, (gray.height() - 1) as f64);

    Some(GrayscaleImage::from_fn(dst_w, dst_h, |i, j| {
        let u = (i as f64 + 0.5) / dst_w as f64;
        let v = (j as f64 + 0.5) / dst_h as f64;
        let p = quad.point_at(u, v);
        let (x, y) = (p.x.clamp(0.0, max_x), p.y.clamp(0.0, max_y));

        let (x0, y0) = (x.floor(), y.floor());
        let (x1, y1) = ((x0 + 1.0).min(max_x), (y0 + 1.0).min(max_y));
        let (fx, fy) = (x - x0, y - y0);
        let at = |px: f64, py: f64| gray.get(px as u32, py as u32) as f64;

        let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
        let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    }))
}

/// Rectify the tile if a large enough quad is found, otherwise plain resize
pub fn rectify_or_resize(gray: &GrayscaleImage, dst_w: u32, dst_h: u32) -> Option<GrayscaleImage> {
    let tile_area = gray.width() as f64 * gray.height() as f64;
    match detect_quad(gray) {
        Some(quad) if quad.area() > MIN_QUAD_AREA_RATIO * tile_area => {
            warp_bilinear(gray, &quad, dst_w, dst_h)
        }
        _ => resize_nearest(gray, dst_w, dst_h),
    }
}
