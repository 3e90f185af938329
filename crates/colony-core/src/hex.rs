//! Axial hex coordinates and the pixel projection used to derive the
//! board graph.
//!
//! Tiles live on an axial (q, r) grid. Settlement nodes are *not* given
//! symbolic coordinates: they are discovered by projecting each hex's six
//! corners into pixel space and merging corners that land on the same
//! point (see [`crate::board`]). This module provides the projection math
//! that makes that merging exact.

use serde::{Deserialize, Serialize};

/// Hex radius used for all projections. Corners of the layout are at
/// least half a radius apart, so rounding projected corners to whole
/// pixels can never merge two distinct corners or split a shared one.
pub const HEX_SIZE: f64 = 100.0;

/// Axial coordinate for the hex grid.
///
/// `q` increases going east, `r` increases going southeast. The implicit
/// third cube coordinate satisfies q + r + s = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third cube coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighboring hexes in clockwise order starting from East
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),     // East
            HexCoord::new(self.q + 1, self.r - 1), // NorthEast
            HexCoord::new(self.q, self.r - 1),     // NorthWest
            HexCoord::new(self.q - 1, self.r),     // West
            HexCoord::new(self.q - 1, self.r + 1), // SouthWest
            HexCoord::new(self.q, self.r + 1),     // SouthEast
        ]
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Convert to pixel coordinates (center of hex).
    /// Pointy-top orientation: x = size·√3·(q + r/2), y = size·3/2·r.
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * 3.0_f64.sqrt() * (self.q as f64 + self.r as f64 / 2.0);
        let y = hex_size * 1.5 * self.r as f64;
        (x, y)
    }

    /// Convert from pixel coordinates to the nearest hex.
    pub fn from_pixel(x: f64, y: f64, hex_size: f64) -> Self {
        let q = (3.0_f64.sqrt() / 3.0 * x - 1.0 / 3.0 * y) / hex_size;
        let r = (2.0 / 3.0 * y) / hex_size;
        Self::axial_round(q, r)
    }

    /// Round fractional axial coordinates to the nearest hex.
    ///
    /// Rounds q, r, s independently, then recomputes whichever component
    /// has the largest rounding error from the other two so that
    /// q + r + s = 0 still holds. Anything else mis-snaps points near
    /// hex boundaries, which is exactly where corner merging happens.
    fn axial_round(q: f64, r: f64) -> Self {
        let s = -q - r;

        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        Self::new(rq as i32, rr as i32)
    }

    /// The six corners of this hex in pixel space, corner `i` at angle
    /// 60°·i − 30° from the center. Consecutive corners bound an edge.
    pub fn corners(&self, hex_size: f64) -> [(f64, f64); 6] {
        let (cx, cy) = self.to_pixel(hex_size);
        std::array::from_fn(|i| {
            let angle = (60.0 * i as f64 - 30.0).to_radians();
            (cx + hex_size * angle.cos(), cy + hex_size * angle.sin())
        })
    }

    /// A corner quantized to the integer pixel grid, suitable as a map
    /// key. Corners shared between neighboring hexes produce the same key.
    pub fn corner_key(&self, i: usize, hex_size: f64) -> (i64, i64) {
        let (x, y) = self.corners(hex_size)[i];
        (x.round() as i64, y.round() as i64)
    }
}
