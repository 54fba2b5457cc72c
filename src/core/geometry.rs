use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::popcode2d::Vec2;

/// Integer cell coordinates on the environment grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn in_grid(self, size: usize) -> bool {
        let n = size as i64;
        (0..n).contains(&(self.x as i64)) && (0..n).contains(&(self.y as i64))
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

/// Euclidean distance between two cells.
pub fn distance(a: GridPoint, b: GridPoint) -> f32 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    dx.hypot(dy) as f32
}

/// Bearing of `b` as seen from `a`, in degrees in `[0, 360)`, counted
/// counter-clockwise from +x. Coincident points have bearing 0.
pub fn bearing_deg(a: GridPoint, b: GridPoint) -> f32 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    normalize_deg(dy.atan2(dx).to_degrees() as f32)
}

/// Reduce an angle into `[0, 360)`.
pub fn normalize_deg(deg: f32) -> f32 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Largest distance two cells of a `size`x`size` grid can be apart.
pub fn max_distance(size: usize) -> f32 {
    let span = size.saturating_sub(1) as f64;
    (span * std::f64::consts::SQRT_2) as f32
}
