//! Two-dimensional population codes over a lattice of units.
//!
//! Unit (i, j) is tuned to `(cx[i], cy[j])`; its response falls off with the
//! Euclidean distance measured in sigma-scaled axis units. The grid is stored
//! row-major with Y as the row axis, matching `Tensor` shapes of `[ny, nx]`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DecodeError, ShapeError};
use crate::popcode::{check_range, check_sigma, check_threshold, gauss, linear_centers, EncodeMode};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PopCode2DParams {
    pub units_x: usize,
    pub units_y: usize,
    pub min: Vec2,
    pub max: Vec2,
    /// Per-axis tuning width in multiples of that axis's center spacing.
    pub sigma: Vec2,
    pub normalize: bool,
    pub clip: bool,
    pub threshold: f32,
}

impl Default for PopCode2DParams {
    fn default() -> Self {
        Self {
            units_x: 12,
            units_y: 12,
            min: Vec2::splat(-0.5),
            max: Vec2::splat(1.5),
            sigma: Vec2::splat(1.0),
            normalize: false,
            clip: true,
            threshold: 0.0,
        }
    }
}

impl PopCode2DParams {
    /// Square lattice with the same range on both axes.
    pub fn square(units: usize, min: f32, max: f32, sigma: f32) -> Self {
        Self {
            units_x: units,
            units_y: units,
            min: Vec2::splat(min),
            max: Vec2::splat(max),
            sigma: Vec2::splat(sigma),
            ..Default::default()
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    pub fn build(self) -> Result<PopCode2D, ConfigError> {
        PopCode2D::new(self)
    }
}

#[derive(Debug, Clone)]
pub struct PopCode2D {
    params: PopCode2DParams,
    cx: Vec<f32>,
    cy: Vec<f32>,
    width: Vec2,
}

impl PopCode2D {
    pub fn new(params: PopCode2DParams) -> Result<Self, ConfigError> {
        for units in [params.units_x, params.units_y] {
            if units == 0 {
                return Err(ConfigError::InvalidUnits(units));
            }
        }
        check_range(params.min.x, params.max.x)?;
        check_range(params.min.y, params.max.y)?;
        check_sigma(params.sigma.x)?;
        check_sigma(params.sigma.y)?;
        check_threshold(params.threshold)?;

        let (cx, sx) = linear_centers(params.units_x, params.min.x, params.max.x);
        let (cy, sy) = linear_centers(params.units_y, params.min.y, params.max.y);
        Ok(Self {
            params,
            cx,
            cy,
            width: Vec2::new(params.sigma.x * sx, params.sigma.y * sy),
        })
    }

    pub fn params(&self) -> &PopCode2DParams {
        &self.params
    }

    /// `[units_y, units_x]`
    pub fn shape(&self) -> [usize; 2] {
        [self.cy.len(), self.cx.len()]
    }

    pub fn len(&self) -> usize {
        self.cx.len() * self.cy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn center(&self, row: usize, col: usize) -> Option<Vec2> {
        Some(Vec2::new(*self.cx.get(col)?, *self.cy.get(row)?))
    }

    pub fn encode(&self, value: Vec2) -> Vec<f32> {
        let mut out = vec![0.0; self.len()];
        self.fill(&mut out, value, EncodeMode::Set);
        out
    }

    /// Encode into a row-major `[units_y, units_x]` buffer. `Set` clears the
    /// whole grid first; `Add` accumulates so several points can share a map.
    pub fn encode_into(&self, out: &mut [f32], value: Vec2, mode: EncodeMode) -> Result<(), ShapeError> {
        self.check_len(out.len())?;
        self.fill(out, value, mode);
        Ok(())
    }

    /// Activation-weighted centroid of the lattice.
    pub fn decode(&self, acts: &[f32]) -> Result<Vec2, DecodeError> {
        self.check_len(acts.len())?;
        let thr = self.params.threshold;
        let nx = self.cx.len();
        let (mut sum, mut wx, mut wy) = (0.0f64, 0.0f64, 0.0f64);
        for (idx, &a) in acts.iter().enumerate() {
            if a > 0.0 && a >= thr {
                let a = a as f64;
                sum += a;
                wx += a * self.cx[idx % nx] as f64;
                wy += a * self.cy[idx / nx] as f64;
            }
        }
        if sum <= 0.0 {
            return Err(DecodeError::NoActivity);
        }
        Ok(Vec2::new((wx / sum) as f32, (wy / sum) as f32))
    }

    fn check_len(&self, got: usize) -> Result<(), ShapeError> {
        if got != self.len() {
            return Err(ShapeError {
                expected: self.len(),
                got,
            });
        }
        Ok(())
    }

    fn fill(&self, out: &mut [f32], value: Vec2, mode: EncodeMode) {
        let p = &self.params;
        let v = if p.clip {
            Vec2::new(value.x.clamp(p.min.x, p.max.x), value.y.clamp(p.min.y, p.max.y))
        } else {
            value
        };

        // Separable: exp(-0.5 (zx^2 + zy^2)) = gx * gy.
        let gx: Vec<f32> = self.cx.iter().map(|&c| gauss(v.x - c, self.width.x)).collect();
        let gy: Vec<f32> = self.cy.iter().map(|&c| gauss(v.y - c, self.width.y)).collect();

        let scale = if p.normalize {
            let peak = gx.iter().copied().fold(0.0f32, f32::max) * gy.iter().copied().fold(0.0f32, f32::max);
            if peak > 0.0 {
                1.0 / peak
            } else {
                1.0
            }
        } else {
            1.0
        };

        let nx = self.cx.len();
        for (row, &ay) in gy.iter().enumerate() {
            let line = &mut out[row * nx..(row + 1) * nx];
            for (o, &ax) in line.iter_mut().zip(&gx) {
                let a = ax * ay * scale;
                match mode {
                    EncodeMode::Set => *o = a,
                    EncodeMode::Add => *o += a,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::argmax;

    #[test]
    fn rejects_invalid_params() {
        let mut p = PopCode2DParams::square(4, 0.0, 3.0, 1.0);
        p.units_y = 0;
        assert_eq!(p.build().unwrap_err(), ConfigError::InvalidUnits(0));

        let mut p = PopCode2DParams::square(4, 0.0, 3.0, 1.0);
        p.max.y = -1.0;
        assert!(matches!(p.build(), Err(ConfigError::InvalidRange { .. })));

        let mut p = PopCode2DParams::square(4, 0.0, 3.0, 1.0);
        p.sigma.x = 0.0;
        assert!(matches!(p.build(), Err(ConfigError::InvalidSigma(_))));
    }

    #[test]
    fn lattice_point_peaks_at_its_unit() {
        let mut p = PopCode2DParams::square(5, 0.0, 4.0, 0.8);
        p.units_y = 3;
        p.max.y = 2.0;
        let pc = p.build().unwrap();
        assert_eq!(pc.shape(), [3, 5]);

        for row in 0..3 {
            for col in 0..5 {
                let c = pc.center(row, col).unwrap();
                let acts = pc.encode(c);
                assert_eq!(argmax(&acts), row * 5 + col);
                assert!((acts[row * 5 + col] - 1.0).abs() < 1e-6);
            }
        }
        assert!(pc.center(3, 0).is_none());
    }

    #[test]
    fn decode_recovers_interior_point() {
        let pc = PopCode2DParams::square(12, -1.0, 10.0, 1.0).build().unwrap();
        let v = Vec2::new(3.3, 6.2);
        let got = pc.decode(&pc.encode(v)).unwrap();
        assert!((got.x - v.x).abs() < 0.25, "{got:?}");
        assert!((got.y - v.y).abs() < 0.25, "{got:?}");
    }

    #[test]
    fn add_accumulates_two_points_on_one_map() {
        let pc = PopCode2DParams::square(10, 0.0, 9.0, 0.1).build().unwrap();
        let mut grid = vec![0.0; pc.len()];
        pc.encode_into(&mut grid, Vec2::new(1.0, 2.0), EncodeMode::Set).unwrap();
        pc.encode_into(&mut grid, Vec2::new(7.0, 5.0), EncodeMode::Add).unwrap();

        assert!((grid[2 * 10 + 1] - 1.0).abs() < 1e-6);
        assert!((grid[5 * 10 + 7] - 1.0).abs() < 1e-6);
        let hot = grid.iter().filter(|&&a| a > 0.5).count();
        assert_eq!(hot, 2);

        // Set clears what was there.
        pc.encode_into(&mut grid, Vec2::new(4.0, 4.0), EncodeMode::Set).unwrap();
        assert_eq!(grid.iter().filter(|&&a| a > 0.5).count(), 1);
    }

    #[test]
    fn normalize_sets_peak_to_one() {
        let pc = PopCode2DParams::square(6, 0.0, 5.0, 0.7)
            .with_normalize(true)
            .build()
            .unwrap();
        let acts = pc.encode(Vec2::new(2.5, 1.5));
        let peak = acts.iter().copied().fold(0.0f32, f32::max);
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn shape_and_silence_errors() {
        let pc = PopCode2DParams::square(3, 0.0, 2.0, 1.0).build().unwrap();
        let mut short = vec![0.0; 8];
        assert_eq!(
            pc.encode_into(&mut short, Vec2::splat(1.0), EncodeMode::Set),
            Err(ShapeError { expected: 9, got: 8 })
        );
        assert_eq!(pc.decode(&[0.0; 9]), Err(DecodeError::NoActivity));
    }
}
