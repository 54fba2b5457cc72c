//! Per-trial point sampling.
//!
//! Every constrained sampler is a rejection loop capped at `max_attempts`
//! draws; an infeasible constraint surfaces as `SampleError::RetriesExhausted`
//! instead of spinning forever.

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SampleError};
use crate::geometry::{self, GridPoint};

pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SamplerSpec {
    /// One uniform point; `b` mirrors `a`.
    Single,
    /// Two independent uniform points, optionally redrawn until they differ.
    UniformPair { distinct: bool },
    /// Two uniform points whose distance lies in `[min, max]`.
    DistanceBand { min: f32, max: f32 },
    /// Draw a distance in `[min_dist, max_dist]` and a bearing, truncate the
    /// offset to whole cells, then place the pair so both ends are on the grid.
    PolarOffset { min_dist: f32, max_dist: f32 },
}

impl Default for SamplerSpec {
    fn default() -> Self {
        SamplerSpec::UniformPair { distinct: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    pub a: GridPoint,
    pub b: GridPoint,
}

#[derive(Debug, Clone)]
pub struct Sampler {
    spec: SamplerSpec,
    size: usize,
    max_attempts: usize,
}

impl Sampler {
    pub fn new(spec: SamplerSpec, size: usize, max_attempts: usize) -> Result<Self, ConfigError> {
        // Grid coordinates are `i32`.
        if size == 0 || size > i32::MAX as usize {
            return Err(ConfigError::InvalidGridSize(size));
        }
        if max_attempts == 0 {
            return Err(ConfigError::InvalidAttempts);
        }
        match spec {
            SamplerSpec::DistanceBand { min, max }
            | SamplerSpec::PolarOffset {
                min_dist: min,
                max_dist: max,
            } => {
                if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
                    return Err(ConfigError::InvalidBand { min, max });
                }
                if matches!(spec, SamplerSpec::PolarOffset { .. }) && max <= 0.0 {
                    return Err(ConfigError::InvalidBand { min, max });
                }
            }
            SamplerSpec::Single | SamplerSpec::UniformPair { .. } => {}
        }
        Ok(Self {
            spec,
            size,
            max_attempts,
        })
    }

    pub fn spec(&self) -> &SamplerSpec {
        &self.spec
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Sample, SampleError> {
        match self.spec {
            SamplerSpec::Single => {
                let a = self.uniform_point(rng);
                Ok(Sample { a, b: a })
            }
            SamplerSpec::UniformPair { distinct: false } => Ok(Sample {
                a: self.uniform_point(rng),
                b: self.uniform_point(rng),
            }),
            SamplerSpec::UniformPair { distinct: true } => {
                let a = self.uniform_point(rng);
                let b = self.retry("second point must differ from the first", || {
                    let b = self.uniform_point(rng);
                    (b != a).then_some(b)
                })?;
                Ok(Sample { a, b })
            }
            SamplerSpec::DistanceBand { min, max } => {
                self.retry("pair distance must fall inside the band", || {
                    let a = self.uniform_point(rng);
                    let b = self.uniform_point(rng);
                    let d = geometry::distance(a, b);
                    (min..=max).contains(&d).then_some(Sample { a, b })
                })
            }
            SamplerSpec::PolarOffset { min_dist, max_dist } => {
                self.retry("offset must be non-zero and fit on the grid", || {
                    self.polar_pair(rng, min_dist, max_dist)
                })
            }
        }
    }

    fn retry<T>(
        &self,
        constraint: &'static str,
        mut draw: impl FnMut() -> Option<T>,
    ) -> Result<T, SampleError> {
        for _ in 0..self.max_attempts {
            if let Some(v) = draw() {
                return Ok(v);
            }
        }
        Err(SampleError::RetriesExhausted {
            attempts: self.max_attempts,
            constraint,
        })
    }

    fn uniform_point<R: Rng + ?Sized>(&self, rng: &mut R) -> GridPoint {
        let n = self.size as i32;
        GridPoint::new(rng.gen_range(0..n), rng.gen_range(0..n))
    }

    fn polar_pair<R: Rng + ?Sized>(&self, rng: &mut R, min_dist: f32, max_dist: f32) -> Option<Sample> {
        let dist = min_dist + rng.gen::<f32>() * (max_dist - min_dist);
        let ang = (rng.gen::<f32>() * 360.0).to_radians();
        let dx = (dist * ang.cos()).trunc() as i32;
        let dy = (dist * ang.sin()).trunc() as i32;
        if dx == 0 && dy == 0 {
            return None;
        }

        let n = self.size as i32;
        let (x_lo, x_hi) = (0.max(-dx), n.min(n - dx));
        let (y_lo, y_hi) = (0.max(-dy), n.min(n - dy));
        if x_lo >= x_hi || y_lo >= y_hi {
            return None;
        }

        let a = GridPoint::new(rng.gen_range(x_lo..x_hi), rng.gen_range(y_lo..y_hi));
        Some(Sample {
            a,
            b: a.offset(dx, dy),
        })
    }
}
