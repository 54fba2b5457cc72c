//! Scalar population codes.
//!
//! A value is represented by a bank of units, each tuned to a center on the
//! value axis with a Gaussian response. `PopCode1D` covers a bounded linear
//! domain; `PopRing` covers a circular one (compass bearings and the like).
//!
//! `sigma` is expressed in units of center spacing, so the tuning width scales
//! with the unit count: `act = exp(-0.5 * (d / (sigma * spacing))^2)`.
//!
//! Normalization is peak normalization: when enabled, the vector is rescaled
//! so its maximum activation is exactly 1.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DecodeError, ShapeError};

/// How an encode call treats the existing contents of its target buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncodeMode {
    /// Overwrite every entry.
    #[default]
    Set,
    /// Accumulate onto the existing values.
    Add,
}

/// Shape of each unit's response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PopCodeKind {
    /// Overlapping Gaussian bumps.
    #[default]
    GaussBump,
    /// One-hot on the nearest center. Used for categorical identities.
    Localist,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PopCode1DParams {
    pub units: usize,
    pub min: f32,
    pub max: f32,
    /// Tuning width in multiples of the center spacing.
    pub sigma: f32,
    pub normalize: bool,
    /// Clamp inputs into `[min, max]` before encoding.
    pub clip: bool,
    pub code: PopCodeKind,
    /// Activations below this are ignored by `decode`.
    pub threshold: f32,
}

impl Default for PopCode1DParams {
    fn default() -> Self {
        Self {
            units: 12,
            min: -0.5,
            max: 1.5,
            sigma: 1.0,
            normalize: false,
            clip: true,
            code: PopCodeKind::GaussBump,
            threshold: 0.0,
        }
    }
}

impl PopCode1DParams {
    pub fn new(units: usize, min: f32, max: f32, sigma: f32) -> Self {
        Self {
            units,
            min,
            max,
            sigma,
            ..Default::default()
        }
    }

    /// One-hot code with one unit per category, centers at `0..categories`.
    pub fn localist(categories: usize) -> Self {
        let top = categories.saturating_sub(1).max(1) as f32;
        Self::new(categories, 0.0, top, 1.0).with_code(PopCodeKind::Localist)
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_code(mut self, code: PopCodeKind) -> Self {
        self.code = code;
        self
    }

    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn build(self) -> Result<PopCode1D, ConfigError> {
        PopCode1D::new(self)
    }
}

/// Circular-domain parameters. The domain is `[min, max)` with `max` identified
/// with `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RingParams {
    pub units: usize,
    pub min: f32,
    pub max: f32,
    pub sigma: f32,
    pub normalize: bool,
    pub threshold: f32,
}

impl Default for RingParams {
    fn default() -> Self {
        Self {
            units: 24,
            min: 0.0,
            max: 360.0,
            sigma: 1.0,
            normalize: false,
            threshold: 0.0,
        }
    }
}

impl RingParams {
    pub fn new(units: usize, min: f32, max: f32, sigma: f32) -> Self {
        Self {
            units,
            min,
            max,
            sigma,
            ..Default::default()
        }
    }

    /// Compass bearings in degrees.
    pub fn degrees(units: usize) -> Self {
        Self::new(units, 0.0, 360.0, 1.0)
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn build(self) -> Result<PopRing, ConfigError> {
        PopRing::new(self)
    }
}

pub(crate) fn check_range(min: f32, max: f32) -> Result<(), ConfigError> {
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(ConfigError::InvalidRange { min, max });
    }
    Ok(())
}

pub(crate) fn check_sigma(sigma: f32) -> Result<(), ConfigError> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(ConfigError::InvalidSigma(sigma));
    }
    Ok(())
}

pub(crate) fn check_threshold(threshold: f32) -> Result<(), ConfigError> {
    if !(threshold.is_finite() && threshold >= 0.0) {
        return Err(ConfigError::InvalidThreshold(threshold));
    }
    Ok(())
}

/// Evenly spaced centers over `[min, max]`, and the spacing between them.
/// A single unit sits at the midpoint with the whole range as its spacing.
pub(crate) fn linear_centers(units: usize, min: f32, max: f32) -> (Vec<f32>, f32) {
    let range = max - min;
    if units == 1 {
        return (vec![min + 0.5 * range], range);
    }
    let spacing = range / (units - 1) as f32;
    let centers = (0..units).map(|i| min + spacing * i as f32).collect();
    (centers, spacing)
}

#[inline]
pub(crate) fn gauss(d: f32, width: f32) -> f32 {
    let z = d / width;
    (-0.5 * z * z).exp()
}

fn peak_normalize(acts: &mut [f32]) {
    let peak = acts.iter().copied().fold(0.0f32, f32::max);
    if peak > 0.0 {
        let inv = 1.0 / peak;
        for a in acts.iter_mut() {
            *a *= inv;
        }
    }
}

fn store(out: &mut [f32], acts: &[f32], mode: EncodeMode) {
    match mode {
        EncodeMode::Set => out.copy_from_slice(acts),
        EncodeMode::Add => {
            for (o, a) in out.iter_mut().zip(acts) {
                *o += *a;
            }
        }
    }
}

fn nearest(centers: &[f32], mut dist: impl FnMut(f32) -> f32) -> usize {
    let mut best_i = 0usize;
    let mut best = f32::INFINITY;
    for (i, &c) in centers.iter().enumerate() {
        let d = dist(c);
        if d < best {
            best = d;
            best_i = i;
        }
    }
    best_i
}

/// Linear-domain population code.
#[derive(Debug, Clone)]
pub struct PopCode1D {
    params: PopCode1DParams,
    centers: Vec<f32>,
    width: f32,
}

impl PopCode1D {
    pub fn new(params: PopCode1DParams) -> Result<Self, ConfigError> {
        if params.units == 0 {
            return Err(ConfigError::InvalidUnits(params.units));
        }
        check_range(params.min, params.max)?;
        check_sigma(params.sigma)?;
        check_threshold(params.threshold)?;

        let (centers, spacing) = linear_centers(params.units, params.min, params.max);
        Ok(Self {
            params,
            centers,
            width: params.sigma * spacing,
        })
    }

    pub fn params(&self) -> &PopCode1DParams {
        &self.params
    }

    pub fn units(&self) -> usize {
        self.centers.len()
    }

    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    /// Encode into a fresh vector of `units()` activations.
    pub fn encode(&self, value: f32) -> Vec<f32> {
        let mut out = vec![0.0; self.units()];
        self.fill(&mut out, value);
        out
    }

    /// Encode into `out`, which must hold exactly `units()` values. On a
    /// length mismatch `out` is left untouched.
    pub fn encode_into(&self, out: &mut [f32], value: f32, mode: EncodeMode) -> Result<(), ShapeError> {
        self.check_len(out.len())?;
        match mode {
            EncodeMode::Set => self.fill(out, value),
            EncodeMode::Add => store(out, &self.encode(value), mode),
        }
        Ok(())
    }

    /// Weighted centroid of the unit centers.
    pub fn decode(&self, acts: &[f32]) -> Result<f32, DecodeError> {
        self.check_len(acts.len())?;
        let thr = self.params.threshold;
        let mut sum = 0.0f64;
        let mut weighted = 0.0f64;
        for (&c, &a) in self.centers.iter().zip(acts) {
            if a > 0.0 && a >= thr {
                sum += a as f64;
                weighted += (a as f64) * (c as f64);
            }
        }
        if sum <= 0.0 {
            return Err(DecodeError::NoActivity);
        }
        Ok((weighted / sum) as f32)
    }

    fn check_len(&self, got: usize) -> Result<(), ShapeError> {
        if got != self.units() {
            return Err(ShapeError {
                expected: self.units(),
                got,
            });
        }
        Ok(())
    }

    fn fill(&self, out: &mut [f32], value: f32) {
        let v = if self.params.clip {
            value.clamp(self.params.min, self.params.max)
        } else {
            value
        };

        match self.params.code {
            PopCodeKind::GaussBump => {
                for (o, &c) in out.iter_mut().zip(&self.centers) {
                    *o = gauss(v - c, self.width);
                }
                if self.params.normalize {
                    peak_normalize(out);
                }
            }
            PopCodeKind::Localist => {
                out.fill(0.0);
                let i = nearest(&self.centers, |c| (v - c).abs());
                out[i] = 1.0;
            }
        }
    }
}

/// Circular-domain population code.
#[derive(Debug, Clone)]
pub struct PopRing {
    params: RingParams,
    centers: Vec<f32>,
    range: f32,
    width: f32,
}

impl PopRing {
    pub fn new(params: RingParams) -> Result<Self, ConfigError> {
        if params.units == 0 {
            return Err(ConfigError::InvalidUnits(params.units));
        }
        check_range(params.min, params.max)?;
        check_sigma(params.sigma)?;
        check_threshold(params.threshold)?;

        let range = params.max - params.min;
        let spacing = range / params.units as f32;
        let centers = (0..params.units)
            .map(|i| params.min + spacing * i as f32)
            .collect();
        Ok(Self {
            params,
            centers,
            range,
            width: params.sigma * spacing,
        })
    }

    pub fn params(&self) -> &RingParams {
        &self.params
    }

    pub fn units(&self) -> usize {
        self.centers.len()
    }

    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    /// Reduce `value` into `[min, max)`.
    pub fn wrap(&self, value: f32) -> f32 {
        let w = (value - self.params.min).rem_euclid(self.range);
        // rem_euclid can round up to exactly `range` for tiny negatives.
        if w >= self.range {
            self.params.min
        } else {
            self.params.min + w
        }
    }

    /// Shortest distance around the ring.
    pub fn distance(&self, a: f32, b: f32) -> f32 {
        let d = (self.wrap(a) - self.wrap(b)).abs();
        d.min(self.range - d)
    }

    pub fn encode(&self, value: f32) -> Vec<f32> {
        let mut out = vec![0.0; self.units()];
        self.fill(&mut out, value);
        out
    }

    pub fn encode_into(&self, out: &mut [f32], value: f32, mode: EncodeMode) -> Result<(), ShapeError> {
        self.check_len(out.len())?;
        match mode {
            EncodeMode::Set => self.fill(out, value),
            EncodeMode::Add => store(out, &self.encode(value), mode),
        }
        Ok(())
    }

    /// Activation-weighted circular mean of the centers.
    pub fn decode(&self, acts: &[f32]) -> Result<f32, DecodeError> {
        self.check_len(acts.len())?;
        let thr = self.params.threshold;
        let to_rad = std::f64::consts::TAU / self.range as f64;
        let (mut s, mut c, mut sum) = (0.0f64, 0.0f64, 0.0f64);
        for (&center, &a) in self.centers.iter().zip(acts) {
            if a > 0.0 && a >= thr {
                let theta = (center - self.params.min) as f64 * to_rad;
                s += a as f64 * theta.sin();
                c += a as f64 * theta.cos();
                sum += a as f64;
            }
        }
        // A resultant this short means the activity is spread evenly around
        // the ring and has no direction.
        if sum <= 0.0 || s.hypot(c) <= 1e-9 * sum {
            return Err(DecodeError::NoActivity);
        }
        let theta = s.atan2(c);
        Ok(self.wrap(self.params.min + (theta / to_rad) as f32))
    }

    fn check_len(&self, got: usize) -> Result<(), ShapeError> {
        if got != self.units() {
            return Err(ShapeError {
                expected: self.units(),
                got,
            });
        }
        Ok(())
    }

    fn fill(&self, out: &mut [f32], value: f32) {
        let v = self.wrap(value);
        for (o, &c) in out.iter_mut().zip(&self.centers) {
            *o = gauss(self.distance(v, c), self.width);
        }
        if self.params.normalize {
            peak_normalize(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::argmax;

    #[test]
    fn rejects_invalid_params() {
        assert_eq!(
            PopCode1DParams::new(0, 0.0, 1.0, 1.0).build().unwrap_err(),
            ConfigError::InvalidUnits(0)
        );
        assert!(matches!(
            PopCode1DParams::new(4, 1.0, 1.0, 1.0).build(),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            PopCode1DParams::new(4, 2.0, 1.0, 1.0).build(),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            PopCode1DParams::new(4, 0.0, 1.0, 0.0).build(),
            Err(ConfigError::InvalidSigma(_))
        ));
        assert!(matches!(
            RingParams::new(8, 0.0, 360.0, -1.0).build(),
            Err(ConfigError::InvalidSigma(_))
        ));
        assert!(matches!(
            RingParams::new(0, 0.0, 360.0, 1.0).build(),
            Err(ConfigError::InvalidUnits(0))
        ));
    }

    #[test]
    fn centers_span_the_range() {
        let pc = PopCode1DParams::new(5, 0.0, 4.0, 1.0).build().unwrap();
        assert_eq!(pc.centers(), &[0.0, 1.0, 2.0, 3.0, 4.0]);

        let single = PopCode1DParams::new(1, 0.0, 4.0, 1.0).build().unwrap();
        assert_eq!(single.centers(), &[2.0]);

        let ring = RingParams::degrees(4).build().unwrap();
        assert_eq!(ring.centers(), &[0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn value_at_center_peaks_at_that_unit() {
        for &(units, sigma) in &[(5usize, 0.5f32), (10, 1.0), (16, 2.5)] {
            let pc = PopCode1DParams::new(units, -3.0, 7.0, sigma).build().unwrap();
            for (i, &c) in pc.centers().iter().enumerate() {
                let acts = pc.encode(c);
                assert_eq!(acts.len(), units);
                assert!((acts[i] - 1.0).abs() < 1e-6);
                assert!(acts.iter().all(|&a| a <= acts[i]));
            }
        }
    }

    #[test]
    fn narrow_ten_unit_code_recovers_midpoint() {
        let pc = PopCode1DParams::new(10, 0.0, 10.0, 0.1).build().unwrap();
        let acts = pc.encode(5.0);

        let peak = argmax(&acts);
        let nearest_center = pc
            .centers()
            .iter()
            .map(|c| (c - 5.0).abs())
            .fold(f32::INFINITY, f32::min);
        assert!(((pc.centers()[peak] - 5.0).abs() - nearest_center).abs() < 1e-5);

        let v = pc.decode(&acts).unwrap();
        assert!((v - 5.0).abs() <= 0.5, "decoded {v}");
    }

    #[test]
    fn decode_error_shrinks_with_more_units() {
        let worst = |units: usize| {
            let pc = PopCode1DParams::new(units, 0.0, 10.0, 0.5).build().unwrap();
            (0..=200)
                .map(|i| 1.0 + 8.0 * i as f32 / 200.0)
                .map(|v| (pc.decode(&pc.encode(v)).unwrap() - v).abs())
                .fold(0.0f32, f32::max)
        };
        let coarse = worst(6);
        let fine = worst(41);
        assert!(fine < coarse, "fine={fine} coarse={coarse}");
        // Never worse than half a center spacing.
        assert!(coarse <= 0.5 * 10.0 / 5.0);
        assert!(fine <= 0.5 * 10.0 / 40.0);
    }

    #[test]
    fn encode_is_deterministic() {
        let pc = PopCode1DParams::new(12, 0.0, 1.0, 1.0).build().unwrap();
        assert_eq!(pc.encode(0.37), pc.encode(0.37));
        let ring = RingParams::degrees(24).build().unwrap();
        assert_eq!(ring.encode(123.0), ring.encode(123.0));
    }

    #[test]
    fn normalize_sets_peak_to_one() {
        let pc = PopCode1DParams::new(10, 0.0, 10.0, 0.3)
            .with_normalize(true)
            .build()
            .unwrap();
        let acts = pc.encode(4.5);
        let peak = acts.iter().copied().fold(0.0f32, f32::max);
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clip_clamps_out_of_range_values() {
        let pc = PopCode1DParams::new(8, 0.0, 7.0, 1.0).build().unwrap();
        assert_eq!(pc.encode(-20.0), pc.encode(0.0));

        let unclipped = PopCode1DParams::new(8, 0.0, 7.0, 1.0)
            .with_clip(false)
            .build()
            .unwrap();
        assert!(unclipped.encode(-20.0).iter().all(|&a| a < 1e-6));
    }

    #[test]
    fn localist_is_one_hot_on_nearest_center() {
        let pc = PopCode1DParams::new(8, 0.0, 7.0, 1.0)
            .with_code(PopCodeKind::Localist)
            .build()
            .unwrap();
        let acts = pc.encode(3.2);
        assert_eq!(acts.iter().filter(|&&a| a != 0.0).count(), 1);
        assert_eq!(acts[3], 1.0);
        assert_eq!(pc.decode(&acts).unwrap(), 3.0);
    }

    #[test]
    fn encode_into_rejects_wrong_length_without_writing() {
        let pc = PopCode1DParams::new(4, 0.0, 1.0, 1.0).build().unwrap();
        let mut buf = vec![7.0; 3];
        let err = pc.encode_into(&mut buf, 0.5, EncodeMode::Set).unwrap_err();
        assert_eq!(err, ShapeError { expected: 4, got: 3 });
        assert_eq!(buf, vec![7.0; 3]);
    }

    #[test]
    fn add_mode_accumulates() {
        let pc = PopCode1DParams::new(6, 0.0, 5.0, 1.0).build().unwrap();
        let mut buf = vec![0.0; 6];
        pc.encode_into(&mut buf, 1.0, EncodeMode::Set).unwrap();
        pc.encode_into(&mut buf, 4.0, EncodeMode::Add).unwrap();
        let a = pc.encode(1.0);
        let b = pc.encode(4.0);
        for i in 0..6 {
            assert!((buf[i] - (a[i] + b[i])).abs() < 1e-6);
        }

        pc.encode_into(&mut buf, 2.0, EncodeMode::Set).unwrap();
        assert_eq!(buf, pc.encode(2.0));
    }

    #[test]
    fn decode_of_silence_is_an_error() {
        let pc = PopCode1DParams::new(4, 0.0, 1.0, 1.0).build().unwrap();
        assert_eq!(pc.decode(&[0.0; 4]), Err(DecodeError::NoActivity));
        assert!(matches!(
            pc.decode(&[1.0; 5]),
            Err(DecodeError::ShapeMismatch(_))
        ));

        let thresholded = PopCode1DParams::new(4, 0.0, 1.0, 1.0)
            .with_threshold(0.5)
            .build()
            .unwrap();
        assert_eq!(
            thresholded.decode(&[0.1, 0.2, 0.1, 0.0]),
            Err(DecodeError::NoActivity)
        );
    }

    #[test]
    fn ring_is_wraparound_invariant() {
        let ring = RingParams::degrees(24).build().unwrap();
        assert_eq!(ring.encode(10.0), ring.encode(370.0));
        assert_eq!(ring.encode(-350.0), ring.encode(10.0));
    }

    #[test]
    fn ring_neighbors_across_zero_are_close() {
        let ring = RingParams::degrees(24).build().unwrap();
        assert!((ring.distance(359.0, 1.0) - 2.0).abs() < 1e-4);
        let acts = ring.encode(359.0);
        // Center 0 is one degree away, center 345 is fourteen.
        assert!(acts[0] > acts[23]);
        assert_eq!(argmax(&acts), 0);
    }

    #[test]
    fn ring_decode_handles_the_seam() {
        let ring = RingParams::degrees(24).build().unwrap();
        for &v in &[0.0f32, 3.0, 90.0, 181.0, 355.0, 359.5] {
            let got = ring.decode(&ring.encode(v)).unwrap();
            assert!(ring.distance(got, v) < 1.0, "v={v} got={got}");
            assert!((0.0..360.0).contains(&got));
        }
    }

    #[test]
    fn ring_decode_of_uniform_activity_is_an_error() {
        let ring = RingParams::degrees(4).build().unwrap();
        assert_eq!(ring.decode(&[1.0; 4]), Err(DecodeError::NoActivity));
        assert_eq!(ring.decode(&[0.0; 4]), Err(DecodeError::NoActivity));
    }
}
