//! Trial environments.
//!
//! An `Environment` samples one or two grid points per trial, derives distance,
//! bearing and categorical identities from them, and writes each derived value
//! into a named population-coded output buffer. Which values are exposed, and
//! how they are encoded, is a declarative list of `FeatureBinding`s, so the
//! experiment variants differ only in configuration.

use core::fmt;

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::counter::{Counter, CounterQuery, Scale};
use crate::error::{ConfigError, DecodeError, EnvError};
use crate::geometry::{self, GridPoint};
use crate::popcode::{EncodeMode, PopCode1D, PopCode1DParams, PopRing, RingParams};
use crate::popcode2d::{PopCode2D, PopCode2DParams, Vec2};
use crate::sampling::{Sample, Sampler, SamplerSpec, DEFAULT_MAX_ATTEMPTS};
use crate::tensor::Tensor;

/// Which of the two sampled points a feature refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Slot {
    A,
    B,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// A quantity derived from the current sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum FeatureSource {
    /// Euclidean distance from A to B.
    Distance,
    /// Bearing of B seen from A, degrees in `[0, 360)`.
    Angle,
    PointA,
    PointB,
    /// A and B accumulated on one shared map.
    BothPoints,
    /// `B - A` placed relative to the centre `(size-1, size-1)` of an
    /// egocentric map.
    EgoOffset,
    /// Categorical identity drawn for one of the points.
    Identity { slot: Slot },
}

impl FeatureSource {
    fn is_spatial(self) -> bool {
        matches!(
            self,
            FeatureSource::PointA
                | FeatureSource::PointB
                | FeatureSource::BothPoints
                | FeatureSource::EgoOffset
        )
    }

    fn kind_name(self) -> &'static str {
        if self.is_spatial() {
            "2D"
        } else {
            "scalar"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum EncoderSpec {
    Linear(PopCode1DParams),
    Ring(RingParams),
    Grid(PopCode2DParams),
}

impl EncoderSpec {
    fn kind_name(&self) -> &'static str {
        match self {
            EncoderSpec::Linear(_) => "linear",
            EncoderSpec::Ring(_) => "ring",
            EncoderSpec::Grid(_) => "grid",
        }
    }
}

/// One named output buffer: what it shows and how it is encoded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureBinding {
    pub name: String,
    pub source: FeatureSource,
    pub encoder: EncoderSpec,
}

impl FeatureBinding {
    pub fn new(name: impl Into<String>, source: FeatureSource, encoder: EncoderSpec) -> Self {
        Self {
            name: name.into(),
            source,
            encoder,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvConfig {
    pub name: String,
    pub desc: String,
    /// Cells per grid side.
    pub size: usize,
    pub trials_per_epoch: usize,
    /// Identities are drawn from `0..categories`.
    pub categories: usize,
    /// Cap on rejection-sampling draws per trial.
    pub max_attempts: usize,
    pub sampler: SamplerSpec,
    pub features: Vec<FeatureBinding>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            name: "env".to_string(),
            desc: String::new(),
            size: 10,
            trials_per_epoch: 100,
            categories: 8,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sampler: SamplerSpec::default(),
            features: Vec::new(),
        }
    }
}

impl EnvConfig {
    pub fn new(size: usize, trials_per_epoch: usize) -> Self {
        Self {
            size,
            trials_per_epoch,
            ..Default::default()
        }
    }

    pub fn with_sampler(mut self, sampler: SamplerSpec) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_feature(mut self, binding: FeatureBinding) -> Self {
        self.features.push(binding);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Distance, bearing, an attention map of A, an allocentric map of both
    /// points and an egocentric map of the offset, over polar-offset pairs.
    ///
    /// Pair distances start at 2 cells, so `size` must be at least 3; smaller
    /// grids are rejected with `InvalidBand`.
    pub fn spatial_attention(size: usize, trials_per_epoch: usize) -> Self {
        let s = size as f32;
        let max_dist = (s - 1.0).max(0.0);
        let ego_units = (2 * size).saturating_sub(1);
        Self {
            name: "spatial_attention".to_string(),
            desc: "distance and bearing between two points with 2D position maps".to_string(),
            sampler: SamplerSpec::PolarOffset {
                min_dist: 2.0,
                max_dist,
            },
            features: vec![
                FeatureBinding::new(
                    "Distance",
                    FeatureSource::Distance,
                    EncoderSpec::Linear(distance_params(size)),
                ),
                FeatureBinding::new(
                    "Angle",
                    FeatureSource::Angle,
                    EncoderSpec::Ring(RingParams::degrees(24)),
                ),
                FeatureBinding::new(
                    "Attn",
                    FeatureSource::PointA,
                    EncoderSpec::Grid(PopCode2DParams::square(size, 0.0, s - 1.0, 1.0)),
                ),
                FeatureBinding::new(
                    "AlloInput",
                    FeatureSource::BothPoints,
                    EncoderSpec::Grid(PopCode2DParams::square(size + 3, -1.0, s + 1.0, 1.0)),
                ),
                FeatureBinding::new(
                    "EgoInput",
                    FeatureSource::EgoOffset,
                    EncoderSpec::Grid(PopCode2DParams::square(
                        ego_units,
                        0.0,
                        ego_units as f32 - 1.0,
                        1.0,
                    )),
                ),
            ],
            ..Self::new(size, trials_per_epoch)
        }
    }

    /// Distance between two distinct points plus one identity code per point.
    pub fn distance_pair(size: usize, trials_per_epoch: usize) -> Self {
        let categories = 8usize;
        let identity = PopCode1DParams::new(size, 0.0, (categories - 1) as f32, 1.0);
        Self {
            name: "distance_pair".to_string(),
            desc: "distance between two points with categorical identities".to_string(),
            categories,
            sampler: SamplerSpec::UniformPair { distinct: true },
            features: vec![
                FeatureBinding::new(
                    "Distance",
                    FeatureSource::Distance,
                    EncoderSpec::Linear(distance_params(size)),
                ),
                FeatureBinding::new(
                    "Input 1",
                    FeatureSource::Identity { slot: Slot::A },
                    EncoderSpec::Linear(identity),
                ),
                FeatureBinding::new(
                    "Input 2",
                    FeatureSource::Identity { slot: Slot::B },
                    EncoderSpec::Linear(identity),
                ),
            ],
            ..Self::new(size, trials_per_epoch)
        }
    }

    /// Parse and validate a JSON config document.
    #[cfg(feature = "serde")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[cfg(feature = "serde")]
    pub fn to_json_string(&self) -> String {
        // Every field is plain data, so serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Check the whole config without building an environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<(Sampler, Vec<Output>, HashMap<String, usize>), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::InvalidGridSize(self.size));
        }
        if self.trials_per_epoch == 0 {
            return Err(ConfigError::InvalidTrials(self.trials_per_epoch));
        }
        if self.categories == 0 || self.categories > u32::MAX as usize {
            return Err(ConfigError::InvalidCategories(self.categories));
        }
        let sampler = Sampler::new(self.sampler, self.size, self.max_attempts)?;

        let mut outputs = Vec::with_capacity(self.features.len());
        let mut index = HashMap::with_capacity(self.features.len());
        for binding in &self.features {
            if index.contains_key(binding.name.as_str()) {
                return Err(ConfigError::DuplicateOutput(binding.name.clone()));
            }
            let output = Output::compile(binding)?;
            index.insert(binding.name.clone(), outputs.len());
            outputs.push(output);
        }
        Ok((sampler, outputs, index))
    }
}

fn distance_params(size: usize) -> PopCode1DParams {
    // Pad the range so the extremes are not pinned to the edge units.
    let max_dist = (size as f32 * std::f32::consts::SQRT_2).floor().max(1.0);
    PopCode1DParams::new(10, -0.1 * max_dist, 1.1 * max_dist, 1.0)
}

#[derive(Debug, Clone)]
enum Encoder {
    Linear(PopCode1D),
    Ring(PopRing),
    Grid(PopCode2D),
}

impl Encoder {
    fn build(spec: &EncoderSpec) -> Result<Self, ConfigError> {
        Ok(match spec {
            EncoderSpec::Linear(p) => Encoder::Linear(PopCode1D::new(*p)?),
            EncoderSpec::Ring(p) => Encoder::Ring(PopRing::new(*p)?),
            EncoderSpec::Grid(p) => Encoder::Grid(PopCode2D::new(*p)?),
        })
    }

    fn shape(&self) -> Vec<usize> {
        match self {
            Encoder::Linear(pc) => vec![pc.units()],
            Encoder::Ring(pc) => vec![pc.units()],
            Encoder::Grid(pc) => pc.shape().to_vec(),
        }
    }

    fn encode_scalar(&self, out: &mut [f32], v: f32) {
        // Buffers are allocated from `shape()`, so lengths always agree.
        let res = match self {
            Encoder::Linear(pc) => pc.encode_into(out, v, EncodeMode::Set),
            Encoder::Ring(pc) => pc.encode_into(out, v, EncodeMode::Set),
            Encoder::Grid(_) => Ok(()),
        };
        debug_assert!(res.is_ok());
    }

    fn encode_point(&self, out: &mut [f32], v: Vec2, mode: EncodeMode) {
        if let Encoder::Grid(pc) = self {
            let res = pc.encode_into(out, v, mode);
            debug_assert!(res.is_ok());
        }
    }

    fn decode(&self, acts: &[f32]) -> Result<Decoded, DecodeError> {
        match self {
            Encoder::Linear(pc) => pc.decode(acts).map(Decoded::Scalar),
            Encoder::Ring(pc) => pc.decode(acts).map(Decoded::Scalar),
            Encoder::Grid(pc) => pc.decode(acts).map(Decoded::Point),
        }
    }
}

/// Value read back from an output buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Decoded {
    Scalar(f32),
    Point(Vec2),
}

#[derive(Debug, Clone)]
struct Output {
    name: String,
    source: FeatureSource,
    encoder: Encoder,
    tensor: Tensor,
}

impl Output {
    fn compile(binding: &FeatureBinding) -> Result<Self, ConfigError> {
        let spatial_encoder = matches!(binding.encoder, EncoderSpec::Grid(_));
        if binding.source.is_spatial() != spatial_encoder {
            return Err(ConfigError::FeatureMismatch {
                name: binding.name.clone(),
                source_kind: binding.source.kind_name(),
                encoder_kind: binding.encoder.kind_name(),
            });
        }

        let encoder = Encoder::build(&binding.encoder)?;
        let shape = encoder.shape();
        let tensor = if spatial_encoder {
            Tensor::zeros(&shape, &["Y", "X"])
        } else {
            Tensor::zeros(&shape, &[binding.name.as_str()])
        };
        Ok(Self {
            name: binding.name.clone(),
            source: binding.source,
            encoder,
            tensor,
        })
    }
}

/// Name and dimensions of one output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dim_names: Vec<String>,
}

/// Scalars derived from the current sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Derived {
    pub distance: f32,
    pub angle: f32,
}

/// The narrow surface a simulation engine drives.
pub trait Env {
    fn name(&self) -> &str;

    fn desc(&self) -> &str;

    /// Counter scales this environment maintains.
    fn counters(&self) -> &'static [Scale] {
        &Scale::ALL
    }

    /// Restart for a fresh run.
    fn init(&mut self, run: usize);

    fn states(&self) -> Vec<StateSpec>;

    /// `None` for names the environment does not expose.
    fn state(&self, name: &str) -> Option<&Tensor>;

    /// Advance one trial. `Ok(true)` while trials remain.
    fn step(&mut self) -> Result<bool, EnvError>;

    fn counter(&self, scale: Scale) -> CounterQuery;
}

#[derive(Debug, Clone)]
pub struct Environment {
    cfg: EnvConfig,
    sampler: Sampler,
    rng: StdRng,

    run: Counter,
    epoch: Counter,
    trial: Counter,

    sample: Sample,
    identities: [u32; 2],
    derived: Derived,

    outputs: Vec<Output>,
    index: HashMap<String, usize>,
}

impl Environment {
    /// Validate `cfg` and build an environment driven by a generator seeded
    /// with `seed`.
    pub fn new(cfg: EnvConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(cfg, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(cfg: EnvConfig, rng: StdRng) -> Result<Self, ConfigError> {
        let (sampler, outputs, index) = cfg.compile()?;
        info!(
            name = %cfg.name,
            size = cfg.size,
            trials_per_epoch = cfg.trials_per_epoch,
            outputs = outputs.len(),
            "environment configured"
        );
        let trial = Counter::new(Scale::Trial, cfg.trials_per_epoch);
        Ok(Self {
            sampler,
            rng,
            run: Counter::new(Scale::Run, 0),
            epoch: Counter::new(Scale::Epoch, 0),
            trial,
            sample: Sample::default(),
            identities: [0; 2],
            derived: Derived::default(),
            outputs,
            index,
            cfg,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    pub fn size(&self) -> usize {
        self.cfg.size
    }

    /// Replace the random source, e.g. to replay a run from a known seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn sample(&self) -> Sample {
        self.sample
    }

    pub fn identity(&self, slot: Slot) -> u32 {
        self.identities[slot.index()]
    }

    pub fn derived(&self) -> Derived {
        self.derived
    }

    /// Output buffers in configuration order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Tensor)> + '_ {
        self.outputs.iter().map(|o| (o.name.as_str(), &o.tensor))
    }

    /// Read a value back out of a named buffer. `None` for unknown names.
    pub fn decode(&self, name: &str) -> Option<Result<Decoded, DecodeError>> {
        let o = &self.outputs[*self.index.get(name)?];
        Some(o.encoder.decode(o.tensor.values()))
    }

    pub fn counter_by_name(&self, scale: &str) -> Option<CounterQuery> {
        Scale::from_name(scale).map(|s| self.counter(s))
    }

    fn counter_ref(&self, scale: Scale) -> &Counter {
        match scale {
            Scale::Run => &self.run,
            Scale::Epoch => &self.epoch,
            Scale::Trial => &self.trial,
        }
    }

    /// Draw the next trial. Nothing is mutated unless sampling succeeds.
    fn new_trial(&mut self) -> Result<(), EnvError> {
        let sample = self.sampler.sample(&mut self.rng).inspect_err(|e| {
            warn!(name = %self.cfg.name, error = %e, "trial sampling failed");
        })?;

        let categories = self.cfg.categories as u32;
        self.identities = [
            self.rng.gen_range(0..categories),
            self.rng.gen_range(0..categories),
        ];
        self.sample = sample;
        self.derived = Derived {
            distance: geometry::distance(sample.a, sample.b),
            angle: geometry::bearing_deg(sample.a, sample.b),
        };
        self.render();
        Ok(())
    }

    fn render(&mut self) {
        let Sample { a, b } = self.sample;
        let center = self.cfg.size as i32 - 1;
        let ego = GridPoint::new(center + b.x - a.x, center + b.y - a.y);

        for o in &mut self.outputs {
            let out = o.tensor.values_mut();
            match o.source {
                FeatureSource::Distance => o.encoder.encode_scalar(out, self.derived.distance),
                FeatureSource::Angle => o.encoder.encode_scalar(out, self.derived.angle),
                FeatureSource::Identity { slot } => {
                    o.encoder
                        .encode_scalar(out, self.identities[slot.index()] as f32)
                }
                FeatureSource::PointA => o.encoder.encode_point(out, a.to_vec2(), EncodeMode::Set),
                FeatureSource::PointB => o.encoder.encode_point(out, b.to_vec2(), EncodeMode::Set),
                FeatureSource::BothPoints => {
                    o.encoder.encode_point(out, a.to_vec2(), EncodeMode::Set);
                    o.encoder.encode_point(out, b.to_vec2(), EncodeMode::Add);
                }
                FeatureSource::EgoOffset => {
                    o.encoder.encode_point(out, ego.to_vec2(), EncodeMode::Set)
                }
            }
        }
    }
}

impl Env for Environment {
    fn name(&self) -> &str {
        &self.cfg.name
    }

    fn desc(&self) -> &str {
        &self.cfg.desc
    }

    fn init(&mut self, run: usize) {
        self.run.init();
        self.epoch.init();
        self.trial.init();
        self.run.set(run);
        for o in &mut self.outputs {
            o.tensor.set_zeros();
        }
        info!(name = %self.cfg.name, run, "environment initialized");
    }

    fn states(&self) -> Vec<StateSpec> {
        self.outputs
            .iter()
            .map(|o| StateSpec {
                name: o.name.clone(),
                shape: o.tensor.shape().to_vec(),
                dim_names: o.tensor.dim_names().to_vec(),
            })
            .collect()
    }

    fn state(&self, name: &str) -> Option<&Tensor> {
        self.index.get(name).map(|&i| &self.outputs[i].tensor)
    }

    fn step(&mut self) -> Result<bool, EnvError> {
        self.new_trial()?;

        self.run.same();
        self.epoch.same();
        if self.trial.incr() {
            self.epoch.incr();
        }

        debug!(
            run = self.run.cur(),
            epoch = self.epoch.cur(),
            trial = self.trial.cur(),
            distance = self.derived.distance,
            angle = self.derived.angle,
            "step"
        );
        Ok(true)
    }

    fn counter(&self, scale: Scale) -> CounterQuery {
        self.counter_ref(scale).query()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pt_{}", self.sample.a)
    }
}
