use thiserror::Error;

/// Rejected configuration. Raised once, when an encoder or environment is
/// built, never deferred to encode time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unit count must be at least 1 (got {0})")]
    InvalidUnits(usize),

    #[error("range is empty or inverted: min={min} max={max}")]
    InvalidRange { min: f32, max: f32 },

    #[error("sigma must be positive and finite (got {0})")]
    InvalidSigma(f32),

    #[error("decode threshold must be finite and non-negative (got {0})")]
    InvalidThreshold(f32),

    #[error("grid size must be between 1 and 2^31-1 (got {0})")]
    InvalidGridSize(usize),

    #[error("trials per epoch must be at least 1 (got {0})")]
    InvalidTrials(usize),

    #[error("category count must be between 1 and 2^32-1 (got {0})")]
    InvalidCategories(usize),

    #[error("distance band is empty or negative: min={min} max={max}")]
    InvalidBand { min: f32, max: f32 },

    #[error("max_attempts must be at least 1")]
    InvalidAttempts,

    #[error("duplicate output name {0:?}")]
    DuplicateOutput(String),

    #[error("output {name:?}: {source_kind} source cannot use a {encoder_kind} encoder")]
    FeatureMismatch {
        name: String,
        source_kind: &'static str,
        encoder_kind: &'static str,
    },

    #[error("invalid config document: {0}")]
    Parse(String),
}

/// A caller-provided buffer does not match the encoder's unit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("buffer holds {got} values, encoder has {expected} units")]
pub struct ShapeError {
    pub expected: usize,
    pub got: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeError),

    /// Every activation is zero (or under the decode threshold), so there is
    /// no centroid to report.
    #[error("activation vector carries no activity")]
    NoActivity,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("sampler gave up after {attempts} attempts: {constraint}")]
    RetriesExhausted {
        attempts: usize,
        constraint: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error(transparent)]
    Sample(#[from] SampleError),
}
