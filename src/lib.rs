//! # popenv
//!
//! Population-coded synthetic 2D trial environments.
//!
//! Each trial samples one or two points on a grid, derives distance, bearing
//! and categorical identities from them, and exposes each value as a named
//! activation buffer: a bank of Gaussian-tuned units rather than a scalar.
//! A simulation engine polls those buffers by name and steps the environment
//! through the [`env::Env`] trait.
//!
//! ## Quick Start
//!
//! ```
//! use popenv::prelude::*;
//!
//! let mut env = Environment::new(EnvConfig::spatial_attention(10, 50), 42).unwrap();
//! env.init(0);
//! env.step().unwrap();
//!
//! let distance = env.state("Distance").unwrap();
//! assert_eq!(distance.shape(), &[10]);
//! assert_eq!(env.counter(Scale::Trial).cur, 1);
//!
//! // Read the encoded value back.
//! let angle = env.decode("Angle").unwrap().unwrap();
//! # let _ = angle;
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Serialize/deserialize configs and snapshots; JSON
//!   config loading; the `popenv-cli` binary
//!
//! ## Modules
//!
//! - [`popcode`]: 1D linear and ring population codes
//! - [`popcode2d`]: 2D lattice population codes
//! - [`env`]: The configurable trial environment
//! - [`sampling`]: Bounded rejection samplers for trial points
//! - [`observer`]: Read-only snapshots

#[path = "core/error.rs"]
pub mod error;

#[path = "core/popcode.rs"]
pub mod popcode;

#[path = "core/popcode2d.rs"]
pub mod popcode2d;

#[path = "core/tensor.rs"]
pub mod tensor;

#[path = "core/counter.rs"]
pub mod counter;

#[path = "core/geometry.rs"]
pub mod geometry;

#[path = "core/sampling.rs"]
pub mod sampling;

#[path = "core/env.rs"]
pub mod env;

pub mod observer;

/// Prelude module for convenient imports.
///
/// ```
/// use popenv::prelude::*;
/// ```
pub mod prelude {
    pub use crate::counter::{CounterQuery, Scale};
    pub use crate::env::{
        Decoded, EncoderSpec, Env, EnvConfig, Environment, FeatureBinding, FeatureSource, Slot,
        StateSpec,
    };
    pub use crate::error::{ConfigError, DecodeError, EnvError, SampleError, ShapeError};
    pub use crate::geometry::GridPoint;
    pub use crate::observer::{EnvAdapter, EnvSnapshot};
    pub use crate::popcode::{EncodeMode, PopCode1D, PopCode1DParams, PopCodeKind, PopRing, RingParams};
    pub use crate::popcode2d::{PopCode2D, PopCode2DParams, Vec2};
    pub use crate::sampling::SamplerSpec;
    pub use crate::tensor::Tensor;
}
