use crate::counter::{CounterQuery, Scale};
use crate::env::{Decoded, Derived, Env, Environment, Slot};
use crate::sampling::Sample;

#[cfg(feature = "serde")]
use serde::Serialize;

/// A read-only snapshot of the current trial.
///
/// Design intent:
/// - Observers cannot mutate or steer the environment.
/// - Snapshotting is *on-demand* and allocates; `step()` stays unchanged.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EnvSnapshot {
    pub name: String,
    pub run: CounterQuery,
    pub epoch: CounterQuery,
    pub trial: CounterQuery,

    pub sample: Sample,
    pub identities: [u32; 2],
    pub derived: Derived,

    pub outputs: Vec<OutputSummary>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct OutputSummary {
    pub name: String,
    pub shape: Vec<usize>,
    pub sum: f32,
    pub argmax: Option<usize>,
    /// `None` when the buffer carries no activity.
    pub decoded: Option<Decoded>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub values: Option<Vec<f32>>,
}

pub struct EnvAdapter<'a> {
    env: &'a Environment,
    with_values: bool,
}

impl<'a> EnvAdapter<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self {
            env,
            with_values: false,
        }
    }

    /// Include raw buffer contents in each `OutputSummary`.
    pub fn with_values(mut self, with_values: bool) -> Self {
        self.with_values = with_values;
        self
    }

    pub fn snapshot(&self) -> EnvSnapshot {
        let env = self.env;
        EnvSnapshot {
            name: env.name().to_string(),
            run: env.counter(Scale::Run),
            epoch: env.counter(Scale::Epoch),
            trial: env.counter(Scale::Trial),

            sample: env.sample(),
            identities: [env.identity(Slot::A), env.identity(Slot::B)],
            derived: env.derived(),

            outputs: env
                .outputs()
                .map(|(name, t)| OutputSummary {
                    name: name.to_string(),
                    shape: t.shape().to_vec(),
                    sum: t.sum(),
                    argmax: t.argmax(),
                    decoded: env.decode(name).and_then(Result::ok),
                    values: self.with_values.then(|| t.values().to_vec()),
                })
                .collect(),
        }
    }
}
