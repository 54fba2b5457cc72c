#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nesting level of a counter: one run holds many epochs, one epoch holds
/// `trials_per_epoch` trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Scale {
    Run,
    Epoch,
    Trial,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::Run, Scale::Epoch, Scale::Trial];

    pub fn name(self) -> &'static str {
        match self {
            Scale::Run => "run",
            Scale::Epoch => "epoch",
            Scale::Trial => "trial",
        }
    }

    /// Case-insensitive lookup; `None` for anything that is not a known scale.
    pub fn from_name(name: &str) -> Option<Self> {
        Scale::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

/// `(current, previous, changed)` as seen by a consumer after the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CounterQuery {
    pub cur: usize,
    /// `None` until the counter has moved at least once since `init`.
    pub prv: Option<usize>,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Counter {
    pub scale: Scale,
    cur: usize,
    prv: Option<usize>,
    changed: bool,
    /// Wrap point; 0 means unbounded.
    max: usize,
}

impl Counter {
    pub fn new(scale: Scale, max: usize) -> Self {
        Self {
            scale,
            cur: 0,
            prv: None,
            changed: false,
            max,
        }
    }

    pub fn init(&mut self) {
        self.cur = 0;
        self.prv = None;
        self.changed = false;
    }

    /// Advance by one. Returns `true` when the counter wrapped back to 0.
    pub fn incr(&mut self) -> bool {
        self.changed = true;
        self.prv = Some(self.cur);
        self.cur += 1;
        if self.max > 0 && self.cur >= self.max {
            self.cur = 0;
            return true;
        }
        false
    }

    /// Mark the current value as unchanged for this step.
    pub fn same(&mut self) {
        self.changed = false;
    }

    pub fn set(&mut self, cur: usize) {
        if cur != self.cur {
            self.prv = Some(self.cur);
            self.cur = cur;
            self.changed = true;
        }
    }

    pub fn cur(&self) -> usize {
        self.cur
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn query(&self) -> CounterQuery {
        CounterQuery {
            cur: self.cur,
            prv: self.prv,
            changed: self.changed,
        }
    }
}
