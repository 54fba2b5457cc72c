#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense row-major `f32` buffer with named dimensions.
///
/// These are the "state" blobs an engine polls by name. The environment owns
/// them; callers only ever get `&Tensor`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tensor {
    shape: Vec<usize>,
    dim_names: Vec<String>,
    values: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: &[usize], dim_names: &[&str]) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            dim_names: dim_names.iter().map(|s| s.to_string()).collect(),
            values: vec![0.0; len],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dim_names(&self) -> &[String] {
        &self.dim_names
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn set_zeros(&mut self) {
        self.values.fill(0.0);
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut off = 0usize;
        for (&i, &n) in index.iter().zip(&self.shape) {
            if i >= n {
                return None;
            }
            off = off * n + i;
        }
        Some(off)
    }

    pub fn get(&self, index: &[usize]) -> Option<f32> {
        self.offset(index).map(|o| self.values[o])
    }

    pub fn set(&mut self, index: &[usize], v: f32) -> bool {
        match self.offset(index) {
            Some(o) => {
                self.values[o] = v;
                true
            }
            None => false,
        }
    }

    pub fn argmax(&self) -> Option<usize> {
        if self.values.is_empty() {
            None
        } else {
            Some(argmax(&self.values))
        }
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(v: &[f32]) -> usize {
    let mut best_i = 0usize;
    let mut best = f32::NEG_INFINITY;
    for (i, &x) in v.iter().enumerate() {
        if x > best {
            best = x;
            best_i = i;
        }
    }
    best_i
}
