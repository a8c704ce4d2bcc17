use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Averaged perceptron training parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptronParams {
    max_iterations: usize,
    epsilon: f64,
    shuffle_seed: Option<u64>,
}

impl Default for PerceptronParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-5,
            shuffle_seed: None,
        }
    }
}

impl PerceptronParams {
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::configuration(
                "perceptron params",
                "max_iterations must be at least 1",
            ));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Result<Self> {
        self.set_max_iterations(max_iterations)?;
        Ok(self)
    }

    /// Training stops once the per-epoch error rate drops below epsilon
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        if epsilon.is_nan() || epsilon < 0.0 {
            return Err(Error::configuration(
                "perceptron params",
                "epsilon must be non-negative",
            ));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self> {
        self.set_epsilon(epsilon)?;
        Ok(self)
    }

    /// Seed for shuffling instances between epochs; `None` seeds from entropy
    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }

    pub fn set_shuffle_seed(&mut self, seed: Option<u64>) {
        self.shuffle_seed = seed;
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Check values that bypassed the setters, e.g. deserialized ones
    pub fn validate(&self) -> Result<()> {
        let mut checked = Self::default();
        checked.set_max_iterations(self.max_iterations)?;
        checked.set_epsilon(self.epsilon)
    }
}
