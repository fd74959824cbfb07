use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DdqnError, Result};

/// Epsilon-greedy action selection with geometric decay towards a floor.
///
/// Epsilon can only change through [`EpsilonGreedy::decay`], which never
/// raises it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    epsilon: f32,
    decay_rate: f32,
    min_epsilon: f32,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f32, decay_rate: f32, min_epsilon: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(DdqnError::invalid_parameter("epsilon", "must be within [0, 1]"));
        }
        if !(0.0..=epsilon).contains(&min_epsilon) {
            return Err(DdqnError::invalid_parameter("min_epsilon", "must be within [0, epsilon]"));
        }
        if !(decay_rate > 0.0 && decay_rate <= 1.0) {
            return Err(DdqnError::invalid_parameter("decay_rate", "must be within (0, 1]"));
        }
        Ok(EpsilonGreedy {
            epsilon,
            decay_rate,
            min_epsilon,
        })
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn min_epsilon(&self) -> f32 {
        self.min_epsilon
    }

    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    /// `epsilon = max(epsilon * decay_rate, min_epsilon)`; returns the new value.
    pub fn decay(&mut self) -> f32 {
        let decayed = (self.epsilon * self.decay_rate).max(self.min_epsilon);
        self.epsilon = decayed.min(self.epsilon);
        self.epsilon
    }

    /// Return `greedy_action`, or with probability epsilon whatever
    /// `sample_legal` draws instead.
    pub fn select<R, F>(&self, greedy_action: usize, rng: &mut R, sample_legal: F) -> usize
    where
        R: Rng + ?Sized,
        F: FnOnce(&mut R) -> usize,
    {
        if rng.gen::<f32>() < self.epsilon {
            sample_legal(rng)
        } else {
            greedy_action
        }
    }
}
