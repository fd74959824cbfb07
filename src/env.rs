//! # Environment Interface
//!
//! The agent drives any discrete-action environment that implements
//! [`Environment`]. Observations are flat `f32` vectors whose width must stay
//! constant for the lifetime of an agent.

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A discrete action space `{0, 1, ..., n - 1}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteSpace {
    pub n: usize,
}

impl DiscreteSpace {
    pub fn new(n: usize) -> Self {
        DiscreteSpace { n }
    }

    /// Uniformly random legal action.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.n)
    }

    pub fn contains(&self, action: usize) -> bool {
        action < self.n
    }
}

/// Result of one environment step.
#[derive(Clone, Debug)]
pub struct Step {
    pub observation: Array1<f32>,
    pub reward: f32,
    pub done: bool,
    /// Free-form diagnostics; the agent never reads it.
    pub info: serde_json::Value,
}

impl Step {
    pub fn new(observation: Array1<f32>, reward: f32, done: bool) -> Self {
        Step {
            observation,
            reward,
            done,
            info: serde_json::Value::Null,
        }
    }

    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        self.info = info;
        self
    }
}

pub trait Environment {
    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<Array1<f32>>;

    /// Apply `action` and advance one step.
    fn step(&mut self, action: usize) -> Result<Step>;

    fn action_space(&self) -> DiscreteSpace;

    /// Exploratory action used by epsilon-greedy. Defaults to a uniform draw
    /// from [`Environment::action_space`].
    fn sample_action<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        self.action_space().sample(rng)
    }

    /// Only called during evaluation rollouts.
    fn render(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}
