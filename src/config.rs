//! # Agent Configuration
//!
//! All hyperparameters of the training loop live in [`AgentConfig`]. Missing
//! fields in a JSON file fall back to the defaults below, so a config file
//! only needs to list what it changes:
//!
//! ```json
//! { "buffer_size": 5000, "train_nums": 20000, "seed": 123 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DdqnError, Result};

/// When the exploration rate is decayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayTrigger {
    /// Epsilon stays at its initial value.
    Never,
    /// Once after every finished episode.
    EpisodeEnd,
    /// Once after every environment step.
    Step,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Replay capacity, in transitions
    pub buffer_size: usize,
    pub learning_rate: f32,
    /// Initial exploration rate
    pub epsilon: f32,
    /// Multiplicative decay applied to epsilon
    pub epsilon_decay: f32,
    /// Floor for epsilon
    pub min_epsilon: f32,
    /// Discount factor
    pub gamma: f32,
    pub batch_size: usize,
    /// Environment steps between hard target syncs
    pub target_update_iter: usize,
    /// Total environment steps of a training run
    pub train_nums: usize,
    /// Steps that only collect transitions before learning starts
    pub start_learning: usize,
    /// Steps between loss reports
    pub log_every: usize,
    pub decay_trigger: DecayTrigger,
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            buffer_size: 200,
            learning_rate: 0.0015,
            epsilon: 0.1,
            epsilon_decay: 0.995,
            min_epsilon: 0.01,
            gamma: 0.95,
            batch_size: 8,
            target_update_iter: 200,
            train_nums: 5000,
            start_learning: 100,
            log_every: 1000,
            decay_trigger: DecayTrigger::EpisodeEnd,
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Reject configurations the training loop cannot run safely.
    ///
    /// In particular `start_learning >= batch_size` and `buffer_size > batch_size`
    /// together guarantee that the first learning step (at step
    /// `start_learning + 1`) finds strictly more stored transitions than the
    /// batch size, so sampling never underflows during training.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DdqnError::invalid_parameter("batch_size", "must be at least 1"));
        }
        if self.buffer_size <= self.batch_size {
            return Err(DdqnError::invalid_parameter(
                "buffer_size".to_string(),
                format!("must exceed batch_size ({})", self.batch_size),
            ));
        }
        if self.start_learning < self.batch_size {
            return Err(DdqnError::invalid_parameter(
                "start_learning".to_string(),
                format!("must be at least batch_size ({})", self.batch_size),
            ));
        }
        if self.target_update_iter == 0 {
            return Err(DdqnError::invalid_parameter("target_update_iter", "must be at least 1"));
        }
        if self.log_every == 0 {
            return Err(DdqnError::invalid_parameter("log_every", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(DdqnError::invalid_parameter("epsilon", "must be within [0, 1]"));
        }
        if !(0.0..=self.epsilon).contains(&self.min_epsilon) {
            return Err(DdqnError::invalid_parameter("min_epsilon", "must be within [0, epsilon]"));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(DdqnError::invalid_parameter("epsilon_decay", "must be within (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(DdqnError::invalid_parameter("gamma", "must be within [0, 1]"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(DdqnError::invalid_parameter("learning_rate", "must be positive"));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AgentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Builder pattern for [`AgentConfig`]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn new() -> Self {
        AgentConfigBuilder {
            config: AgentConfig::default(),
        }
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn learning_rate(mut self, lr: f32) -> Self {
        self.config.learning_rate = lr;
        self
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn epsilon_decay(mut self, decay: f32) -> Self {
        self.config.epsilon_decay = decay;
        self
    }

    pub fn min_epsilon(mut self, min_epsilon: f32) -> Self {
        self.config.min_epsilon = min_epsilon;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn target_update_iter(mut self, iter: usize) -> Self {
        self.config.target_update_iter = iter;
        self
    }

    pub fn train_nums(mut self, steps: usize) -> Self {
        self.config.train_nums = steps;
        self
    }

    pub fn start_learning(mut self, step: usize) -> Self {
        self.config.start_learning = step;
        self
    }

    pub fn log_every(mut self, steps: usize) -> Self {
        self.config.log_every = steps;
        self
    }

    pub fn decay_trigger(mut self, trigger: DecayTrigger) -> Self {
        self.config.decay_trigger = trigger;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<AgentConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
