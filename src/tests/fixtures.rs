//! Deterministic collaborators shared by the unit tests.

use ndarray::{array, s, Array1, Array2, ArrayView2};

use crate::approximator::QFunction;
use crate::env::{DiscreteSpace, Environment, Step};
use crate::error::{DdqnError, Result};
use crate::replay_buffer::TransitionStore;

/// `predict(s) = s . weights`. Training records its inputs but never moves
/// the weights, so predictions stay predictable across a whole run.
#[derive(Clone, Debug)]
pub struct LinearQ {
    pub weights: Array2<f32>,
    pub train_calls: usize,
    pub last_targets: Option<Array2<f32>>,
    pub forced_loss: Option<f32>,
    /// Drop the last row of every prediction
    pub short_predictions: bool,
}

impl LinearQ {
    pub fn new(weights: Array2<f32>) -> Self {
        LinearQ {
            weights,
            train_calls: 0,
            last_targets: None,
            forced_loss: None,
            short_predictions: false,
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::new(Array2::eye(n))
    }
}

impl QFunction for LinearQ {
    type Weights = Array2<f32>;

    fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    fn num_actions(&self) -> usize {
        self.weights.ncols()
    }

    fn predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        if states.ncols() != self.input_size() {
            return Err(DdqnError::dimension_mismatch(
                self.input_size().to_string(),
                states.ncols().to_string(),
            ));
        }
        let values = states.dot(&self.weights);
        if self.short_predictions && values.nrows() > 0 {
            return Ok(values.slice(s![..values.nrows() - 1, ..]).to_owned());
        }
        Ok(values)
    }

    fn train_on_batch(&mut self, states: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        let predictions = self.predict(states)?;
        self.train_calls += 1;
        self.last_targets = Some(targets.to_owned());
        if let Some(loss) = self.forced_loss {
            return Ok(loss);
        }
        let diff = &predictions - &targets;
        Ok(diff.mapv(|x| x * x).mean().unwrap_or(0.0))
    }

    fn get_weights(&self) -> Array2<f32> {
        self.weights.clone()
    }

    fn set_weights(&mut self, weights: Array2<f32>) -> Result<()> {
        if weights.dim() != self.weights.dim() {
            return Err(DdqnError::dimension_mismatch(
                format!("{:?}", self.weights.dim()),
                format!("{:?}", weights.dim()),
            ));
        }
        self.weights = weights;
        Ok(())
    }
}

/// Two-action environment with 2-wide observations `[t / 10, 1]` that pays
/// 1.0 per step and terminates every `episode_len` steps.
pub struct ScriptedEnv {
    pub episode_len: usize,
    pub t: usize,
    pub resets: usize,
    pub steps: usize,
    pub renders: usize,
    pub closed: bool,
    pub actions: Vec<usize>,
    /// Action returned by `sample_action`, if overridden
    pub forced_sample: Option<usize>,
    /// Episode step at which `step` reports an error
    pub fail_at: Option<usize>,
}

impl ScriptedEnv {
    pub fn new(episode_len: usize) -> Self {
        ScriptedEnv {
            episode_len,
            t: 0,
            resets: 0,
            steps: 0,
            renders: 0,
            closed: false,
            actions: Vec::new(),
            forced_sample: None,
            fail_at: None,
        }
    }

    fn observation(&self) -> Array1<f32> {
        array![self.t as f32 / 10.0, 1.0]
    }
}

impl Environment for ScriptedEnv {
    fn reset(&mut self) -> Result<Array1<f32>> {
        self.t = 0;
        self.resets += 1;
        Ok(self.observation())
    }

    fn step(&mut self, action: usize) -> Result<Step> {
        if action >= 2 {
            return Err(DdqnError::Environment(format!("unknown action {}", action)));
        }
        if self.fail_at == Some(self.t + 1) {
            return Err(DdqnError::Environment(format!("step {} failed", self.t + 1)));
        }
        self.t += 1;
        self.steps += 1;
        self.actions.push(action);
        let done = self.t >= self.episode_len;
        Ok(Step::new(self.observation(), 1.0, done))
    }

    fn action_space(&self) -> DiscreteSpace {
        DiscreteSpace::new(2)
    }

    fn sample_action<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        match self.forced_sample {
            Some(action) => action,
            None => self.action_space().sample(rng),
        }
    }

    fn render(&mut self) -> Result<()> {
        self.renders += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Store `rewards.len()` transitions with 2-wide states `[i, 0]`.
pub fn filled_store(capacity: usize, rewards: &[f32], dones: &[bool]) -> TransitionStore {
    let mut store = TransitionStore::new(capacity, 2).unwrap();
    for (i, (&reward, &done)) in rewards.iter().zip(dones).enumerate() {
        let state = array![i as f32, 0.0];
        let next_state = array![i as f32 + 1.0, 0.0];
        store.store(state.view(), i % 2, reward, next_state.view(), done).unwrap();
    }
    store
}
