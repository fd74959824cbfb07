//! # Experience Replay
//!
//! A fixed-capacity circular store of transitions laid out as five parallel
//! arrays (states, actions, rewards, next states, terminal flags). Writes
//! overwrite the oldest slot once the store is full; sampling draws distinct
//! indices uniformly from the slots that currently hold data.
//!
//! ```rust
//! use ddqn::replay_buffer::TransitionStore;
//! use ndarray::array;
//! use rand::SeedableRng;
//!
//! let mut store = TransitionStore::new(100, 2).unwrap();
//! for i in 0..10 {
//!     let s = array![i as f32, 0.0];
//!     let ns = array![i as f32 + 1.0, 0.0];
//!     store.store(s.view(), 0, 1.0, ns.view(), false).unwrap();
//! }
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let batch = store.sample_batch(4, &mut rng).unwrap();
//! assert_eq!(batch.len(), 4);
//! ```

use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;

use crate::error::{DdqnError, Result};

/// Largest `requested / available` ratio for which sampling uses rejection.
///
/// Below this ratio every draw is accepted with probability of at least
/// `1 - RATIO`, so the expected number of draws stays under `n / (1 - RATIO)`.
/// Above it, a partial Fisher-Yates shuffle is used instead.
pub const REJECTION_SAMPLING_MAX_RATIO: f64 = 0.25;

/// One observed environment step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

/// A minibatch gathered from the store, row `i` of every field belonging to
/// the transition stored at `indices[i]`.
#[derive(Clone, Debug)]
pub struct Batch {
    pub indices: Vec<usize>,
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    pub dones: Vec<bool>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Fixed-capacity circular transition store.
///
/// Slots `0..len()` always hold valid transitions. Slots beyond that are
/// allocated but never read until the cursor has written them.
#[derive(Clone, Debug)]
pub struct TransitionStore {
    states: Array2<f32>,
    actions: Vec<usize>,
    rewards: Array1<f32>,
    next_states: Array2<f32>,
    dones: Vec<bool>,
    next_idx: usize,
    num_in_buffer: usize,
    total_writes: usize,
}

impl TransitionStore {
    /// Allocate a store holding `capacity` transitions of `obs_dim`-wide observations.
    pub fn new(capacity: usize, obs_dim: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DdqnError::invalid_parameter("capacity", "must be at least 1"));
        }
        if obs_dim == 0 {
            return Err(DdqnError::invalid_parameter("obs_dim", "must be at least 1"));
        }

        Ok(TransitionStore {
            states: Array2::zeros((capacity, obs_dim)),
            actions: vec![0; capacity],
            rewards: Array1::zeros(capacity),
            next_states: Array2::zeros((capacity, obs_dim)),
            dones: vec![false; capacity],
            next_idx: 0,
            num_in_buffer: 0,
            total_writes: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.actions.len()
    }

    pub fn obs_dim(&self) -> usize {
        self.states.ncols()
    }

    /// Number of slots currently holding valid transitions.
    pub fn len(&self) -> usize {
        self.num_in_buffer
    }

    pub fn is_empty(&self) -> bool {
        self.num_in_buffer == 0
    }

    pub fn is_full(&self) -> bool {
        self.num_in_buffer == self.capacity()
    }

    /// Slot the next write will land in.
    pub fn next_index(&self) -> usize {
        self.next_idx
    }

    /// Writes since construction, including overwritten ones.
    pub fn total_writes(&self) -> usize {
        self.total_writes
    }

    /// Write a transition into the slot under the cursor, overwriting whatever
    /// was there, and advance the cursor.
    ///
    /// Fails only when an observation does not match the allocated width; in
    /// that case the store is left untouched.
    pub fn store(
        &mut self,
        state: ArrayView1<f32>,
        action: usize,
        reward: f32,
        next_state: ArrayView1<f32>,
        done: bool,
    ) -> Result<()> {
        let obs_dim = self.obs_dim();
        for (name, len) in [("state", state.len()), ("next_state", next_state.len())] {
            if len != obs_dim {
                return Err(DdqnError::dimension_mismatch(
                    format!("{} of length {}", name, obs_dim),
                    format!("{} of length {}", name, len),
                ));
            }
        }

        let idx = self.next_idx;
        self.states.row_mut(idx).assign(&state);
        self.actions[idx] = action;
        self.rewards[idx] = reward;
        self.next_states.row_mut(idx).assign(&next_state);
        self.dones[idx] = done;

        self.next_idx = (self.next_idx + 1) % self.capacity();
        self.num_in_buffer = (self.num_in_buffer + 1).min(self.capacity());
        self.total_writes += 1;
        Ok(())
    }

    /// Convenience wrapper around [`TransitionStore::store`].
    pub fn push(&mut self, transition: &Transition) -> Result<()> {
        self.store(
            transition.state.view(),
            transition.action,
            transition.reward,
            transition.next_state.view(),
            transition.done,
        )
    }

    /// Copy out the transition in slot `index`, if that slot holds one.
    pub fn get(&self, index: usize) -> Option<Transition> {
        if index >= self.num_in_buffer {
            return None;
        }
        Some(Transition {
            state: self.states.row(index).to_owned(),
            action: self.actions[index],
            reward: self.rewards[index],
            next_state: self.next_states.row(index).to_owned(),
            done: self.dones[index],
        })
    }

    /// Draw `n` pairwise-distinct indices uniformly from `0..len()`.
    ///
    /// Requires `n < len()`; equality is refused as well. Order of the
    /// returned indices carries no meaning.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<usize>> {
        let available = self.num_in_buffer;
        if n >= available {
            return Err(DdqnError::Underflow {
                requested: n,
                available,
            });
        }

        if (n as f64) <= REJECTION_SAMPLING_MAX_RATIO * available as f64 {
            Ok(rejection_sample(n, available, rng))
        } else {
            Ok(partial_shuffle(n, available, rng))
        }
    }

    /// Gather the transitions at `indices` into a [`Batch`].
    pub fn gather(&self, indices: &[usize]) -> Result<Batch> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.num_in_buffer) {
            return Err(DdqnError::invalid_parameter(
                "indices".to_string(),
                format!("slot {} is not populated ({} valid)", bad, self.num_in_buffer),
            ));
        }

        Ok(Batch {
            indices: indices.to_vec(),
            states: self.states.select(Axis(0), indices),
            actions: indices.iter().map(|&i| self.actions[i]).collect(),
            rewards: indices.iter().map(|&i| self.rewards[i]).collect(),
            next_states: self.next_states.select(Axis(0), indices),
            dones: indices.iter().map(|&i| self.dones[i]).collect(),
        })
    }

    /// [`TransitionStore::sample`] followed by [`TransitionStore::gather`].
    pub fn sample_batch<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Batch> {
        let indices = self.sample(n, rng)?;
        self.gather(&indices)
    }
}

fn rejection_sample<R: Rng + ?Sized>(n: usize, available: usize, rng: &mut R) -> Vec<usize> {
    let mut seen = HashSet::with_capacity(n);
    let mut picked = Vec::with_capacity(n);
    while picked.len() < n {
        let idx = rng.gen_range(0..available);
        if seen.insert(idx) {
            picked.push(idx);
        }
    }
    picked
}

fn partial_shuffle<R: Rng + ?Sized>(n: usize, available: usize, rng: &mut R) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..available).collect();
    for i in 0..n {
        let j = rng.gen_range(i..available);
        pool.swap(i, j);
    }
    pool.truncate(n);
    pool
}
