//! Training metrics: bounded histories plus the summary returned by a
//! training run.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Stores training metrics over time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub losses: VecDeque<f32>,
    pub episode_rewards: VecDeque<f32>,
    pub episode_lengths: VecDeque<usize>,
    /// Epsilon at the end of each episode
    pub epsilons: VecDeque<f32>,
}

/// Tracks metrics during training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,

    current_episode_reward: f32,
    current_episode_length: usize,
    episode_count: usize,

    total_steps: usize,
    learning_steps: usize,
    loss_sum: f64,
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, limit: usize) {
    if queue.len() >= limit {
        queue.pop_front();
    }
    queue.push_back(value);
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            metrics: TrainingMetrics::default(),
            history_size: history_size.max(1),
            current_episode_reward: 0.0,
            current_episode_length: 0,
            episode_count: 0,
            total_steps: 0,
            learning_steps: 0,
            loss_sum: 0.0,
        }
    }

    /// Record one environment step's reward
    pub fn record_step(&mut self, reward: f32) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
    }

    /// Record a training loss
    pub fn record_loss(&mut self, loss: f32) {
        push_bounded(&mut self.metrics.losses, loss, self.history_size);
        self.learning_steps += 1;
        self.loss_sum += loss as f64;
    }

    /// Close the running episode; returns its `(reward, length)`.
    pub fn end_episode(&mut self, epsilon: f32) -> (f32, usize) {
        let finished = (self.current_episode_reward, self.current_episode_length);
        push_bounded(&mut self.metrics.episode_rewards, finished.0, self.history_size);
        push_bounded(&mut self.metrics.episode_lengths, finished.1, self.history_size);
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
        self.episode_count += 1;
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
        finished
    }

    /// Drop the running episode without recording it.
    pub fn abandon_episode(&mut self) {
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn learning_steps(&self) -> usize {
        self.learning_steps
    }

    /// Mean over every recorded loss, not only the retained history.
    pub fn mean_loss(&self) -> Option<f32> {
        if self.learning_steps == 0 {
            None
        } else {
            Some((self.loss_sum / self.learning_steps as f64) as f32)
        }
    }

    /// Sum of every recorded loss.
    pub fn loss_sum(&self) -> f64 {
        self.loss_sum
    }

    /// Rewards of the last `count` finished episodes, oldest first. Bounded
    /// by the retained history.
    pub fn last_episode_rewards(&self, count: usize) -> Vec<f32> {
        let rewards = &self.metrics.episode_rewards;
        let skip = rewards.len().saturating_sub(count);
        rewards.iter().skip(skip).copied().collect()
    }

    /// Mean reward of the last `window` finished episodes.
    pub fn recent_mean_reward(&self, window: usize) -> Option<f32> {
        let rewards = &self.metrics.episode_rewards;
        let take = window.min(rewards.len());
        if take == 0 {
            return None;
        }
        Some(rewards.iter().rev().take(take).sum::<f32>() / take as f32)
    }
}

/// Summary of one [`crate::agent::DdqnAgent::train`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub steps: usize,
    pub episodes: usize,
    pub learning_steps: usize,
    pub target_syncs: usize,
    pub final_epsilon: f32,
    pub mean_loss: Option<f32>,
    /// Rewards of the episodes finished during this call, oldest first,
    /// bounded by the tracker's history size
    pub episode_rewards: Vec<f32>,
}
