//! # ddqn - Double Deep Q-Network Agent
//!
//! A Double DQN agent for discrete-action environments. The agent acts
//! epsilon-greedily, keeps the most recent transitions in a fixed-capacity
//! circular replay store, and learns from uniformly sampled minibatches using
//! bootstrapped targets computed against a periodically hard-synced target
//! network.
//!
//! ## Key Features
//!
//! - **Replay store**: parallel-array circular buffer with distinct-index sampling
//! - **Double-Q targets**: online network selects, target network evaluates
//! - **Fixed Q-targets**: full parameter copy every `target_update_iter` steps
//! - **Pluggable approximators**: anything implementing [`approximator::QFunction`]
//! - **Bundled MLP**: [`network::NeuralNetwork`] with SGD/Adam and gradient clipping
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddqn::agent::DdqnAgent;
//! use ddqn::config::AgentConfig;
//! use ddqn::network::NeuralNetwork;
//! use rand::SeedableRng;
//!
//! let config = AgentConfig::default();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(123);
//! let online = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng).unwrap();
//! let target = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng).unwrap();
//! let agent = DdqnAgent::new(online, target, 4, config).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Linear)
//! - [`agent`] - Epsilon-greedy policy, target builder, target sync and the training loop
//! - [`approximator`] - The `QFunction` interface consumed by the agent
//! - [`config`] - Hyperparameters, validation and JSON loading
//! - [`env`] - Environment and action-space interfaces
//! - [`error`] - Error types and result handling
//! - [`loss`] - Regression losses
//! - [`metrics`] - Training metrics and reports
//! - [`network`] - Feed-forward value network
//! - [`optimizer`] - Optimization algorithms and gradient clipping
//! - [`replay_buffer`] - Experience replay store

pub mod activations;
pub mod agent;
pub mod approximator;
pub mod config;
pub mod env;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;

#[cfg(test)]
mod tests;
