//! # Double DQN Agent
//!
//! The agent is split along its moving parts:
//!
//! - [`policy`]: epsilon-greedy exploration with a decaying rate
//! - [`target`]: bootstrapped regression targets (single- and double-network forms)
//! - [`sync`]: ownership of the target approximator and its hard sync
//! - [`DdqnAgent`]: the training loop tying them to a replay store and an environment
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ddqn::agent::DdqnAgent;
//! use ddqn::config::AgentConfigBuilder;
//! use ddqn::network::NeuralNetwork;
//! use rand::SeedableRng;
//!
//! let config = AgentConfigBuilder::new()
//!     .buffer_size(2000)
//!     .batch_size(32)
//!     .start_learning(200)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let online = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng).unwrap();
//! let target = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng).unwrap();
//! let mut agent = DdqnAgent::new(online, target, 4, config).unwrap();
//! // agent.train(&mut env)?; agent.evaluate(&mut env, false)?;
//! ```

pub mod policy;
pub mod sync;
pub mod target;

mod ddqn;
pub use ddqn::DdqnAgent;
pub use policy::EpsilonGreedy;
pub use sync::TargetSync;
pub use target::{bootstrap_values, build_targets, TargetForm};
