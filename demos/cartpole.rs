//! CartPole with a Double DQN agent.
//!
//! Evaluates the untrained agent, trains for `train_nums` steps and
//! evaluates again. Pass a JSON config path as the first argument to
//! override the defaults; set `RUST_LOG=debug` to see every episode.
//!
//! ```text
//! cargo run --release --example cartpole -- config.json
//! ```

use std::f32::consts::PI;

use ddqn::agent::DdqnAgent;
use ddqn::config::AgentConfig;
use ddqn::env::{DiscreteSpace, Environment, Step};
use ddqn::error::{DdqnError, Result};
use ddqn::network::NeuralNetwork;
use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_EPISODE_STEPS: usize = 200;

/// Classic cart-pole: reward 1 per step, episode ends when the pole leans
/// past 12 degrees, the cart leaves the track, or after 200 steps.
struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    steps: usize,

    gravity: f32,
    mass_cart: f32,
    mass_pole: f32,
    length: f32,
    force_mag: f32,
    dt: f32,
    theta_threshold: f32,
    x_threshold: f32,

    rng: StdRng,
}

impl CartPole {
    fn new(seed: u64) -> Self {
        CartPole {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            dt: 0.02,
            theta_threshold: 12.0 * 2.0 * PI / 360.0,
            x_threshold: 2.4,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn state(&self) -> Array1<f32> {
        array![self.x, self.x_dot, self.theta, self.theta_dot]
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Result<Array1<f32>> {
        self.x = self.rng.gen_range(-0.05..0.05);
        self.x_dot = self.rng.gen_range(-0.05..0.05);
        self.theta = self.rng.gen_range(-0.05..0.05);
        self.theta_dot = self.rng.gen_range(-0.05..0.05);
        self.steps = 0;
        Ok(self.state())
    }

    fn step(&mut self, action: usize) -> Result<Step> {
        if !self.action_space().contains(action) {
            return Err(DdqnError::Environment(format!("cart-pole has no action {}", action)));
        }
        let force = if action == 1 { self.force_mag } else { -self.force_mag };

        let cos_theta = self.theta.cos();
        let sin_theta = self.theta.sin();
        let total_mass = self.mass_cart + self.mass_pole;
        let pole_mass_length = self.mass_pole * self.length;

        let temp = (force + pole_mass_length * self.theta_dot * self.theta_dot * sin_theta) / total_mass;
        let theta_acc = (self.gravity * sin_theta - cos_theta * temp)
            / (self.length * (4.0 / 3.0 - self.mass_pole * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        self.x += self.dt * self.x_dot;
        self.x_dot += self.dt * x_acc;
        self.theta += self.dt * self.theta_dot;
        self.theta_dot += self.dt * theta_acc;
        self.steps += 1;

        let fell = self.x.abs() > self.x_threshold || self.theta.abs() > self.theta_threshold;
        let truncated = self.steps >= MAX_EPISODE_STEPS;

        Ok(Step::new(self.state(), 1.0, fell || truncated).with_info(json!({ "truncated": truncated && !fell })))
    }

    fn action_space(&self) -> DiscreteSpace {
        DiscreteSpace::new(2)
    }

    fn render(&mut self) -> Result<()> {
        let track_width = 41;
        let pos = ((self.x + self.x_threshold) / (2.0 * self.x_threshold) * (track_width - 1) as f32)
            .round()
            .clamp(0.0, (track_width - 1) as f32) as usize;
        let mut track = vec!['-'; track_width];
        track[pos] = if self.theta.abs() < 0.05 {
            '|'
        } else if self.theta > 0.0 {
            '/'
        } else {
            '\\'
        };
        println!("{}  theta={:+.3}", track.iter().collect::<String>(), self.theta);
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AgentConfig::from_json_file(path)?,
        None => AgentConfig {
            seed: Some(42),
            ..AgentConfig::default()
        },
    };
    let seed = config.seed.unwrap_or(42);

    let mut env = CartPole::new(seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let online = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng)?;
    let target = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng)?;
    let mut agent = DdqnAgent::for_env(online, target, &mut env, config)?;

    let before = agent.evaluate(&mut env, false)?;
    info!(reward = before, "before training");

    let report = agent.train(&mut env)?;
    info!(
        episodes = report.episodes,
        target_syncs = report.target_syncs,
        epsilon = report.final_epsilon,
        mean_loss = ?report.mean_loss,
        recent_reward = ?agent.metrics().recent_mean_reward(20),
        "training report"
    );

    let after = agent.evaluate(&mut env, true)?;
    info!(reward = after, "after training");
    Ok(())
}
