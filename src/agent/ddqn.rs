use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace};

use crate::agent::policy::EpsilonGreedy;
use crate::agent::sync::TargetSync;
use crate::agent::target::{build_targets, TargetForm};
use crate::approximator::QFunction;
use crate::config::{AgentConfig, DecayTrigger};
use crate::env::Environment;
use crate::error::{DdqnError, Result};
use crate::metrics::{MetricsTracker, TrainingReport};
use crate::replay_buffer::TransitionStore;

const METRICS_HISTORY: usize = 1000;

/// Double DQN agent.
///
/// Owns the online approximator, the target approximator (behind
/// [`TargetSync`]), the replay store, the exploration policy and its RNG.
/// Everything runs synchronously on the caller's thread.
///
/// # Example
///
/// ```rust,no_run
/// use ddqn::agent::DdqnAgent;
/// use ddqn::config::AgentConfig;
/// use ddqn::network::NeuralNetwork;
/// use rand::SeedableRng;
///
/// let config = AgentConfig { seed: Some(123), ..AgentConfig::default() };
/// let mut rng = rand::rngs::StdRng::seed_from_u64(123);
/// let online = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng).unwrap();
/// let target = NeuralNetwork::q_network(4, 2, config.learning_rate, &mut rng).unwrap();
/// let agent = DdqnAgent::new(online, target, 4, config).unwrap();
/// assert_eq!(agent.buffer().capacity(), 200);
/// ```
pub struct DdqnAgent<Q: QFunction> {
    config: AgentConfig,
    online: Q,
    target: TargetSync<Q>,
    buffer: TransitionStore,
    policy: EpsilonGreedy,
    rng: StdRng,
    metrics: MetricsTracker,
}

impl<Q: QFunction> DdqnAgent<Q> {
    /// Create an agent for `obs_dim`-wide observations.
    pub fn new(online: Q, target: Q, obs_dim: usize, config: AgentConfig) -> Result<Self> {
        config.validate()?;
        if online.input_size() != obs_dim {
            return Err(DdqnError::dimension_mismatch(
                format!("approximator input of {}", obs_dim),
                format!("approximator input of {}", online.input_size()),
            ));
        }

        let target = TargetSync::new(&online, target, config.target_update_iter)?;
        let buffer = TransitionStore::new(config.buffer_size, obs_dim)?;
        let policy = EpsilonGreedy::new(config.epsilon, config.epsilon_decay, config.min_epsilon)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(DdqnAgent {
            config,
            online,
            target,
            buffer,
            policy,
            rng,
            metrics: MetricsTracker::new(METRICS_HISTORY),
        })
    }

    /// Create an agent sized from `env`: one `reset()` fixes the observation
    /// width, and the action space must match the approximator's outputs.
    pub fn for_env<E: Environment>(online: Q, target: Q, env: &mut E, config: AgentConfig) -> Result<Self> {
        let obs = env.reset()?;
        let num_actions = env.action_space().n;
        if online.num_actions() != num_actions {
            return Err(DdqnError::dimension_mismatch(
                format!("{} action values", num_actions),
                format!("{} action values", online.num_actions()),
            ));
        }
        Self::new(online, target, obs.len(), config)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn online(&self) -> &Q {
        &self.online
    }

    pub fn target(&self) -> &Q {
        self.target.target()
    }

    pub fn buffer(&self) -> &TransitionStore {
        &self.buffer
    }

    pub fn policy(&self) -> &EpsilonGreedy {
        &self.policy
    }

    pub fn epsilon(&self) -> f32 {
        self.policy.epsilon()
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn target_syncs(&self) -> usize {
        self.target.sync_count()
    }

    pub fn decay_epsilon(&mut self) -> f32 {
        self.policy.decay()
    }

    /// Copy the online parameters into the target approximator now.
    pub fn sync_target(&mut self) -> Result<()> {
        self.target.sync(&self.online)
    }

    pub fn store_transition(
        &mut self,
        state: ArrayView1<f32>,
        action: usize,
        reward: f32,
        next_state: ArrayView1<f32>,
        done: bool,
    ) -> Result<()> {
        self.buffer.store(state, action, reward, next_state, done)
    }

    /// Epsilon-greedy action for `obs`, plus the online value estimates.
    pub fn select_action<E: Environment>(&mut self, env: &mut E, obs: ArrayView1<f32>) -> Result<(usize, Array1<f32>)> {
        let (best_action, q_values) = self.online.action_value(obs)?;
        let action = self
            .policy
            .select(best_action, &mut self.rng, |rng| env.sample_action(rng));

        let space = env.action_space();
        if !space.contains(action) {
            return Err(DdqnError::InvalidAction {
                action,
                num_actions: space.n,
            });
        }
        Ok((action, q_values))
    }

    /// One learning step with a randomly chosen target form.
    pub fn train_step(&mut self) -> Result<f32> {
        let form = TargetForm::choose(&mut self.rng);
        self.train_step_with(form)
    }

    /// One learning step: sample, build targets with `form`, update online.
    ///
    /// Fails with [`DdqnError::Underflow`] unless the store holds strictly
    /// more transitions than `batch_size`.
    pub fn train_step_with(&mut self, form: TargetForm) -> Result<f32> {
        let batch = self.buffer.sample_batch(self.config.batch_size, &mut self.rng)?;
        let targets = build_targets(form, &batch, &self.online, self.target.target(), self.config.gamma)?;
        let loss = self.online.train_on_batch(batch.states.view(), targets.view())?;
        if !loss.is_finite() {
            return Err(DdqnError::Numerical(format!("training loss diverged to {}", loss)));
        }
        trace!(?form, loss, "learning step");
        Ok(loss)
    }

    /// Run `train_nums` environment steps.
    ///
    /// Each step acts epsilon-greedily and stores the transition; after the
    /// warm-up (`step > start_learning`) it also performs one learning step.
    /// Every `target_update_iter` steps the target is hard-synced, learning
    /// or not. Terminal steps reset the environment. The loop does not stop
    /// at episode boundaries.
    pub fn train<E: Environment>(&mut self, env: &mut E) -> Result<TrainingReport> {
        let syncs_before = self.target.sync_count();
        let learning_before = self.metrics.learning_steps();
        let episodes_before = self.metrics.episode_count();
        let loss_sum_before = self.metrics.loss_sum();

        info!(
            train_nums = self.config.train_nums,
            start_learning = self.config.start_learning,
            buffer_size = self.config.buffer_size,
            "training started"
        );

        // An episode left unfinished by a previous run is not continued
        self.metrics.abandon_episode();
        let mut obs = env.reset()?;
        for t in 1..=self.config.train_nums {
            // acting
            let (action, _) = self.select_action(env, obs.view())?;
            let step = env.step(action)?;
            self.buffer
                .store(obs.view(), action, step.reward, step.observation.view(), step.done)?;
            self.metrics.record_step(step.reward);
            if self.config.decay_trigger == DecayTrigger::Step {
                self.policy.decay();
            }

            // learning
            if t > self.config.start_learning {
                let loss = self.train_step()?;
                self.metrics.record_loss(loss);
                if t % self.config.log_every == 0 {
                    info!(step = t, loss, epsilon = self.policy.epsilon(), "training progress");
                }
            }

            // syncing
            if self.target.is_due(t) {
                self.target.sync(&self.online)?;
            }

            // episode reset
            if step.done {
                if self.config.decay_trigger == DecayTrigger::EpisodeEnd {
                    self.policy.decay();
                }
                let (reward, length) = self.metrics.end_episode(self.policy.epsilon());
                debug!(step = t, reward, length, epsilon = self.policy.epsilon(), "episode finished");
                obs = env.reset()?;
            } else {
                obs = step.observation;
            }
        }

        let episodes = self.metrics.episode_count() - episodes_before;
        let learning_steps = self.metrics.learning_steps() - learning_before;
        let mean_loss = if learning_steps == 0 {
            None
        } else {
            Some(((self.metrics.loss_sum() - loss_sum_before) / learning_steps as f64) as f32)
        };
        let report = TrainingReport {
            steps: self.config.train_nums,
            episodes,
            learning_steps,
            target_syncs: self.target.sync_count() - syncs_before,
            final_epsilon: self.policy.epsilon(),
            mean_loss,
            episode_rewards: self.metrics.last_episode_rewards(episodes),
        };
        info!(
            episodes = report.episodes,
            learning_steps = report.learning_steps,
            target_syncs = report.target_syncs,
            "training finished"
        );
        Ok(report)
    }

    /// Greedy rollout of one episode; no exploration, no storage, no learning.
    /// Closes `env` afterwards, also when the rollout fails, and returns the
    /// episode reward.
    pub fn evaluate<E: Environment>(&self, env: &mut E, render: bool) -> Result<f32> {
        let rollout = self.greedy_episode(env, render);
        env.close();
        let episode_reward = rollout?;
        debug!(episode_reward, "evaluation finished");
        Ok(episode_reward)
    }

    fn greedy_episode<E: Environment>(&self, env: &mut E, render: bool) -> Result<f32> {
        let space = env.action_space();
        let mut obs = env.reset()?;
        let mut episode_reward = 0.0;
        loop {
            let (action, _) = self.online.action_value(obs.view())?;
            if !space.contains(action) {
                return Err(DdqnError::InvalidAction {
                    action,
                    num_actions: space.n,
                });
            }
            let step = env.step(action)?;
            episode_reward += step.reward;
            if render {
                env.render()?;
            }
            if step.done {
                return Ok(episode_reward);
            }
            obs = step.observation;
        }
    }
}
