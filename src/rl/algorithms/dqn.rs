//! Deep Q-Network
//!
//! Online/target Q-networks trained on replayed transitions with an
//! epsilon-greedy collection policy.

use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::SentiError;
use crate::rl::core::ObservationBundle;
use crate::rl::memory::Transition;
use crate::rl::networks::tensors::to_vec;
use crate::rl::networks::{argmax_rows, ObservationBatch, TradingQNetwork};

/// DQN hyperparameters
#[derive(Config, Debug)]
pub struct DqnConfig {
    /// Adam learning rate
    #[config(default = "1e-3")]
    pub lr: f64,
    /// Discount factor
    #[config(default = "0.99")]
    pub gamma: f32,
    #[config(default = "1.0")]
    pub epsilon_start: f64,
    #[config(default = "0.05")]
    pub epsilon_min: f64,
    /// Multiplicative decay applied after every update
    #[config(default = "0.995")]
    pub epsilon_decay: f64,
    /// Updates between target network syncs
    #[config(default = "10")]
    pub target_update_period: usize,
    #[config(default = "64")]
    pub batch_size: usize,
    #[config(default = "42")]
    pub seed: u64,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DqnConfig {
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.lr <= 0.0 {
            errors.push("agent.lr must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            errors.push(format!("agent.gamma must be in [0, 1], got {}", self.gamma));
        }
        if !(0.0..=1.0).contains(&self.epsilon_start) || !(0.0..=1.0).contains(&self.epsilon_min) {
            errors.push("agent.epsilon_start and epsilon_min must be in [0, 1]".to_string());
        }
        if self.target_update_period == 0 || self.batch_size == 0 {
            errors.push("agent.target_update_period and batch_size must be positive".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// DQN agent over the trading Q-network
pub struct DqnAgent<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TradingQNetwork<B>, B>,
{
    online: TradingQNetwork<B>,
    target: TradingQNetwork<B::InnerBackend>,
    optimizer: O,
    config: DqnConfig,
    epsilon: f64,
    train_steps: usize,
    num_actions: usize,
    rng: StdRng,
    device: B::Device,
}

impl<B, O> DqnAgent<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TradingQNetwork<B>, B>,
{
    pub fn new(network: TradingQNetwork<B>, optimizer: O, config: DqnConfig, device: B::Device) -> Self {
        let target = network.valid();
        Self {
            num_actions: network.num_actions(),
            online: network,
            target,
            optimizer,
            epsilon: config.epsilon_start,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            train_steps: 0,
            device,
        }
    }

    /// Scores of the online network, one row per observation
    pub fn q_values(&self, observations: &[&ObservationBundle]) -> crate::error::Result<Vec<Vec<f32>>> {
        let batch = ObservationBatch::<B::InnerBackend>::from_bundles(
            observations.iter().copied(),
            &self.device,
        )?;
        let scores = self.online.valid().forward(&batch);
        let flat = to_vec(scores)?;
        Ok(flat
            .chunks(self.num_actions)
            .map(|row| row.to_vec())
            .collect())
    }

    /// Highest-scoring action
    pub fn greedy_action(&self, observation: &ObservationBundle) -> crate::error::Result<usize> {
        let batch = ObservationBatch::<B::InnerBackend>::from_bundles([observation], &self.device)?;
        let scores = self.online.valid().forward(&batch);
        argmax_rows(scores)?
            .first()
            .copied()
            .ok_or_else(|| SentiError::Model("empty score tensor".to_string()))
    }

    /// Epsilon-greedy action for experience collection
    pub fn collect_action(&mut self, observation: &ObservationBundle) -> crate::error::Result<usize> {
        if self.rng.gen::<f64>() < self.epsilon {
            return Ok(self.rng.gen_range(0..self.num_actions));
        }
        self.greedy_action(observation)
    }

    /// One gradient step on `batch`, returning the loss
    pub fn train(&mut self, batch: &[&Transition]) -> crate::error::Result<f32> {
        if batch.is_empty() {
            return Err(SentiError::Model("cannot train on an empty batch".to_string()));
        }
        let size = batch.len();

        let observations =
            ObservationBatch::<B>::from_bundles(batch.iter().map(|t| &t.observation), &self.device)?;
        let next_observations = ObservationBatch::<B::InnerBackend>::from_bundles(
            batch.iter().map(|t| &t.next_observation),
            &self.device,
        )?;

        let rewards: Vec<f32> = batch.iter().map(|t| t.reward).collect();
        let continues: Vec<f32> = batch
            .iter()
            .map(|t| if t.done { 0.0 } else { 1.0 })
            .collect();
        let actions: Vec<i64> = batch.iter().map(|t| t.action as i64).collect();

        // r + gamma * (1 - done) * max_a' Q_target(s', a')
        let next_q = self.target.forward(&next_observations).max_dim(1);
        let rewards = Tensor::<B::InnerBackend, 2>::from_data(
            TensorData::new(rewards, [size, 1]),
            &self.device,
        );
        let continues = Tensor::<B::InnerBackend, 2>::from_data(
            TensorData::new(continues, [size, 1]),
            &self.device,
        );
        let targets = rewards + next_q.mul(continues).mul_scalar(self.config.gamma);
        let targets = Tensor::<B, 2>::from_inner(targets);

        let actions =
            Tensor::<B, 2, Int>::from_data(TensorData::new(actions, [size, 1]), &self.device);
        let q_taken = self.online.forward(&observations).gather(1, actions);

        let loss = MseLoss::new().forward(q_taken, targets, Reduction::Mean);
        let loss_value = to_vec(loss.clone().detach())?
            .first()
            .copied()
            .unwrap_or(f32::NAN);

        let grads = GradientsParams::from_grads(loss.backward(), &self.online);
        self.online = self
            .optimizer
            .step(self.config.lr, self.online.clone(), grads);

        self.train_steps += 1;
        if self.train_steps % self.config.target_update_period == 0 {
            self.sync_target();
        }
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);

        debug!(
            step = self.train_steps,
            loss = loss_value,
            epsilon = self.epsilon,
            "dqn update"
        );
        Ok(loss_value)
    }

    /// Copy online weights into the target network
    pub fn sync_target(&mut self) {
        self.target = self.online.valid();
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    pub fn train_steps(&self) -> usize {
        self.train_steps
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn network(&self) -> &TradingQNetwork<B> {
        &self.online
    }
}
