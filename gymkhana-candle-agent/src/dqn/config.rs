//! Configuration of the DQN agent.
use super::{explorer::EpsilonGreedy, DqnExplorer, DqnModelConfig};
use crate::{
    util::{CriticLoss, OutDim},
    Device,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Dqn`](super::Dqn).
pub struct DqnConfig<Q>
where
    Q: OutDim,
{
    /// Configuration of the online and target value models.
    pub model_config: DqnModelConfig<Q>,

    /// Minibatch size.
    pub batch_size: usize,

    /// Replay-buffer fill level below which optimization is skipped.
    pub min_transitions_warmup: usize,

    /// Gradient steps per optimization call.
    pub n_updates_per_opt: usize,

    /// Discount factor gamma.
    pub discount_factor: f64,

    /// Soft-update coefficient of the target synchronization; 1.0 copies
    /// the online parameters verbatim.
    pub tau: f64,

    /// Target synchronization cadence in completed episodes. The lag
    /// between the online and target networks stabilizes the learning
    /// target, so the target is never synchronized every step.
    pub sync_interval: usize,

    /// Use the double-DQN target: select the next action with the online
    /// network, evaluate it with the target network.
    pub double_dqn: bool,

    /// Regression loss of the value update.
    pub critic_loss: CriticLoss,

    /// Exploration strategy.
    pub explorer: DqnExplorer,

    /// Compute device; CPU when unset.
    pub device: Option<Device>,

    /// Seed of the exploration RNG.
    pub seed: u64,
}

impl<Q: OutDim> Default for DqnConfig<Q> {
    fn default() -> Self {
        Self {
            model_config: DqnModelConfig::default(),
            batch_size: 32,
            min_transitions_warmup: 1000,
            n_updates_per_opt: 1,
            discount_factor: 0.95,
            tau: 1.0,
            sync_interval: 1,
            double_dqn: false,
            critic_loss: CriticLoss::Mse,
            explorer: DqnExplorer::EpsilonGreedy(EpsilonGreedy::new()),
            device: None,
            seed: 42,
        }
    }
}

impl<Q: OutDim> DqnConfig<Q> {
    /// Sets the model configuration.
    pub fn model_config(mut self, model_config: DqnModelConfig<Q>) -> Self {
        self.model_config = model_config;
        self
    }

    /// Sets the minibatch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the warmup fill level.
    pub fn min_transitions_warmup(mut self, v: usize) -> Self {
        self.min_transitions_warmup = v;
        self
    }

    /// Sets the number of gradient steps per optimization call.
    pub fn n_updates_per_opt(mut self, v: usize) -> Self {
        self.n_updates_per_opt = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the soft-update coefficient.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets the target synchronization cadence in episodes.
    pub fn sync_interval(mut self, v: usize) -> Self {
        self.sync_interval = v;
        self
    }

    /// Enables or disables the double-DQN target.
    pub fn double_dqn(mut self, v: bool) -> Self {
        self.double_dqn = v;
        self
    }

    /// Sets the critic loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Sets the exploration strategy.
    pub fn explorer(mut self, v: DqnExplorer) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the compute device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = Some(v);
        self
    }

    /// Sets the seed of the exploration RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }
}

impl<Q: OutDim + DeserializeOwned + Serialize> DqnConfig<Q> {
    /// Constructs [`DqnConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
