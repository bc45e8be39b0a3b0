//! Exploration strategies of DQN.
use candle_core::{shape::D, DType, Tensor};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Explorers for DQN.
///
/// Both variants satisfy the same action-selection contract and are
/// interchangeable through the agent's configuration.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum DqnExplorer {
    /// Epsilon-greedy action selection.
    EpsilonGreedy(EpsilonGreedy),

    /// Greedy selection over a noisy value network. Exploration comes from
    /// the parameter noise resampled before each evaluation, so no action
    /// randomization is applied here.
    Noisy,
}

/// When the exploration rate decays.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum DecaySchedule {
    /// Decay once per completed episode.
    PerEpisode,

    /// Decay once per optimization step.
    PerOptStep,
}

/// Epsilon-greedy explorer for DQN.
///
/// With probability `eps` a uniformly random action is taken, otherwise
/// the argmax of the action values. `eps` decays multiplicatively on the
/// configured schedule and never drops below `eps_min`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Current exploration rate.
    pub eps: f64,

    /// Lower bound of the exploration rate.
    pub eps_min: f64,

    /// Multiplicative decay factor.
    pub eps_decay: f64,

    /// Decay cadence. Must stay fixed within a run.
    pub schedule: DecaySchedule,
}

#[allow(clippy::new_without_default)]
impl EpsilonGreedy {
    /// Constructs an epsilon-greedy explorer.
    pub fn new() -> Self {
        Self {
            eps: 1.0,
            eps_min: 0.05,
            eps_decay: 0.9995,
            schedule: DecaySchedule::PerEpisode,
        }
    }

    /// Sets the initial exploration rate.
    pub fn eps(mut self, v: f64) -> Self {
        self.eps = v;
        self
    }

    /// Sets the lower bound of the exploration rate.
    pub fn eps_min(mut self, v: f64) -> Self {
        self.eps_min = v;
        self
    }

    /// Sets the decay factor.
    pub fn eps_decay(mut self, v: f64) -> Self {
        self.eps_decay = v;
        self
    }

    /// Sets the decay cadence.
    pub fn schedule(mut self, v: DecaySchedule) -> Self {
        self.schedule = v;
        self
    }

    /// Multiplies the exploration rate by the decay factor, floored at the
    /// minimum.
    pub fn decay(&mut self) {
        self.eps = (self.eps * self.eps_decay).max(self.eps_min);
    }

    /// Takes an action based on action values, returns an i64 tensor.
    ///
    /// * `a` - action values of shape `[n_samples, n_actions]`.
    pub fn action(&self, a: &Tensor, rng: &mut impl Rng) -> Tensor {
        if rng.gen::<f64>() < self.eps {
            let n_samples = a.dims()[0];
            let n_actions = a.dims()[1] as u64;
            Tensor::from_slice(
                (0..n_samples)
                    .map(|_| (rng.gen::<u64>() % n_actions) as i64)
                    .collect::<Vec<_>>()
                    .as_slice(),
                &[n_samples],
                a.device(),
            )
            .unwrap()
        } else {
            a.argmax(D::Minus1).unwrap().to_dtype(DType::I64).unwrap()
        }
    }
}
