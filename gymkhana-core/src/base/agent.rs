//! Agent.
use super::{Env, Policy, ReplayBufferBase};
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy on an environment.
pub trait Agent<E: Env, R: ReplayBufferBase>: Policy<E> {
    /// Sets the policy to training mode.
    fn train(&mut self);

    /// Sets the policy to evaluation mode.
    fn eval(&mut self);

    /// Returns true if it is in training mode.
    fn is_train(&self) -> bool;

    /// Performs an optimization step.
    ///
    /// `buffer` is a replay buffer from which transition batches are taken
    /// for updating model parameters. Returns `None` when the agent skipped
    /// the step, for example during the warmup period of the replay buffer.
    fn opt(&mut self, buffer: &mut R) -> Option<Record>;

    /// Called by the trainer when an episode finishes.
    ///
    /// Agents use this hook for per-episode bookkeeping such as decaying
    /// the exploration rate or synchronizing a target network on an episode
    /// cadence. The returned record is merged into the episode's records.
    fn on_episode_end(&mut self) -> Record {
        Record::empty()
    }

    /// Saves the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Loads the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
