//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// Represents an environment, typically an MDP.
///
/// An environment has two phases within an episode: active and terminated.
/// [`Env::reset`] starts a new episode and returns the initial observation;
/// [`Env::step`] advances an active episode by one transition. Calling
/// `step` on a terminated episode is a usage error and implementations are
/// expected to fail loudly rather than silently continue.
pub trait Env {
    /// Configuration of the environment.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information attached to a [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    ///
    /// Construction validates the environment's configuration; for example,
    /// an environment whose start state is invalid must return an error
    /// here instead of falling back to an arbitrary state.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Resets the environment with a given index.
    ///
    /// The index is used in an arbitrary way, typically to derive a random
    /// seed for per-episode regeneration. [`DefaultEvaluator`] calls this
    /// method with the index of the evaluation episode.
    ///
    /// [`DefaultEvaluator`]: crate::DefaultEvaluator
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs>;

    /// Performs an environment step.
    fn step(&mut self, a: &Self::Act) -> (Step<Self>, Record)
    where
        Self: Sized;

    /// Performs an environment step and resets the environment if the
    /// episode ends, storing the new initial observation in
    /// [`Step::init_obs`].
    fn step_with_reset(&mut self, a: &Self::Act) -> (Step<Self>, Record)
    where
        Self: Sized;
}
