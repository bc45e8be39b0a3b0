//! Environment step.
use super::Env;

/// Additional information attached to [`Step`] by an environment.
pub trait Info {}

impl Info for () {}

/// An action, observation and reward tuple `(a_t, o_t+1, r_t)` with some
/// additional information.
///
/// An environment emits a [`Step`] object at every interaction step. This
/// object is used to create transitions `(o_t, a_t, o_t+1, r_t)`.
pub struct Step<E: Env> {
    /// Action taken at this step.
    pub act: E::Act,

    /// Observation after the step.
    pub obs: E::Obs,

    /// Reward of the transition.
    pub reward: f32,

    /// True if the episode terminated (e.g. a collision).
    pub is_terminated: bool,

    /// True if the episode was truncated by the step limit.
    pub is_truncated: bool,

    /// Information defined by the environment.
    pub info: E::Info,

    /// Initial observation of the next episode. Set by
    /// [`Env::step_with_reset`] when the episode ended, `None` otherwise.
    pub init_obs: Option<E::Obs>,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
        init_obs: Option<E::Obs>,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
            init_obs,
        }
    }

    /// Terminated or truncated.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}

/// Processes [`Step`] objects into items for a replay buffer.
///
/// This trait is used in [`Trainer`](crate::Trainer). A [`Step`] object is
/// transformed into [`Self::Output`], which is pushed into a replay buffer
/// implementing [`ExperienceBufferBase`](crate::ExperienceBufferBase).
/// [`Self::Output`] should be the same type as
/// [`ExperienceBufferBase::Item`](crate::ExperienceBufferBase::Item).
pub trait StepProcessor<E: Env> {
    /// Configuration of the processor.
    type Config: Clone;

    /// The type of transitions produced by this processor.
    type Output;

    /// Builds a processor.
    fn build(config: &Self::Config) -> Self;

    /// Resets the processor with the initial observation of an episode.
    fn reset(&mut self, init_obs: E::Obs);

    /// Processes a [`Step`] object.
    fn process(&mut self, step: Step<E>) -> Self::Output;
}
