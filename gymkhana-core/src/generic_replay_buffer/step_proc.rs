//! Generic step processing.
use super::{BatchBase, GenericTransitionBatch};
use crate::{Env, Step, StepProcessor};
use std::{default::Default, marker::PhantomData};

/// Configuration of [`SimpleStepProcessor`].
#[derive(Clone, Debug, Default)]
pub struct SimpleStepProcessorConfig {}

/// Converts environment steps into single-transition batches.
///
/// The processor keeps the previous observation `o_t` and combines it with
/// each incoming [`Step`] to form the transition `(o_t, a_t, o_t+1, r_t)`
/// as a 1-step TD backup.
pub struct SimpleStepProcessor<E, O, A> {
    prev_obs: Option<O>,
    phantom: PhantomData<(E, A)>,
}

impl<E, O, A> StepProcessor<E> for SimpleStepProcessor<E, O, A>
where
    E: Env,
    O: BatchBase + From<E::Obs>,
    A: BatchBase + From<E::Act>,
{
    type Config = SimpleStepProcessorConfig;
    type Output = GenericTransitionBatch<O, A>;

    fn build(_config: &Self::Config) -> Self {
        Self {
            prev_obs: None,
            phantom: PhantomData,
        }
    }

    fn reset(&mut self, init_obs: E::Obs) {
        self.prev_obs = Some(init_obs.into());
    }

    /// Processes a [`Step`] object.
    ///
    /// # Panics
    ///
    /// Panics if `reset()` has not been called before processing steps, or
    /// if a terminal step does not carry the initial observation of the
    /// next episode.
    fn process(&mut self, step: Step<E>) -> Self::Output {
        let is_done = step.is_done();
        let next_obs = step.obs.clone().into();
        let obs = self
            .prev_obs
            .replace(step.obs.into())
            .expect("prev_obs is not set. Forgot to call reset()?");
        let act = step.act.into();
        let reward = vec![step.reward];
        let is_terminated = vec![step.is_terminated as i8];
        let is_truncated = vec![step.is_truncated as i8];

        if is_done {
            self.prev_obs
                .replace(step.init_obs.expect("Failed to unwrap init_obs").into());
        }

        GenericTransitionBatch {
            obs,
            act,
            next_obs,
            reward,
            is_terminated,
            is_truncated,
        }
    }
}
