//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{Env, Policy};
use anyhow::Result;
use std::marker::PhantomData;

/// Runs a fixed number of evaluation episodes and averages their returns.
///
/// Each episode resets the environment through
/// [`Env::reset_with_index`] with the episode's index, so environments
/// that regenerate their layout per episode are evaluated on a
/// reproducible sequence of layouts.
pub struct DefaultEvaluator<E: Env, P: Policy<E>> {
    n_episodes: usize,
    env: E,
    phantom: PhantomData<P>,
}

impl<E: Env, P: Policy<E>> Evaluator<E, P> for DefaultEvaluator<E, P> {
    fn evaluate(&mut self, policy: &mut P) -> Result<f32> {
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;

            loop {
                let act = policy.sample(&prev_obs);
                let (step, _) = self.env.step(&act);
                r_total += step.reward;
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }
        }

        Ok(r_total / self.n_episodes as f32)
    }
}

impl<E: Env, P: Policy<E>> DefaultEvaluator<E, P> {
    /// Constructs a [`DefaultEvaluator`] running `n_episodes` episodes on
    /// the given environment.
    pub fn new(env: E, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env,
            phantom: PhantomData,
        })
    }
}
