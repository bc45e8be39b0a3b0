//! Evaluate a policy.
use crate::{Env, Policy};
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::DefaultEvaluator;

/// Evaluates a policy.
pub trait Evaluator<E: Env, P: Policy<E>> {
    /// Runs evaluation episodes and returns the average episode return.
    ///
    /// The caller of this method is responsible for the internal state of
    /// `policy`, such as switching it to evaluation mode.
    fn evaluate(&mut self, policy: &mut P) -> Result<f32>;
}
