//! Generic transition batches.
use crate::TransitionBatch;

/// Basic operations of batched storage for observations or actions.
///
/// A type implementing this trait backs one column of a replay buffer: it
/// owns `capacity` slots, accepts writes at arbitrary indices and extracts
/// sub-batches for the sampled indices.
pub trait BatchBase {
    /// Creates a new storage with the given capacity.
    fn new(capacity: usize) -> Self;

    /// Writes `data` starting at index `ix`, wrapping around at capacity.
    fn push(&mut self, ix: usize, data: Self);

    /// Extracts the samples at the given indices.
    fn sample(&self, ixs: &[usize]) -> Self;
}

/// A transition batch over generic observation and action storages.
pub struct GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Observations `o_t`.
    pub obs: O,

    /// Actions `a_t`.
    pub act: A,

    /// Next observations `o_t+1`.
    pub next_obs: O,

    /// Rewards `r_t`.
    pub reward: Vec<f32>,

    /// Episode termination flags.
    pub is_terminated: Vec<i8>,

    /// Episode truncation flags.
    pub is_truncated: Vec<i8>,
}

impl<O, A> TransitionBatch for GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type ObsBatch = O;
    type ActBatch = A;

    fn unpack(
        self,
    ) -> (
        Self::ObsBatch,
        Self::ActBatch,
        Self::ObsBatch,
        Vec<f32>,
        Vec<i8>,
        Vec<i8>,
    ) {
        (
            self.obs,
            self.act,
            self.next_obs,
            self.reward,
            self.is_terminated,
            self.is_truncated,
        )
    }

    fn len(&self) -> usize {
        self.reward.len()
    }
}
