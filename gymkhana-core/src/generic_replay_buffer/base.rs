//! Generic replay buffer with uniform sampling.
use super::{BatchBase, GenericTransitionBatch, SimpleReplayBufferConfig};
use crate::{error::GymkhanaError, ExperienceBufferBase, ReplayBufferBase, TransitionBatch};
use anyhow::Result;
use rand::{rngs::StdRng, seq::index::sample, SeedableRng};

/// A generic replay buffer over [`BatchBase`] storages.
///
/// Transitions are stored in a circular buffer of fixed capacity; the
/// oldest transitions are overwritten when the buffer is full. Batches are
/// drawn uniformly at random without replacement within a call.
pub struct SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    capacity: usize,

    /// Current insertion index.
    i: usize,

    /// Current number of stored transitions.
    size: usize,

    min_fill: usize,
    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    is_terminated: Vec<i8>,
    is_truncated: Vec<i8>,
    rng: StdRng,
}

impl<O, A> SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    #[inline]
    fn push_scalar<T: Copy>(col: &mut [T], capacity: usize, i: usize, b: &[T]) {
        let mut j = i;
        for v in b.iter() {
            col[j] = *v;
            j += 1;
            if j == capacity {
                j = 0;
            }
        }
    }

    fn sample_reward(&self, ixs: &[usize]) -> Vec<f32> {
        ixs.iter().map(|ix| self.reward[*ix]).collect()
    }

    fn sample_is_terminated(&self, ixs: &[usize]) -> Vec<i8> {
        ixs.iter().map(|ix| self.is_terminated[*ix]).collect()
    }

    fn sample_is_truncated(&self, ixs: &[usize]) -> Vec<i8> {
        ixs.iter().map(|ix| self.is_truncated[*ix]).collect()
    }

    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.reward.iter().sum()
    }
}

impl<O, A> ExperienceBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = GenericTransitionBatch<O, A>;

    fn len(&self) -> usize {
        self.size
    }

    /// Adds the transitions in `tr` to the buffer, evicting the oldest
    /// entries when the buffer is at capacity. Amortized O(1) per
    /// transition.
    fn push(&mut self, tr: Self::Item) -> Result<()> {
        let len = tr.len();
        let (obs, act, next_obs, reward, is_terminated, is_truncated) = tr.unpack();
        self.obs.push(self.i, obs);
        self.act.push(self.i, act);
        self.next_obs.push(self.i, next_obs);
        Self::push_scalar(&mut self.reward, self.capacity, self.i, &reward);
        Self::push_scalar(&mut self.is_terminated, self.capacity, self.i, &is_terminated);
        Self::push_scalar(&mut self.is_truncated, self.capacity, self.i, &is_truncated);

        self.i = (self.i + len) % self.capacity;
        self.size += len;
        if self.size >= self.capacity {
            self.size = self.capacity;
        }

        Ok(())
    }
}

impl<O, A> ReplayBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = SimpleReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Self {
        let capacity = config.capacity;
        Self {
            capacity,
            i: 0,
            size: 0,
            min_fill: config.min_fill,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0.; capacity],
            is_terminated: vec![0; capacity],
            is_truncated: vec![0; capacity],
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Samples a batch of transitions uniformly at random, without
    /// replacement within the call.
    ///
    /// Fails with [`GymkhanaError::NotEnoughSamples`] when the buffer holds
    /// fewer transitions than the larger of `size` and the configured
    /// minimum fill level.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let required = size.max(self.min_fill);
        if self.size < required {
            return Err(GymkhanaError::NotEnoughSamples {
                len: self.size,
                required,
            }
            .into());
        }

        let ixs = sample(&mut self.rng, self.size, size).into_vec();

        Ok(Self::Batch {
            obs: self.obs.sample(&ixs),
            act: self.act.sample(&ixs),
            next_obs: self.next_obs.sample(&ixs),
            reward: self.sample_reward(&ixs),
            is_terminated: self.sample_is_terminated(&ixs),
            is_truncated: self.sample_is_truncated(&ixs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One-f32-per-transition storage, enough to track item identity.
    struct VecBatch(Vec<f32>);

    impl BatchBase for VecBatch {
        fn new(capacity: usize) -> Self {
            Self(vec![0.; capacity])
        }

        fn push(&mut self, ix: usize, data: Self) {
            let capacity = self.0.len();
            let mut j = ix;
            for v in data.0 {
                self.0[j] = v;
                j += 1;
                if j == capacity {
                    j = 0;
                }
            }
        }

        fn sample(&self, ixs: &[usize]) -> Self {
            Self(ixs.iter().map(|ix| self.0[*ix]).collect())
        }
    }

    fn marker(v: f32) -> GenericTransitionBatch<VecBatch, VecBatch> {
        GenericTransitionBatch {
            obs: VecBatch(vec![v]),
            act: VecBatch(vec![v]),
            next_obs: VecBatch(vec![v]),
            reward: vec![v],
            is_terminated: vec![0],
            is_truncated: vec![0],
        }
    }

    fn build(capacity: usize, min_fill: usize) -> SimpleReplayBuffer<VecBatch, VecBatch> {
        let config = SimpleReplayBufferConfig::default()
            .capacity(capacity)
            .min_fill(min_fill);
        SimpleReplayBuffer::build(&config)
    }

    #[test]
    fn len_never_exceeds_capacity() {
        let mut buffer = build(100, 1);
        for i in 0..250 {
            buffer.push(marker(i as f32)).unwrap();
            assert!(buffer.len() <= 100);
        }
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn oldest_transitions_are_evicted() {
        // Push 150 monotonically increasing markers into a capacity-100
        // buffer; the first 50 must never come back out.
        let mut buffer = build(100, 1);
        for i in 0..150 {
            buffer.push(marker(i as f32)).unwrap();
        }
        for _ in 0..20 {
            let batch = buffer.batch(10).unwrap();
            for r in batch.reward {
                assert!(r >= 50.0, "evicted marker {} was sampled", r);
            }
        }
    }

    #[test]
    fn sampling_below_min_fill_is_rejected() {
        let mut buffer = build(100, 32);
        for i in 0..31 {
            buffer.push(marker(i as f32)).unwrap();
        }
        assert!(buffer.batch(8).is_err());
        buffer.push(marker(31.0)).unwrap();
        assert!(buffer.batch(8).is_ok());
    }

    #[test]
    fn batch_larger_than_size_is_rejected() {
        let mut buffer = build(100, 1);
        for i in 0..10 {
            buffer.push(marker(i as f32)).unwrap();
        }
        assert!(buffer.batch(11).is_err());
    }

    #[test]
    fn sampling_is_without_replacement() {
        let mut buffer = build(100, 1);
        for i in 0..100 {
            buffer.push(marker(i as f32)).unwrap();
        }
        for _ in 0..10 {
            let mut rewards = buffer.batch(100).unwrap().reward;
            rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
            rewards.dedup();
            assert_eq!(rewards.len(), 100);
        }
    }
}
