//! Experience sampling.
use crate::{
    record::{Record, RecordValue::Scalar},
    Env, ExperienceBufferBase, Policy, StepProcessor,
};
use anyhow::Result;

/// Samples experiences from an environment and pushes them into a replay
/// buffer.
///
/// The sampler drives one interaction step at a time: the policy observes,
/// chooses an action, the environment transitions, and the resulting step
/// is converted into a transition by the step processor. It also tracks
/// per-episode statistics (cumulative reward and length).
pub struct Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    env: E,
    prev_obs: Option<E::Obs>,
    step_processor: P,
    episode_return: f32,
    episode_len: usize,
    n_episodes: usize,
}

impl<E, P> Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    /// Creates a sampler over the given environment and step processor.
    pub fn new(env: E, step_processor: P) -> Self {
        Self {
            env,
            prev_obs: None,
            step_processor,
            episode_return: 0.0,
            episode_len: 0,
            n_episodes: 0,
        }
    }

    /// Returns the number of completed episodes.
    pub fn n_episodes(&self) -> usize {
        self.n_episodes
    }

    /// Samples one transition and pushes it into the replay buffer.
    ///
    /// Returns the record of the step and whether the episode ended with
    /// it. When an episode ends, the record contains the episode's
    /// cumulative reward (`episode_return`), its length (`episode_len`)
    /// and the number of completed episodes (`episode`).
    pub fn sample_and_push<Pi, R>(
        &mut self,
        policy: &mut Pi,
        buffer: &mut R,
    ) -> Result<(Record, bool)>
    where
        Pi: Policy<E>,
        R: ExperienceBufferBase<Item = P::Output>,
    {
        // Reset the environment at the start of the first episode.
        if self.prev_obs.is_none() {
            self.prev_obs = Some(self.env.reset()?);
            self.step_processor
                .reset(self.prev_obs.as_ref().unwrap().clone());
        }

        // Sample an action and apply it to the environment.
        let act = policy.sample(self.prev_obs.as_ref().unwrap());
        let (step, mut record) = self.env.step_with_reset(&act);
        let is_done = step.is_done();

        self.episode_return += step.reward;
        self.episode_len += 1;

        self.prev_obs = match is_done {
            true => Some(step.init_obs.clone().expect("Failed to unwrap init_obs")),
            false => Some(step.obs.clone()),
        };

        let transition = self.step_processor.process(step);
        buffer.push(transition)?;

        if is_done {
            self.n_episodes += 1;
            record.insert("episode", Scalar(self.n_episodes as f32));
            record.insert("episode_return", Scalar(self.episode_return));
            record.insert("episode_len", Scalar(self.episode_len as f32));
            self.episode_return = 0.0;
            self.episode_len = 0;
            self.step_processor
                .reset(self.prev_obs.as_ref().unwrap().clone());
        }

        Ok((record, is_done))
    }
}
