//! Train [`Agent`].
mod config;
mod sampler;
use crate::{
    record::{Recorder, RecordValue::Scalar},
    Agent, Env, Evaluator, ExperienceBufferBase, ReplayBufferBase, StepProcessor,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::info;
pub use sampler::Sampler;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Manages the training loop.
///
/// The loop is single-threaded and step-synchronous: one environment step
/// fully completes before the next action is chosen, and optimization steps
/// run sequentially with sampling in the same control flow.
///
/// 1. Sample one transition with [`Sampler`] and push it into the replay
///    buffer.
/// 2. When an episode ends, invoke [`Agent::on_episode_end`] (exploration
///    decay, target synchronization) and record the episode's cumulative
///    reward and length.
/// 3. Past the warmup period, every `opt_interval` environment steps,
///    perform an optimization step. The agent may still skip it while the
///    replay buffer has not reached the agent's own warmup fill.
/// 4. Every `eval_interval` optimization steps, evaluate the agent and
///    save the best model so far; every `save_interval` optimization
///    steps, save a numbered snapshot.
/// 5. Stop at `max_opts` optimization steps, or at `max_episodes`
///    completed episodes when that bound is set.
pub struct Trainer {
    max_opts: usize,
    max_episodes: Option<usize>,
    opt_interval: usize,
    eval_interval: usize,
    flush_record_interval: usize,
    warmup_period: usize,
    save_interval: usize,
    model_dir: Option<String>,
    stop: Option<Arc<AtomicBool>>,
}

impl Trainer {
    /// Constructs a trainer from its configuration.
    pub fn build(config: TrainerConfig) -> Self {
        Self {
            max_opts: config.max_opts,
            max_episodes: config.max_episodes,
            opt_interval: config.opt_interval,
            eval_interval: config.eval_interval,
            flush_record_interval: config.flush_record_interval,
            warmup_period: config.warmup_period,
            save_interval: config.save_interval,
            model_dir: config.model_dir,
            stop: None,
        }
    }

    /// Installs a stop flag, checked once between steps.
    ///
    /// Cancellation is cooperative: a requested stop ends the loop at the
    /// next step boundary, so no in-flight operation needs rollback. The
    /// caller typically sets the flag from a signal handler.
    pub fn stop_signal(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    fn save_model<E, A, R>(agent: &A, model_dir: &str)
    where
        E: Env,
        A: Agent<E, R>,
        R: ReplayBufferBase,
    {
        match agent.save_params(model_dir.as_ref()) {
            Ok(()) => info!("Saved the model in {:?}", model_dir),
            Err(e) => info!("Failed to save model in {:?}: {}", model_dir, e),
        }
    }

    /// Trains the agent.
    pub fn train<E, P, A, R, D>(
        &mut self,
        env: E,
        step_proc: P,
        agent: &mut A,
        buffer: &mut R,
        recorder: &mut dyn Recorder,
        evaluator: &mut D,
    ) -> Result<()>
    where
        E: Env,
        P: StepProcessor<E>,
        A: Agent<E, R>,
        R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
        D: Evaluator<E, A>,
    {
        let mut sampler = Sampler::new(env, step_proc);
        let mut max_eval_reward = f32::MIN;
        let mut env_steps: usize = 0;
        let mut opt_steps: usize = 0;
        agent.train();

        loop {
            if let Some(stop) = &self.stop {
                if stop.load(Ordering::Relaxed) {
                    info!("Stop requested; ending the training loop");
                    break;
                }
            }

            let (mut record, is_done) = sampler.sample_and_push(agent, buffer)?;
            env_steps += 1;

            if is_done {
                record = record.merge(agent.on_episode_end());
                info!(
                    "Episode {} finished: return = {:.1}, length = {}",
                    sampler.n_episodes(),
                    record.get_scalar("episode_return")?,
                    record.get_scalar("episode_len")? as usize,
                );
            }

            // Optimization step.
            let is_opt = env_steps >= self.warmup_period && env_steps % self.opt_interval == 0;
            if is_opt {
                if let Some(record_agent) = agent.opt(buffer) {
                    opt_steps += 1;
                    record = record.merge(record_agent);

                    if opt_steps % self.eval_interval == 0 {
                        info!("Starts evaluation of the trained model");
                        agent.eval();
                        let eval_reward = evaluator.evaluate(agent)?;
                        agent.train();
                        record.insert("eval_reward", Scalar(eval_reward));

                        // Save the best model up to the current iteration.
                        if eval_reward > max_eval_reward {
                            max_eval_reward = eval_reward;
                            if let Some(model_dir) = &self.model_dir {
                                Self::save_model::<E, A, R>(agent, &format!("{}/best", model_dir));
                            }
                        }
                    }

                    if opt_steps % self.save_interval == 0 {
                        if let Some(model_dir) = &self.model_dir {
                            Self::save_model::<E, A, R>(agent, &format!("{}/{}", model_dir, opt_steps));
                        }
                    }

                    if opt_steps % self.flush_record_interval == 0 {
                        recorder.flush(opt_steps as _);
                    }
                }
            }

            if !record.is_empty() {
                recorder.store(record);
            }

            if self.max_opts > 0 && opt_steps >= self.max_opts {
                break;
            }
            if let Some(max_episodes) = self.max_episodes {
                if is_done && sampler.n_episodes() >= max_episodes {
                    break;
                }
            }
        }

        recorder.flush(opt_steps as _);

        if let Some(model_dir) = &self.model_dir {
            Self::save_model::<E, A, R>(agent, &format!("{}/final", model_dir));
        }

        Ok(())
    }
}
