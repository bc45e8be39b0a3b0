#![warn(missing_docs)]
//! Core abstractions for value-based reinforcement learning.
//!
//! This crate defines the contracts between an environment, an agent and a
//! replay buffer, together with a generic uniform replay buffer, a
//! step-synchronous training loop and a small record/recorder substrate for
//! metrics. It is independent of any tensor backend; agents implemented on
//! top of it live in separate crates.
pub mod error;
pub mod generic_replay_buffer;
pub mod record;

mod base;
pub use base::{
    Act, Agent, Configurable, Env, ExperienceBufferBase, Info, Obs, Policy, ReplayBufferBase,
    Step, StepProcessor, TransitionBatch,
};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{Sampler, Trainer, TrainerConfig};
