//! A generic implementation of replay buffers.
//!
//! [`SimpleReplayBuffer`] stores transitions of arbitrary observation and
//! action types behind [`BatchBase`] and samples uniformly at random.
mod base;
mod batch;
mod config;
mod step_proc;
pub use base::SimpleReplayBuffer;
pub use batch::{BatchBase, GenericTransitionBatch};
pub use config::SimpleReplayBufferConfig;
pub use step_proc::{SimpleStepProcessor, SimpleStepProcessorConfig};
