//! Errors in the library.
use thiserror::Error;

/// Errors produced by the core abstractions.
#[derive(Debug, Error)]
pub enum GymkhanaError {
    /// The record does not contain the given key.
    #[error("Key {0} is not in the record")]
    RecordKeyError(String),

    /// The record value for the key has a different type.
    #[error("Record value is not of type {0}")]
    RecordValueTypeError(String),

    /// Sampling was requested before the replay buffer held enough transitions.
    #[error("replay buffer holds {len} transitions, but sampling requires at least {required}")]
    NotEnoughSamples {
        /// Current number of stored transitions.
        len: usize,
        /// Required fill level, the larger of the batch size and the
        /// configured minimum fill.
        required: usize,
    },
}
