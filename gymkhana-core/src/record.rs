//! Types for recording values obtained during training and evaluation.
//!
//! A [`Record`] is a map from string keys to [`RecordValue`]s produced in a
//! training or evaluation step. Records are handed to a [`Recorder`], which
//! aggregates and writes them to an output destination.
mod base;
mod csv_recorder;
mod recorder;
pub use base::{Record, RecordValue};
pub use csv_recorder::CsvRecorder;
pub use recorder::{NullRecorder, Recorder};
