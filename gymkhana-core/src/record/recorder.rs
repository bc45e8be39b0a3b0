//! Recorder interface.
use super::Record;

/// Writes records to an output destination.
///
/// Records can either be written directly with [`Recorder::write`] or
/// buffered with [`Recorder::store`] and written in aggregated form by
/// [`Recorder::flush`].
pub trait Recorder {
    /// Writes a record immediately.
    fn write(&mut self, record: Record);

    /// Stores a record for later aggregation.
    fn store(&mut self, record: Record);

    /// Writes values aggregated from the stored records, tagged with the
    /// given step.
    fn flush(&mut self, step: i64);
}

/// A recorder that discards every record.
pub struct NullRecorder {}

impl Recorder for NullRecorder {
    fn write(&mut self, _record: Record) {}

    fn store(&mut self, _record: Record) {}

    fn flush(&mut self, _step: i64) {}
}
