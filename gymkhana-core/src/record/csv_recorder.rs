//! CSV recorder.
use super::{Record, RecordValue, Recorder};
use anyhow::Result;
use std::{collections::BTreeMap, fs::File, path::Path};

/// Writes records to a CSV file in long format (`step,key,value`).
///
/// Stored records are aggregated on [`flush`](Recorder::flush): scalar
/// values sharing a key are averaged over the flush interval, other value
/// types are written as-is from the latest record.
pub struct CsvRecorder {
    wtr: csv::Writer<File>,
    buf: Vec<Record>,
}

impl CsvRecorder {
    /// Constructs a [`CsvRecorder`] writing to the file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["step", "key", "value"])?;
        Ok(Self {
            wtr,
            buf: Vec::new(),
        })
    }

    fn write_row(&mut self, step: i64, key: &str, value: String) {
        let step = step.to_string();
        // A failed metric row should not abort training.
        if let Err(e) = self.wtr.write_record([step.as_str(), key, value.as_str()]) {
            log::warn!("Failed to write CSV record: {}", e);
        }
    }
}

impl Recorder for CsvRecorder {
    fn write(&mut self, record: Record) {
        self.store(record);
        self.flush(-1);
    }

    fn store(&mut self, record: Record) {
        self.buf.push(record);
    }

    fn flush(&mut self, step: i64) {
        let mut sums: BTreeMap<String, (f32, usize)> = BTreeMap::new();
        let mut others: BTreeMap<String, String> = BTreeMap::new();

        for record in self.buf.drain(..).collect::<Vec<_>>() {
            for (k, v) in record.iter() {
                match v {
                    RecordValue::Scalar(x) => {
                        let e = sums.entry(k.clone()).or_insert((0.0, 0));
                        e.0 += x;
                        e.1 += 1;
                    }
                    RecordValue::String(s) => {
                        others.insert(k.clone(), s.clone());
                    }
                    RecordValue::Array1(xs) => {
                        let s = xs
                            .iter()
                            .map(|x| x.to_string())
                            .collect::<Vec<_>>()
                            .join(";");
                        others.insert(k.clone(), s);
                    }
                }
            }
        }

        for (k, (sum, n)) in sums {
            self.write_row(step, &k, (sum / n as f32).to_string());
        }
        for (k, v) in others {
            self.write_row(step, &k, v);
        }
        if let Err(e) = self.wtr.flush() {
            log::warn!("Failed to flush CSV records: {}", e);
        }
    }
}
