use crate::error::WriteError;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const FILE_PREFIX: &str = "mittaus_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed read cycle: a wall-clock instant and one reading per
/// configured sensor, in configured order. A partial cycle never becomes
/// a sample.
#[derive(Debug, Clone)]
pub struct Sample {
    pub taken_at: DateTime<Local>,
    pub readings: Vec<f64>,
}

/// Insertion-ordered in-memory sample store, owned by the collector.
/// Cleared in one step after a successful flush, never partially.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Appends every buffered sample to the day file named for `flush_at`.
    /// All samples in one flush window land in that file, even ones taken
    /// just before local midnight. The buffer itself is left untouched;
    /// the caller clears it once the whole flush sequence has succeeded.
    pub fn write_to(
        &self,
        dir: &Path,
        decimal_separator: &str,
        flush_at: DateTime<Local>,
    ) -> Result<PathBuf, WriteError> {
        fs::create_dir_all(dir).map_err(|source| WriteError {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(format!("{FILE_PREFIX}{}.txt", flush_at.format("%Y-%m-%d")));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| WriteError {
                path: path.clone(),
                source,
            })?;
        for sample in &self.samples {
            file.write_all(format_line(sample, decimal_separator).as_bytes())
                .map_err(|source| WriteError {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(path)
    }
}

fn format_line(sample: &Sample, decimal_separator: &str) -> String {
    // Debug formatting keeps a trailing .0 on integral values, matching the
    // historical output files. The separator substitution applies to the
    // readings only, never the timestamp.
    let readings = sample
        .readings
        .iter()
        .map(|value| format!("{value:?}"))
        .collect::<Vec<_>>()
        .join("\t")
        .replace('.', decimal_separator);
    format!(
        "{}\t{}\r\n",
        sample.taken_at.format(TIMESTAMP_FORMAT),
        readings
    )
}
