use crate::buffer::{Sample, SampleBuffer};
use crate::config::Config;
use crate::error::{FatalReadError, FlushError, ReadError};
use crate::sensor::SensorSource;
use crate::storage::RemovableStorage;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Duration;

/// A failing cycle is retried this many times; the next consecutive
/// failure terminates the process. The counter is scoped to one cycle and
/// resets on every new cycle, so a sensor that fails a few times in every
/// cycle never trips it. Known limitation.
const READ_RETRY_LIMIT: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Drives the whole timeline: sample every read interval, flush every
/// write interval through the removable-storage mount lifecycle.
pub struct Collector {
    sensors: Vec<String>,
    source: Box<dyn SensorSource>,
    storage: RemovableStorage,
    buffer: SampleBuffer,
    output_dir: PathBuf,
    decimal_separator: String,
    read_interval: Duration,
    write_interval: Duration,
    accumulated: Duration,
}

impl Collector {
    pub fn new(
        config: &Config,
        sensors: Vec<String>,
        source: Box<dyn SensorSource>,
        storage: RemovableStorage,
    ) -> Self {
        Self {
            sensors,
            source,
            storage,
            buffer: SampleBuffer::new(),
            output_dir: config.output_directory(),
            decimal_separator: config.decimal_separator.clone(),
            read_interval: config.read_interval(),
            write_interval: config.write_interval(),
            accumulated: Duration::ZERO,
        }
    }

    pub async fn run(&mut self) -> Result<(), FatalReadError> {
        // Normalize against a stick left mounted by a previous run.
        if let Err(err) = self.storage.unmount() {
            tracing::debug!(error = %err, "startup unmount skipped");
        }
        loop {
            let taken_at = self.read_cycle().await?;
            tokio::time::sleep(self.read_interval).await;
            self.tick_flush(taken_at);
        }
    }

    /// One reading per configured sensor, in order, into a fresh vector.
    /// Any failure discards the partial vector and retries the entire
    /// cycle after a short backoff, up to the retry budget.
    async fn read_cycle(&mut self) -> Result<DateTime<Local>, FatalReadError> {
        let taken_at = Local::now();
        let mut failures = 0;
        loop {
            match self.read_all() {
                Ok(readings) => {
                    self.buffer.append(Sample { taken_at, readings });
                    return Ok(taken_at);
                }
                Err(err) => {
                    failures += 1;
                    if failures > READ_RETRY_LIMIT {
                        return Err(FatalReadError {
                            attempts: failures,
                            source: err,
                        });
                    }
                    tracing::warn!(error = %err, attempt = failures, "read cycle failed; retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }

    fn read_all(&self) -> Result<Vec<f64>, ReadError> {
        let mut readings = Vec::with_capacity(self.sensors.len());
        for id in &self.sensors {
            readings.push(self.source.read_temperature(id)?);
        }
        Ok(readings)
    }

    fn tick_flush(&mut self, taken_at: DateTime<Local>) {
        self.accumulated += self.read_interval;
        if self.accumulated < self.write_interval {
            return;
        }
        if let Err(err) = self.flush(taken_at) {
            let oldest = self.buffer.samples().first().map(|sample| sample.taken_at);
            tracing::error!(
                error = %err,
                buffered = self.buffer.len(),
                oldest = ?oldest,
                "flush failed; keeping samples for the next window"
            );
        }
        // A failed flush does not re-arm early; the next attempt waits a
        // full write interval.
        self.accumulated = Duration::ZERO;
    }

    /// mount -> write -> unmount, then clear. The buffer survives any
    /// failure so the next window flushes the backlog too.
    fn flush(&mut self, flush_at: DateTime<Local>) -> Result<(), FlushError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.storage.mount()?;
        let path = self
            .buffer
            .write_to(&self.output_dir, &self.decimal_separator, flush_at)?;
        self.storage.unmount()?;
        tracing::info!(
            file = %path.display(),
            samples = self.buffer.len(),
            "flushed samples to removable storage"
        );
        self.buffer.clear();
        Ok(())
    }
}
