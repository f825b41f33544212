use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A single sensor read that did not produce a usable temperature.
/// Transient: the collector retries the whole read cycle with a bound.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("sensor {sensor}: failed to read status text: {source}")]
    Unreadable {
        sensor: String,
        #[source]
        source: io::Error,
    },

    #[error("sensor {sensor}: no t= field in status text:\n{raw}")]
    Malformed { sensor: String, raw: String },
}

/// Mount-table query or mount/umount command failure for the removable device.
#[derive(Debug, Error)]
#[error("{op} failed for {device}: {detail}")]
pub struct MountError {
    pub op: &'static str,
    pub device: String,
    pub detail: String,
}

/// File-side failure while appending buffered samples to the output file.
#[derive(Debug, Error)]
#[error("failed to write samples to {}: {source}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Anything that can go wrong inside one mount -> write -> unmount sequence.
/// Never escalates past the collector loop; the buffer is kept for the next
/// window instead.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// A read cycle that kept failing past the retry budget. This is the only
/// error that terminates the process.
#[derive(Debug, Error)]
#[error("sensor read still failing after {attempts} attempts: {source}")]
pub struct FatalReadError {
    pub attempts: u32,
    #[source]
    pub source: ReadError,
}
