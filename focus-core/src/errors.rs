//! FOCUS error types with granular categories, mirroring the per-stage
//! error taxonomy of the pipeline (mapping, demod, worker, I/O).

use thiserror::Error;

/// Top-level error type for all FOCUS operations.
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("demodulation error: {0}")]
    Demod(#[from] DemodError),

    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-time errors: malformed shapes, payload size mismatches,
/// subchannel counts that do not fit in the requested spectrum shape.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid resolution string {input:?}: expected WxH of positive integers")]
    InvalidResolution { input: String },

    #[error(
        "payload has wrong size: expected {expected} bytes ({nsubchannels} subchannels x {per_channel} bytes), got {actual}"
    )]
    PayloadSizeMismatch {
        expected: usize,
        actual: usize,
        nsubchannels: usize,
        per_channel: usize,
    },

    #[error("shape {shape:?} cannot hold {requested} symbols per subchannel x {nsubchannels} subchannels")]
    SpectrumTooSmall {
        shape: (usize, usize),
        nsubchannels: usize,
        requested: usize,
    },
}

/// Errors raised while enumerating usable spectrum cells.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error(
        "mapping tried to set illegal entry u={u} (max_u={max_u}) for shape {shape:?}; are you trying to pack too many symbols?"
    )]
    OutOfRange {
        u: i64,
        max_u: i64,
        shape: (usize, usize),
    },
}

/// QPSK demodulation errors: one of these is always fatal to the whole
/// frame (there is no partial recovery at this layer).
#[derive(Debug, Error)]
pub enum DemodError {
    #[error("symbol stream length {len} is not a multiple of 4 (incomplete byte)")]
    IncompleteByte { len: usize },

    #[error("cannot decode a zero-magnitude QPSK symbol at index {index}")]
    ZeroMagnitude { index: usize },
}

/// Errors surfaced by the in-process worker dispatcher. Per spec.md §7,
/// these are fatal to the whole decode session (dispatch stops).
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker {worker_id} produced a malformed result chunk: {reason}")]
    Framing { worker_id: usize, reason: String },

    #[error("worker {worker_id} disconnected before completing its chunk")]
    Disconnected { worker_id: usize },
}

/// Result type alias for FOCUS operations.
pub type Result<T> = std::result::Result<T, FocusError>;
