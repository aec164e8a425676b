// THEORY:
// Every precondition the engine refuses to work around is named here. Degenerate
// geometry (empty point sets, zero-length hull edges, isolated pixels) is NOT an
// error: those cases produce empty descriptors further down the chain. Only
// malformed buffers, bad configuration and failed worker tasks reach the caller
// as a `GeometryError`.

use thiserror::Error;

/// Errors reported by the hand geometry engine.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("raster has zero width or height ({width}x{height})")]
    ZeroSized { width: u32, height: u32 },

    #[error("unsupported channel depth {0}, expected 3 or 4")]
    UnsupportedDepth(u8),

    #[error("row stride {stride} is smaller than width x depth ({minimum})")]
    InvalidStride { stride: usize, minimum: usize },

    #[error("buffer length {len} is not divisible by row stride {stride}")]
    LengthNotDivisible { len: usize, stride: usize },

    #[error("size mismatch: expected {expected} rows, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load config {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for GeometryError {
    fn from(err: tokio::task::JoinError) -> Self {
        GeometryError::Worker(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeometryError>;
