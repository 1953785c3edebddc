//! Error types for frontal-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("matrix must be square: {nrows} x {ncols}")]
    NotSquare { nrows: usize, ncols: usize },

    #[error("invalid matrix structure: {0}")]
    InvalidStructure(String),

    #[error("row index {row} out of range for dimension {n}")]
    RowOutOfRange { row: usize, n: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("memory budget exceeded: {requested} bytes requested, {limit} byte limit")]
    OutOfMemory { requested: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
