//! Error types for frontal-solver.
//!
//! Every public operation returns a `Result` from this taxonomy; no
//! phase panics past its own boundary, and every error path drops all
//! partially-built state before returning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input matrix or permutation; nothing was allocated
    /// beyond validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration setter rejected the value; the Control object is
    /// unchanged.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// The memory budget was exceeded; all partial state for the
    /// failing call has been released.
    #[error("memory budget exceeded: {requested} bytes requested, {limit} byte limit")]
    OutOfMemory { requested: usize, limit: usize },

    /// A pivot column stayed zero all the way to its root front; no
    /// Numeric object is produced, and the Symbolic analysis remains
    /// valid for a retry.
    #[error("matrix is numerically singular at column {col}")]
    NumericallySingular { col: usize },

    /// Right-hand side or output buffer shape does not match the system.
    #[error("dimension mismatch: expected {expected} rows, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The Numeric factors were produced from a different Symbolic
    /// analysis than the one supplied.
    #[error("numeric factors do not correspond to the given symbolic analysis")]
    InvalidState,

    /// A statistic that requires numeric factorization was requested
    /// before one was available.
    #[error("statistic not available before numeric factorization")]
    NotAvailable,
}

impl From<frontal_core::Error> for Error {
    fn from(err: frontal_core::Error) -> Self {
        use frontal_core::Error as Core;
        match err {
            Core::NotSquare { .. } | Core::InvalidStructure(_) | Core::RowOutOfRange { .. } => {
                Error::InvalidInput(err.to_string())
            }
            Core::DimensionMismatch { expected, actual } => {
                Error::DimensionMismatch { expected, actual }
            }
            Core::OutOfMemory { requested, limit } => Error::OutOfMemory { requested, limit },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
