//! Core data structures for the frontal sparse solver.
//!
//! This crate provides the compressed-column sparse matrix consumed by
//! the solver phases, together with the memory-budget context used to
//! account for (and optionally bound) the dense frontal workspace.

pub mod error;
pub mod mem;
pub mod sparse;

pub use error::{Error, Result};
pub use mem::MemoryBudget;
pub use sparse::SparseMatrix;
