//! Parallel multifrontal sparse LU factorization.
//!
//! The solver runs in three phases over a square matrix in
//! compressed-column form:
//!
//! 1. [`analyze`] inspects the pattern only and builds a [`Symbolic`]
//!    object: fill-reducing permutation, elimination tree, and the
//!    frontal tree with amalgamated supernodes.
//! 2. [`factorize`] assembles and eliminates the fronts, producing a
//!    [`Numeric`] object with the LU factors. Independent subtrees are
//!    factored in parallel on the rayon pool when the tree is large
//!    enough; results are bit-identical to the sequential schedule.
//! 3. [`solve`] performs the triangular solves for one or more dense
//!    right-hand sides.
//!
//! One `Symbolic` can back many `factorize` calls for matrices sharing
//! a pattern, and one `Numeric` many `solve` calls. Both are ordinary
//! owned values released by `Drop`; a `Numeric` remembers which
//! analysis produced it, and the solve and statistics entry points
//! reject mismatched pairs with [`Error::InvalidState`].
//!
//! ```
//! use frontal_solver::{analyze, factorize, solve, Control, SparseMatrix};
//! use nalgebra::DMatrix;
//!
//! let a = SparseMatrix::from_triplets(
//!     2,
//!     &[(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)],
//! )?;
//! let control = Control::default();
//! let symbolic = analyze(&a, &control)?;
//! let numeric = factorize(&a, &symbolic, &control)?;
//!
//! let b = DMatrix::from_column_slice(2, 1, &[9.0, 10.0]);
//! let x = solve(&symbolic, &numeric, &b)?;
//! assert!((a.mul_dense(&x).unwrap() - &b).amax() < 1e-12);
//! # Ok::<(), frontal_solver::Error>(())
//! ```

pub mod control;
pub mod error;
mod etree;
mod kernel;
pub mod numeric;
pub mod ordering;
pub mod solve;
pub mod stats;
pub mod symbolic;

pub use control::{
    Control, OrderingChoice, Prescale, Strategy, DEFAULT_DIAG_PIVOT_TOLERANCE,
    DEFAULT_PIVOT_TOLERANCE, DEFAULT_RELAXATION,
};
pub use error::{Error, Result};
pub use numeric::{factorize, FactorStats, Numeric, SchedulingMode};
pub use ordering::FillReducingOrderer;
pub use solve::{solve, solve_into};
pub use stats::{stat, Metric, StatValue};
pub use symbolic::{analyze, Front, Symbolic};

pub use frontal_core::{MemoryBudget, SparseMatrix};
