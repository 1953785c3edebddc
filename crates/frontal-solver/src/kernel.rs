//! Dense frontal factorization kernel.
//!
//! Eliminates the fully-summed block of one assembled front in place.
//! Row interchanges are confined to the fully-summed rows, so the update
//! rows keep their identity and the symbolic row sets of ancestor fronts
//! stay valid. A fully-summed column whose candidate entries are all
//! zero is not an error here: it is delayed (swapped to the end of the
//! fully-summed block) and left for an ancestor front, where additional
//! contributions make it pivotable. Only a root front can prove a
//! column singular.

use nalgebra::DMatrix;

use crate::control::Strategy;

/// Name of the dense linear algebra backend, reported through the
/// statistics surface.
pub(crate) const BLAS_BACKEND: &str = "nalgebra";

/// Outcome of eliminating one front.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrontElimination {
    /// Number of pivots actually eliminated. Anything short of the
    /// fully-summed count means the trailing columns were delayed.
    pub(crate) eliminated: usize,
    /// Floating point operation count.
    pub(crate) flops: f64,
}

/// Factor the leading `fully_summed` columns of `f` in place with
/// threshold partial pivoting, candidates restricted to the
/// fully-summed rows.
///
/// On return the first `eliminated` columns hold the unit-lower
/// multipliers below the diagonal and U on and above it; the trailing
/// square holds the Schur complement, with any delayed pivot rows and
/// columns swapped to its leading positions. `rows` and `cols` are
/// permuted alongside the row/column interchanges so `rows[i]`/`cols[j]`
/// always name the matrix row/column stored locally at `i`/`j`.
///
/// Under the symmetric strategy the structural diagonal entry is
/// preferred whenever it is within `diag_tol` of the column maximum.
pub(crate) fn factor_front(
    f: &mut DMatrix<f64>,
    rows: &mut [usize],
    cols: &mut [usize],
    fully_summed: usize,
    strategy: Strategy,
    pivot_tol: f64,
    diag_tol: f64,
) -> FrontElimination {
    let m = f.nrows();
    debug_assert_eq!(m, f.ncols());
    debug_assert_eq!(m, rows.len());
    debug_assert_eq!(m, cols.len());
    debug_assert!(fully_summed <= m);

    let p = fully_summed;
    let mut active = p;
    let mut flops = 0.0f64;
    let mut k = 0;
    while k < active {
        // Column maximum over the candidate (uneliminated fully summed)
        // rows.
        let mut colmax = 0.0f64;
        let mut argmax = k;
        for i in k..p {
            let v = f[(i, k)].abs();
            if v > colmax {
                colmax = v;
                argmax = i;
            }
        }
        if colmax == 0.0 {
            // Delay this column to the end of the fully-summed block;
            // the swapped-in column is retried at the same position.
            active -= 1;
            if k != active {
                f.swap_columns(k, active);
                cols.swap(k, active);
            }
            continue;
        }

        let piv = match strategy {
            Strategy::Symmetric => {
                // Prefer the structural diagonal row when it is large
                // enough, falling back to threshold pivoting.
                let diag_row = rows[k..p]
                    .iter()
                    .position(|&r| r == cols[k])
                    .map(|pos| pos + k);
                match diag_row {
                    Some(d) if f[(d, k)].abs() >= diag_tol * colmax => d,
                    _ => threshold_pivot(f, k, p, colmax, pivot_tol, argmax),
                }
            }
            _ => threshold_pivot(f, k, p, colmax, pivot_tol, argmax),
        };

        if piv != k {
            f.swap_rows(piv, k);
            rows.swap(piv, k);
        }

        let pivot = f[(k, k)];
        for i in k + 1..m {
            f[(i, k)] /= pivot;
        }

        // Rank-1 trailing update.
        let trailing = m - k - 1;
        if trailing > 0 {
            let l = f.view_range(k + 1..m, k..k + 1).clone_owned();
            let u = f.view_range(k..k + 1, k + 1..m).clone_owned();
            f.view_range_mut(k + 1..m, k + 1..m).gemm(-1.0, &l, &u, 1.0);
            flops += trailing as f64 + 2.0 * (trailing * trailing) as f64;
        }
        k += 1;
    }
    FrontElimination {
        eliminated: active,
        flops,
    }
}

/// Lowest-index fully-summed row whose magnitude reaches the threshold.
fn threshold_pivot(
    f: &DMatrix<f64>,
    k: usize,
    fully_summed: usize,
    colmax: f64,
    pivot_tol: f64,
    argmax: usize,
) -> usize {
    let cutoff = pivot_tol * colmax;
    for i in k..fully_summed {
        if f[(i, k)].abs() >= cutoff {
            return i;
        }
    }
    argmax
}
