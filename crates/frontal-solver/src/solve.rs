//! Forward/backward substitution through the frontal factors.
//!
//! The lower solve walks fronts leaf to root, applying each front's
//! unit-lower columns; the upper solve walks root to leaf. Row scaling
//! and both permutations are applied here, so callers work entirely in
//! original row/column labels.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::numeric::Numeric;
use crate::symbolic::Symbolic;

/// Solve `A * X = B` for a dense right-hand-side block.
///
/// `numeric` must have been factored from the same analysis object as
/// `symbolic`; passing factors from a different analysis fails with
/// `InvalidState`.
pub fn solve(symbolic: &Symbolic, numeric: &Numeric, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let mut x = DMatrix::zeros(b.nrows(), b.ncols());
    solve_into(symbolic, numeric, b, &mut x)?;
    Ok(x)
}

/// Solve `A * X = B` into a caller-provided output block.
///
/// `x` must have the same shape as `b`; `b` and `x` may not alias.
pub fn solve_into(
    symbolic: &Symbolic,
    numeric: &Numeric,
    b: &DMatrix<f64>,
    x: &mut DMatrix<f64>,
) -> Result<()> {
    if numeric.symbolic_id() != symbolic.id() {
        return Err(Error::InvalidState);
    }
    let n = symbolic.n();
    if b.nrows() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: b.nrows(),
        });
    }
    if x.nrows() != n || x.ncols() != b.ncols() {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: x.nrows(),
        });
    }
    let nrhs = b.ncols();
    if n == 0 {
        return Ok(());
    }

    // Scaled, row-permuted right-hand side: slot k holds the entry for
    // the row eliminated at step k.
    let mut y = DMatrix::<f64>::zeros(n, nrhs);
    for k in 0..n {
        let orig = symbolic.perm()[numeric.row_perm[k]];
        let scale = match &numeric.row_scale {
            Some(s) => s[orig],
            None => 1.0,
        };
        for r in 0..nrhs {
            y[(k, r)] = b[(orig, r)] / scale;
        }
    }

    // Lower solve, leaf to root. Fronts are stored children before
    // parents and every L column only reaches rows eliminated later,
    // so this is forward substitution in elimination order.
    for factor in &numeric.fronts {
        let m = factor.rows.len();
        let q = factor.l.ncols();
        let slots: Vec<usize> = factor.rows.iter().map(|&r| numeric.slot_of[r]).collect();
        for k in 0..q {
            for r in 0..nrhs {
                let yk = y[(slots[k], r)];
                if yk == 0.0 {
                    continue;
                }
                for i in k + 1..m {
                    y[(slots[i], r)] -= factor.l[(i, k)] * yk;
                }
            }
        }
    }

    // Upper solve, root to leaf, in permuted column labels. The realized
    // column list names each front's columns; delayed columns were
    // eliminated in an ancestor, which the reverse walk has already
    // visited.
    let mut z = DMatrix::<f64>::zeros(n, nrhs);
    for factor in numeric.fronts.iter().rev() {
        let m = factor.cols.len();
        let q = factor.u.nrows();
        for k in (0..q).rev() {
            let diag = factor.u[(k, k)];
            let slot = numeric.slot_of[factor.rows[k]];
            for r in 0..nrhs {
                let mut acc = y[(slot, r)];
                for c in k + 1..m {
                    acc -= factor.u[(k, c)] * z[(factor.cols[c], r)];
                }
                z[(factor.cols[k], r)] = acc / diag;
            }
        }
    }

    // Undo the column permutation.
    for pj in 0..n {
        let orig = symbolic.perm()[pj];
        for r in 0..nrhs {
            x[(orig, r)] = z[(pj, r)];
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Control, OrderingChoice, Prescale};
    use crate::numeric::factorize;
    use crate::symbolic::analyze;
    use frontal_core::SparseMatrix;

    fn tridiagonal(n: usize) -> SparseMatrix {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
            }
        }
        SparseMatrix::from_triplets(n, &triplets).unwrap()
    }

    fn residual(a: &SparseMatrix, x: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
        (a.mul_dense(x).unwrap() - b).amax()
    }

    #[test]
    fn solves_identity() {
        let a = SparseMatrix::identity(4);
        let control = Control::default();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let b = DMatrix::from_column_slice(4, 1, &[1.0, -2.0, 3.0, -4.0]);
        let x = solve(&symbolic, &numeric, &b).unwrap();
        assert!((&x - &b).amax() < 1e-15);
    }

    #[test]
    fn solves_tridiagonal_against_known_solution() {
        let a = tridiagonal(10);
        let control = Control::default();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let x_true = DMatrix::from_fn(10, 1, |i, _| (i as f64) - 4.5);
        let b = a.mul_dense(&x_true).unwrap();
        let x = solve(&symbolic, &numeric, &b).unwrap();
        assert!((&x - &x_true).amax() < 1e-12);
        assert!(residual(&a, &x, &b) < 1e-12);
    }

    #[test]
    fn solves_multiple_right_hand_sides() {
        let a = tridiagonal(7);
        let control = Control::default();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let x_true = DMatrix::from_fn(7, 3, |i, j| (i * 3 + j) as f64 - 5.0);
        let b = a.mul_dense(&x_true).unwrap();
        let x = solve(&symbolic, &numeric, &b).unwrap();
        assert!((&x - &x_true).amax() < 1e-12);
    }

    #[test]
    fn unsymmetric_matrix_with_pivoting() {
        // Small diagonal entry forces a row interchange.
        let a = SparseMatrix::from_triplets(
            3,
            &[
                (0, 0, 1e-8),
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 1, 1.0),
                (1, 2, 1.0),
                (2, 1, 1.0),
                (2, 2, 3.0),
            ],
        )
        .unwrap();
        let mut control = Control::default();
        control.set_ordering(OrderingChoice::Natural).unwrap();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let x_true = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
        let b = a.mul_dense(&x_true).unwrap();
        let x = solve(&symbolic, &numeric, &b).unwrap();
        assert!((&x - &x_true).amax() < 1e-6);
    }

    #[test]
    fn delayed_pivots_solve_zero_diagonal_columns() {
        // Column 0 is structurally zero on the diagonal and its only
        // coupling arrives through column 2, so its front delays the
        // pivot upward. The matrix itself is nonsingular.
        let a = SparseMatrix::from_triplets(
            4,
            &[
                (0, 2, 1.0),
                (2, 0, 1.0),
                (1, 1, 2.0),
                (2, 3, 1.0),
                (3, 2, 1.0),
                (3, 3, 3.0),
            ],
        )
        .unwrap();
        let mut control = Control::default();
        control.set_ordering(OrderingChoice::Natural).unwrap();
        control.set_relaxation(0).unwrap();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let x_true = DMatrix::from_column_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let b = a.mul_dense(&x_true).unwrap();
        let x = solve(&symbolic, &numeric, &b).unwrap();
        assert!((&x - &x_true).amax() < 1e-12);
    }

    #[test]
    fn prescaling_is_transparent_to_callers() {
        let a = SparseMatrix::from_triplets(
            3,
            &[
                (0, 0, 1e6),
                (0, 1, 2e6),
                (1, 0, 1.0),
                (1, 1, 3.0),
                (1, 2, 1.0),
                (2, 2, 5.0),
            ],
        )
        .unwrap();
        let mut control = Control::default();
        control.set_prescale(Prescale::RowMax).unwrap();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let x_true = DMatrix::from_column_slice(3, 1, &[-1.0, 2.0, 0.5]);
        let b = a.mul_dense(&x_true).unwrap();
        let x = solve(&symbolic, &numeric, &b).unwrap();
        assert!((&x - &x_true).amax() < 1e-9);
    }

    #[test]
    fn rejects_factors_from_another_analysis() {
        let a = tridiagonal(4);
        let control = Control::default();
        let s1 = analyze(&a, &control).unwrap();
        let s2 = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &s1, &control).unwrap();

        let b = DMatrix::zeros(4, 1);
        assert!(matches!(
            solve(&s2, &numeric, &b),
            Err(Error::InvalidState)
        ));
    }

    #[test]
    fn rejects_wrong_rhs_dimension() {
        let a = tridiagonal(4);
        let control = Control::default();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let b = DMatrix::zeros(3, 1);
        assert!(matches!(
            solve(&symbolic, &numeric, &b),
            Err(Error::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn solve_into_checks_output_shape() {
        let a = tridiagonal(4);
        let control = Control::default();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        let b = DMatrix::zeros(4, 2);
        let mut x = DMatrix::zeros(4, 1);
        assert!(matches!(
            solve_into(&symbolic, &numeric, &b, &mut x),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
