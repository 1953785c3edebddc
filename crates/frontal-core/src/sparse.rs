//! Compressed-column sparse matrix storage.
//!
//! The solver consumes square matrices in compressed-column (CSC) format:
//! `col_ptr[j]..col_ptr[j + 1]` indexes the entries of column `j` in
//! `row_idx`/`values`. Row indices within a column need not be sorted;
//! duplicate entries at the same position are summed during assembly.

use std::ops::Range;

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// Square sparse matrix in compressed-column format.
///
/// Immutable once constructed; the solver phases only read it. A
/// `Symbolic` analysis depends on the pattern (`col_ptr`, `row_idx`)
/// alone, so matrices sharing a pattern can reuse one analysis with
/// different `values`.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    /// Matrix dimension.
    n: usize,
    /// Column pointers (length n + 1).
    col_ptr: Vec<usize>,
    /// Row indices for each non-zero.
    row_idx: Vec<usize>,
    /// Non-zero values, in `row_idx` order.
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Create from raw compressed-column arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the matrix is not square
    /// - `col_ptr` does not have length `ncols + 1`, does not start at 0,
    ///   or is not monotone non-decreasing
    /// - `row_idx` / `values` lengths do not match `col_ptr[ncols]`
    /// - any row index is out of range
    pub fn from_csc(
        nrows: usize,
        ncols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if nrows != ncols {
            return Err(Error::NotSquare { nrows, ncols });
        }
        let n = nrows;
        if col_ptr.len() != n + 1 {
            return Err(Error::InvalidStructure(
                "col_ptr length must be n + 1".into(),
            ));
        }
        if col_ptr[0] != 0 {
            return Err(Error::InvalidStructure("col_ptr must start at 0".into()));
        }
        if col_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidStructure(
                "col_ptr must be monotone non-decreasing".into(),
            ));
        }
        let nnz = col_ptr[n];
        if row_idx.len() != nnz || values.len() != nnz {
            return Err(Error::InvalidStructure(
                "row_idx and values length must match nnz".into(),
            ));
        }
        for &row in &row_idx {
            if row >= n {
                return Err(Error::RowOutOfRange { row, n });
            }
        }
        Ok(Self {
            n,
            col_ptr,
            row_idx,
            values,
        })
    }

    /// Create from matrix triplets.
    ///
    /// Builds CSC structure from (row, col, value) triplets. Duplicate
    /// entries at the same position are summed.
    pub fn from_triplets(n: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        use std::collections::BTreeMap;

        // Aggregate by (col, row) so iteration order is already CSC.
        let mut entries: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for &(row, col, val) in triplets {
            if row >= n {
                return Err(Error::RowOutOfRange { row, n });
            }
            if col >= n {
                return Err(Error::RowOutOfRange { row: col, n });
            }
            *entries.entry((col, row)).or_insert(0.0) += val;
        }

        let mut col_ptr = vec![0; n + 1];
        let mut row_idx = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());

        let mut current_col = 0;
        for (&(col, row), &val) in &entries {
            while current_col <= col {
                col_ptr[current_col] = row_idx.len();
                current_col += 1;
            }
            row_idx.push(row);
            values.push(val);
        }
        while current_col <= n {
            col_ptr[current_col] = row_idx.len();
            current_col += 1;
        }

        Ok(Self {
            n,
            col_ptr,
            row_idx,
            values,
        })
    }

    /// The n-by-n identity matrix.
    pub fn identity(n: usize) -> Self {
        Self {
            n,
            col_ptr: (0..=n).collect(),
            row_idx: (0..n).collect(),
            values: vec![1.0; n],
        }
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.row_idx.len()
    }

    /// Column pointers (length n + 1).
    pub fn col_ptr(&self) -> &[usize] {
        &self.col_ptr
    }

    /// Row indices for each stored entry.
    pub fn row_idx(&self) -> &[usize] {
        &self.row_idx
    }

    /// Stored values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Range of entry indices belonging to column `j`.
    pub fn col_range(&self, j: usize) -> Range<usize> {
        self.col_ptr[j]..self.col_ptr[j + 1]
    }

    /// Dense product `A * X` for an n-by-nrhs block.
    ///
    /// Used by callers (and tests) to compute residuals.
    pub fn mul_dense(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.nrows() != self.n {
            return Err(Error::DimensionMismatch {
                expected: self.n,
                actual: x.nrows(),
            });
        }
        let mut y = DMatrix::zeros(self.n, x.ncols());
        for j in 0..self.n {
            for k in self.col_range(j) {
                let i = self.row_idx[k];
                let v = self.values[k];
                for r in 0..x.ncols() {
                    y[(i, r)] += v * x[(j, r)];
                }
            }
        }
        Ok(y)
    }

    /// Maximum absolute value in each row.
    ///
    /// Rows with no stored entries (or all-zero entries) report 0.0.
    pub fn row_max_abs(&self) -> Vec<f64> {
        let mut max = vec![0.0_f64; self.n];
        for k in 0..self.nnz() {
            let i = self.row_idx[k];
            let v = self.values[k].abs();
            if v > max[i] {
                max[i] = v;
            }
        }
        max
    }

    /// One-norm (maximum absolute column sum).
    pub fn norm_one(&self) -> f64 {
        let mut norm = 0.0_f64;
        for j in 0..self.n {
            let sum: f64 = self.col_range(j).map(|k| self.values[k].abs()).sum();
            if sum > norm {
                norm = sum;
            }
        }
        norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_csc_valid() {
        // | 1 0 2 |
        // | 0 3 0 |
        // | 4 0 5 |
        let a = SparseMatrix::from_csc(
            3,
            3,
            vec![0, 2, 3, 5],
            vec![0, 2, 1, 0, 2],
            vec![1.0, 4.0, 3.0, 2.0, 5.0],
        )
        .unwrap();
        assert_eq!(a.n(), 3);
        assert_eq!(a.nnz(), 5);
        assert_eq!(a.col_range(0), 0..2);
    }

    #[test]
    fn from_csc_rejects_rectangular() {
        let result = SparseMatrix::from_csc(2, 3, vec![0, 0, 0, 0], vec![], vec![]);
        assert!(matches!(result, Err(Error::NotSquare { nrows: 2, ncols: 3 })));
    }

    #[test]
    fn from_csc_rejects_bad_row_index() {
        let result = SparseMatrix::from_csc(2, 2, vec![0, 1, 2], vec![0, 5], vec![1.0, 1.0]);
        assert!(matches!(result, Err(Error::RowOutOfRange { row: 5, n: 2 })));
    }

    #[test]
    fn from_csc_rejects_bad_col_ptr() {
        let result = SparseMatrix::from_csc(2, 2, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]);
        assert!(matches!(result, Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn from_triplets_sums_duplicates() {
        let a = SparseMatrix::from_triplets(2, &[(0, 0, 1.0), (0, 0, 1.5), (1, 1, 2.0)]).unwrap();
        assert_eq!(a.nnz(), 2);
        assert!((a.values()[0] - 2.5).abs() < 1e-15);
    }

    #[test]
    fn mul_dense_tridiagonal() {
        // | 2 -1  0 |
        // |-1  2 -1 |
        // | 0 -1  2 |
        let a = SparseMatrix::from_triplets(
            3,
            &[
                (0, 0, 2.0),
                (0, 1, -1.0),
                (1, 0, -1.0),
                (1, 1, 2.0),
                (1, 2, -1.0),
                (2, 1, -1.0),
                (2, 2, 2.0),
            ],
        )
        .unwrap();
        let x = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
        let y = a.mul_dense(&x).unwrap();
        assert!((y[(0, 0)] - 0.0).abs() < 1e-15);
        assert!((y[(1, 0)] - 0.0).abs() < 1e-15);
        assert!((y[(2, 0)] - 4.0).abs() < 1e-15);
    }

    #[test]
    fn mul_dense_dimension_mismatch() {
        let a = SparseMatrix::identity(3);
        let x = DMatrix::zeros(2, 1);
        assert!(matches!(
            a.mul_dense(&x),
            Err(Error::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn row_max_abs_reports_zero_rows() {
        let a = SparseMatrix::from_triplets(3, &[(0, 0, -4.0), (2, 1, 3.0)]).unwrap();
        let max = a.row_max_abs();
        assert_eq!(max, vec![4.0, 0.0, 3.0]);
    }

    #[test]
    fn identity_round_trip() {
        let a = SparseMatrix::identity(4);
        assert_eq!(a.nnz(), 4);
        assert!((a.norm_one() - 1.0).abs() < 1e-15);
    }
}
