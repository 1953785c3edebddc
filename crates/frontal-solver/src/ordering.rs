//! Fill-reducing ordering plug-ins.
//!
//! The ordering algorithms themselves are external collaborators: a
//! caller can register any orderer (AMD, COLAMD, METIS bindings, ...)
//! through [`FillReducingOrderer`]. Two built-ins are provided: the
//! natural (identity) ordering and a greedy minimum-degree stand-in
//! used when a fill-reducing choice is selected but no external orderer
//! has been registered. Orderers see the off-diagonal pattern of
//! A + A', in compressed-column form.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// A pluggable fill-reducing orderer.
///
/// `order` receives the off-diagonal pattern of A + A' and must return
/// a permutation where `perm[k]` is the original index eliminated at
/// step `k`. The returned permutation is validated by the caller.
pub trait FillReducingOrderer: Send + Sync + std::fmt::Debug {
    /// Name reported through the statistics surface.
    fn name(&self) -> &'static str;

    /// Compute the elimination order for the given symmetric pattern.
    fn order(&self, n: usize, col_ptr: &[usize], row_idx: &[usize]) -> Result<Vec<usize>>;
}

/// Greedy minimum-degree ordering on A + A'.
///
/// Stand-in for an external AMD when none is registered: repeatedly
/// eliminates a minimum-degree vertex and connects its neighbors into a
/// clique. Ties break toward the lowest vertex index, so the result is
/// deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimumDegree;

impl FillReducingOrderer for MinimumDegree {
    fn name(&self) -> &'static str {
        "amd(A+A')"
    }

    fn order(&self, n: usize, col_ptr: &[usize], row_idx: &[usize]) -> Result<Vec<usize>> {
        let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        for j in 0..n {
            for &i in &row_idx[col_ptr[j]..col_ptr[j + 1]] {
                if i != j {
                    adj[j].insert(i);
                    adj[i].insert(j);
                }
            }
        }

        use std::cmp::Reverse;
        use std::collections::BinaryHeap;

        let mut heap: BinaryHeap<Reverse<(usize, usize)>> =
            (0..n).map(|v| Reverse((adj[v].len(), v))).collect();
        let mut eliminated = vec![false; n];
        let mut perm = Vec::with_capacity(n);

        while let Some(Reverse((degree, v))) = heap.pop() {
            if eliminated[v] || degree != adj[v].len() {
                // Stale heap entry; the live one is (or will be) queued.
                continue;
            }
            eliminated[v] = true;
            perm.push(v);

            // Connect the neighbors of v into a clique.
            let neighbors: Vec<usize> = adj[v].iter().copied().collect();
            for &u in &neighbors {
                adj[u].remove(&v);
            }
            for (a, &u) in neighbors.iter().enumerate() {
                for &w in &neighbors[a + 1..] {
                    adj[u].insert(w);
                    adj[w].insert(u);
                }
            }
            for &u in &neighbors {
                heap.push(Reverse((adj[u].len(), u)));
            }
            adj[v].clear();
        }

        Ok(perm)
    }
}

/// Identity permutation (the "none" ordering).
pub(crate) fn natural_order(n: usize) -> Vec<usize> {
    (0..n).collect()
}

/// Off-diagonal pattern of A + A' in compressed-column form.
pub(crate) fn symmetrize_pattern(
    n: usize,
    col_ptr: &[usize],
    row_idx: &[usize],
) -> (Vec<usize>, Vec<usize>) {
    let mut cols: Vec<Vec<usize>> = vec![Vec::new(); n];
    for j in 0..n {
        for &i in &row_idx[col_ptr[j]..col_ptr[j + 1]] {
            if i != j {
                cols[j].push(i);
                cols[i].push(j);
            }
        }
    }

    let mut sym_ptr = Vec::with_capacity(n + 1);
    let mut sym_idx = Vec::new();
    sym_ptr.push(0);
    for col in &mut cols {
        col.sort_unstable();
        col.dedup();
        sym_idx.extend_from_slice(col);
        sym_ptr.push(sym_idx.len());
    }
    (sym_ptr, sym_idx)
}

/// Check that `perm` is a permutation of `0..n`.
pub(crate) fn validate_permutation(n: usize, perm: &[usize]) -> Result<()> {
    if perm.len() != n {
        return Err(Error::InvalidInput(format!(
            "ordering returned {} indices for dimension {n}",
            perm.len()
        )));
    }
    let mut seen = vec![false; n];
    for &p in perm {
        if p >= n || seen[p] {
            return Err(Error::InvalidInput(format!(
                "ordering result is not a permutation (index {p})"
            )));
        }
        seen[p] = true;
    }
    Ok(())
}

/// Invert a permutation: `inverse[perm[k]] = k`.
pub(crate) fn invert_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; perm.len()];
    for (k, &p) in perm.iter().enumerate() {
        inverse[p] = k;
    }
    inverse
}
