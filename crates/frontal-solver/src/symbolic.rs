//! Symbolic analysis: strategy resolution, ordering, elimination tree,
//! supernodal amalgamation and frontal-tree construction.
//!
//! The analysis depends only on the matrix pattern, never its values, so
//! one `Symbolic` can back any number of numeric factorizations of
//! pattern-identical matrices.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use frontal_core::{MemoryBudget, SparseMatrix};

use crate::control::{Control, OrderingChoice, Strategy};
use crate::error::Result;
use crate::etree::{NONE, elimination_tree, postorder};
use crate::ordering::{
    FillReducingOrderer, MinimumDegree, invert_permutation, natural_order, symmetrize_pattern,
    validate_permutation,
};

/// Auto strategy resolves to symmetric when at least this fraction of
/// off-diagonal entries has a transposed mate...
const AUTO_SYMMETRY_THRESHOLD: f64 = 0.5;
/// ...and at least this fraction of the diagonal is present.
const AUTO_DIAG_THRESHOLD: f64 = 0.9;

static NEXT_SYMBOLIC_ID: AtomicU64 = AtomicU64::new(1);

/// One node of the frontal tree: a dense block whose leading rows and
/// columns are the pivots eliminated at this front, followed by the
/// update rows passed to the parent.
#[derive(Debug, Clone)]
pub struct Front {
    /// Pivot columns, contiguous in the permuted order.
    pub(crate) col_start: usize,
    pub(crate) col_end: usize,
    /// Full row/column index set in permuted labels, ascending: the
    /// pivot indices first, then the update rows.
    pub(crate) rows: Vec<usize>,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
}

impl Front {
    /// Number of pivots eliminated at this front.
    pub fn num_pivots(&self) -> usize {
        self.col_end - self.col_start
    }

    /// Full row/column index set (permuted labels).
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Parent front id, if any.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Child front ids.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Local position of a permuted index within this front.
    ///
    /// The index must be a member of the front's row set.
    pub(crate) fn local_index(&self, idx: usize) -> usize {
        if idx < self.col_end {
            idx - self.col_start
        } else {
            let npiv = self.num_pivots();
            let update = &self.rows[npiv..];
            npiv + update.partition_point(|&r| r < idx)
        }
    }
}

/// One original matrix entry routed to its front during assembly.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AssemblyEntry {
    pub(crate) row: u32,
    pub(crate) col: u32,
    /// Index into the caller's value array.
    pub(crate) src: usize,
}

/// Immutable result of symbolic analysis.
///
/// Holds the fill-reducing permutation, the frontal tree (an arena of
/// node records, children stored before parents), and per-front assembly
/// maps routing each original entry to its dense slot.
#[derive(Debug)]
pub struct Symbolic {
    id: u64,
    n: usize,
    nnz: usize,
    /// `perm[k]` = original index eliminated at step `k`.
    perm: Vec<usize>,
    /// `iperm[orig]` = elimination step of original index `orig`.
    iperm: Vec<usize>,
    fronts: Vec<Front>,
    roots: Vec<usize>,
    pub(crate) assembly: Vec<Vec<AssemblyEntry>>,
    strategy_used: Strategy,
    ordering_used: &'static str,
}

impl Symbolic {
    /// Unique analysis id, used to match Numeric objects back to their
    /// originating Symbolic.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Matrix dimension this analysis was built for.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Pattern entry count this analysis was built for.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Fill-reducing permutation: `perm()[k]` is the original index
    /// eliminated at step `k`.
    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    /// Inverse permutation.
    pub fn iperm(&self) -> &[usize] {
        &self.iperm
    }

    /// Frontal tree nodes, children before parents.
    pub fn fronts(&self) -> &[Front] {
        &self.fronts
    }

    /// Root front ids (one per connected component).
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Strategy selected during analysis (never `Auto`).
    pub fn strategy_used(&self) -> Strategy {
        self.strategy_used
    }

    /// Name of the ordering actually applied.
    pub fn ordering_used(&self) -> &'static str {
        self.ordering_used
    }
}

/// Symbolic analysis of the pattern of `a` under the given configuration.
///
/// Resolves an `Auto` strategy from structural symmetry, applies the
/// selected fill-reducing ordering composed with an elimination-tree
/// postorder, forms fundamental supernodes, and amalgamates small child
/// fronts into their parents up to the control's relaxation bound.
pub fn analyze(a: &SparseMatrix, control: &Control) -> Result<Symbolic> {
    let n = a.n();
    let budget = match control.memory_limit() {
        Some(limit) => MemoryBudget::with_limit(limit),
        None => MemoryBudget::unlimited(),
    };

    let strategy_used = resolve_strategy(a, control.strategy());

    // Fill-reducing permutation over the symmetrized pattern.
    let (sym_ptr, sym_idx) = symmetrize_pattern(n, a.col_ptr(), a.row_idx());
    budget.reserve((sym_ptr.len() + sym_idx.len()) * std::mem::size_of::<usize>())?;

    let (base_perm, ordering_used) = match control.ordering() {
        OrderingChoice::Natural => (natural_order(n), "none"),
        _ => match control.orderer() {
            Some(orderer) => {
                let perm = orderer.order(n, &sym_ptr, &sym_idx)?;
                validate_permutation(n, &perm)?;
                (perm, orderer.name())
            }
            None => {
                let perm = MinimumDegree.order(n, &sym_ptr, &sym_idx)?;
                (perm, MinimumDegree.name())
            }
        },
    };

    // Compose with an elimination-tree postorder so each front's pivot
    // columns are contiguous and subtrees occupy contiguous ranges.
    let base_iperm = invert_permutation(&base_perm);
    let (p_ptr, p_idx) = permute_pattern(n, &sym_ptr, &sym_idx, &base_perm, &base_iperm);
    let base_parent = elimination_tree(n, &p_ptr, &p_idx);
    let post = postorder(&base_parent);

    let perm: Vec<usize> = post.iter().map(|&k| base_perm[k]).collect();
    let iperm = invert_permutation(&perm);
    let (s_ptr, s_idx) = permute_pattern(n, &sym_ptr, &sym_idx, &perm, &iperm);
    let parent = elimination_tree(n, &s_ptr, &s_idx);

    // Per-column factor patterns (row indices below the diagonal).
    let col_pattern = factor_patterns(n, &s_ptr, &s_idx, &parent, &budget)?;

    // Supernodes, relaxed amalgamation, frontal tree.
    let supernodes = fundamental_supernodes(n, &parent, &col_pattern);
    let supernodes = amalgamate(supernodes, &parent, &col_pattern, control.relaxation());
    let (fronts, roots) = build_frontal_tree(&supernodes, &parent, &col_pattern, &budget)?;

    // Route each original entry to its dense slot. Pattern-only: the
    // map stores indices into the caller's value array, so any matrix
    // with this pattern assembles through it.
    budget.reserve(a.nnz() * std::mem::size_of::<AssemblyEntry>())?;
    let mut col_to_front = vec![0usize; n];
    for (f, front) in fronts.iter().enumerate() {
        for j in front.col_start..front.col_end {
            col_to_front[j] = f;
        }
    }
    let mut assembly: Vec<Vec<AssemblyEntry>> = vec![Vec::new(); fronts.len()];
    for orig_col in 0..n {
        let pj = iperm[orig_col];
        for k in a.col_range(orig_col) {
            let pi = iperm[a.row_idx()[k]];
            let f = col_to_front[pi.min(pj)];
            let front = &fronts[f];
            assembly[f].push(AssemblyEntry {
                row: front.local_index(pi) as u32,
                col: front.local_index(pj) as u32,
                src: k,
            });
        }
    }

    Ok(Symbolic {
        id: NEXT_SYMBOLIC_ID.fetch_add(1, AtomicOrdering::Relaxed),
        n,
        nnz: a.nnz(),
        perm,
        iperm,
        fronts,
        roots,
        assembly,
        strategy_used,
        ordering_used,
    })
}

/// Resolve an `Auto` strategy from diagonal coverage and structural
/// symmetry of the pattern.
fn resolve_strategy(a: &SparseMatrix, requested: Strategy) -> Strategy {
    match requested {
        Strategy::Symmetric | Strategy::Unsymmetric => requested,
        Strategy::Auto => {
            let n = a.n();
            if n == 0 {
                return Strategy::Unsymmetric;
            }
            use std::collections::HashSet;
            let mut off_diag: HashSet<(usize, usize)> = HashSet::with_capacity(a.nnz());
            let mut diag = 0usize;
            for j in 0..n {
                for k in a.col_range(j) {
                    let i = a.row_idx()[k];
                    if i == j {
                        diag += 1;
                    } else {
                        off_diag.insert((i, j));
                    }
                }
            }
            let matched = off_diag
                .iter()
                .filter(|&&(i, j)| off_diag.contains(&(j, i)))
                .count();
            let symmetry = if off_diag.is_empty() {
                1.0
            } else {
                matched as f64 / off_diag.len() as f64
            };
            let coverage = diag as f64 / n as f64;
            if coverage >= AUTO_DIAG_THRESHOLD && symmetry >= AUTO_SYMMETRY_THRESHOLD {
                Strategy::Symmetric
            } else {
                Strategy::Unsymmetric
            }
        }
    }
}

/// Relabel a symmetric pattern by `perm`, keeping columns sorted.
fn permute_pattern(
    n: usize,
    col_ptr: &[usize],
    row_idx: &[usize],
    perm: &[usize],
    iperm: &[usize],
) -> (Vec<usize>, Vec<usize>) {
    let mut out_ptr = Vec::with_capacity(n + 1);
    let mut out_idx = Vec::with_capacity(row_idx.len());
    out_ptr.push(0);
    for j in 0..n {
        let old = perm[j];
        let start = out_idx.len();
        for &i in &row_idx[col_ptr[old]..col_ptr[old + 1]] {
            out_idx.push(iperm[i]);
        }
        out_idx[start..].sort_unstable();
        out_ptr.push(out_idx.len());
    }
    (out_ptr, out_idx)
}

/// Below-diagonal factor pattern of each column, by symbolic elimination:
/// a column's pattern is its own below-diagonal entries merged with the
/// patterns of its elimination-tree children.
fn factor_patterns(
    n: usize,
    s_ptr: &[usize],
    s_idx: &[usize],
    parent: &[usize],
    budget: &MemoryBudget,
) -> Result<Vec<Vec<usize>>> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for v in 0..n {
        if parent[v] != NONE {
            children[parent[v]].push(v);
        }
    }

    let mut pattern: Vec<Vec<usize>> = Vec::with_capacity(n);
    for j in 0..n {
        let mut rows: Vec<usize> = s_idx[s_ptr[j]..s_ptr[j + 1]]
            .iter()
            .copied()
            .filter(|&i| i > j)
            .collect();
        for &c in &children[j] {
            rows.extend(pattern[c].iter().copied().filter(|&i| i > j));
        }
        rows.sort_unstable();
        rows.dedup();
        budget.reserve(rows.len() * std::mem::size_of::<usize>())?;
        pattern.push(rows);
    }
    Ok(pattern)
}

/// Fundamental supernodes: column j extends the supernode of j-1 when
/// j is the elimination-tree parent of j-1 and the factor patterns
/// nest exactly.
fn fundamental_supernodes(
    n: usize,
    parent: &[usize],
    col_pattern: &[Vec<usize>],
) -> Vec<(usize, usize)> {
    let mut supernodes = Vec::new();
    let mut start = 0;
    for j in 1..n {
        let extends =
            parent[j - 1] == j && col_pattern[j - 1].len() == col_pattern[j].len() + 1;
        if !extends {
            supernodes.push((start, j));
            start = j;
        }
    }
    if n > 0 {
        supernodes.push((start, n));
    }
    supernodes
}

/// Relaxed amalgamation: absorb a child supernode into its
/// column-adjacent parent when the child eliminates at most `relax`
/// pivots and the explicit zeros introduced stay within `relax` per
/// merged row. Runs as a stack pass so collapsed chains re-check their
/// new children.
fn amalgamate(
    supernodes: Vec<(usize, usize)>,
    parent: &[usize],
    col_pattern: &[Vec<usize>],
    relax: usize,
) -> Vec<(usize, usize)> {
    if relax == 0 {
        return supernodes;
    }
    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(supernodes.len());
    for (start, end) in supernodes {
        let mut start = start;
        while let Some(&(c_start, c_end)) = stack.last() {
            // The child must end where this supernode starts and its
            // last column's parent must be one of our pivots.
            let p = parent[c_end - 1];
            if c_end != start || p == NONE || p < start || p >= end {
                break;
            }
            let child_npiv = c_end - c_start;
            if child_npiv > relax {
                break;
            }
            let child_update = col_pattern[c_end - 1].len();
            let parent_rows = (end - start) + col_pattern[end - 1].len();
            let merged_rows = (end - c_start) + col_pattern[end - 1].len();
            let zeros = (parent_rows - child_update) * child_npiv;
            if zeros > relax * merged_rows {
                break;
            }
            stack.pop();
            start = c_start;
        }
        stack.push((start, end));
    }
    stack
}

/// Materialize the frontal-tree arena from the final supernode ranges.
fn build_frontal_tree(
    supernodes: &[(usize, usize)],
    parent: &[usize],
    col_pattern: &[Vec<usize>],
    budget: &MemoryBudget,
) -> Result<(Vec<Front>, Vec<usize>)> {
    let mut col_to_front = vec![0usize; parent.len()];
    for (f, &(start, end)) in supernodes.iter().enumerate() {
        for j in start..end {
            col_to_front[j] = f;
        }
    }

    let mut fronts: Vec<Front> = Vec::with_capacity(supernodes.len());
    for &(start, end) in supernodes {
        let update = &col_pattern[end - 1];
        budget.reserve((end - start + update.len()) * std::mem::size_of::<usize>())?;
        let mut rows: Vec<usize> = (start..end).collect();
        rows.extend_from_slice(update);
        let front_parent = match parent[end - 1] {
            NONE => None,
            p => Some(col_to_front[p]),
        };
        fronts.push(Front {
            col_start: start,
            col_end: end,
            rows,
            parent: front_parent,
            children: Vec::new(),
        });
    }

    let mut roots = Vec::new();
    for f in 0..fronts.len() {
        let parent = fronts[f].parent;
        match parent {
            Some(p) => fronts[p].children.push(f),
            None => roots.push(f),
        }
    }
    Ok((fronts, roots))
}
