//! Numeric factorization over the frontal tree.
//!
//! Each front is assembled from its share of the original entries plus
//! the update blocks of its children, factored by the dense kernel, and
//! its Schur complement handed to the parent. Fully-summed columns with
//! no acceptable pivot are delayed: their rows and columns travel up
//! with the Schur complement and are retried in the parent front, where
//! further contributions have been summed in. A column that is still
//! unpivotable at a root is reported as numerically singular.
//!
//! Independent subtrees run on the rayon pool when the tree is large
//! enough; the sequential and parallel schedules perform identical
//! arithmetic in identical order, so their results are bit-for-bit
//! equal.

use std::sync::OnceLock;

use nalgebra::DMatrix;
use rayon::prelude::*;

use frontal_core::{MemoryBudget, SparseMatrix};

use crate::control::{Control, Prescale, Strategy};
use crate::error::{Error, Result};
use crate::kernel::factor_front;
use crate::symbolic::Symbolic;

/// How the frontal tree was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SchedulingMode {
    Sequential,
    TreeParallel,
}

impl SchedulingMode {
    /// Name reported through the statistics surface.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::TreeParallel => "parallel",
        }
    }
}

/// Aggregate statistics of one numeric factorization.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FactorStats {
    pub(crate) flops: f64,
    pub(crate) lnz: usize,
    pub(crate) unz: usize,
    pub(crate) rcond: f64,
    pub(crate) mode: SchedulingMode,
}

impl FactorStats {
    /// Floating point operations spent in the dense kernels.
    pub fn flops(&self) -> f64 {
        self.flops
    }

    /// Stored nonzeros in L, unit diagonal included.
    pub fn lnz(&self) -> usize {
        self.lnz
    }

    /// Stored nonzeros in U, diagonal included.
    pub fn unz(&self) -> usize {
        self.unz
    }

    /// Cheap conditioning estimate: min |U_kk| / max |U_kk|.
    pub fn rcond(&self) -> f64 {
        self.rcond
    }

    /// Scheduling mode the tree walk used.
    pub fn mode(&self) -> SchedulingMode {
        self.mode
    }
}

/// Dense factors of one front.
#[derive(Debug)]
pub(crate) struct FrontFactor {
    /// `rows[i]` = permuted matrix row held in local row `i` after
    /// pivoting. The leading `q` entries (q = pivots eliminated here)
    /// are the realized pivot rows.
    pub(crate) rows: Vec<usize>,
    /// `cols[j]` = permuted matrix column held in local column `j`.
    /// The leading `q` entries are the columns eliminated here; delayed
    /// columns inherited from children can make these differ from the
    /// front's symbolic pivot range.
    pub(crate) cols: Vec<usize>,
    /// Unit-lower block, `m x q`, diagonal stored explicitly.
    pub(crate) l: DMatrix<f64>,
    /// Upper block, `q x m`, diagonal included.
    pub(crate) u: DMatrix<f64>,
    flops: f64,
}

/// Schur complement passed from a child to its parent, carrying any
/// delayed pivot rows/columns ahead of the symbolic update variables.
struct UpdateBlock {
    block: DMatrix<f64>,
    rows: Vec<usize>,
    cols: Vec<usize>,
    /// Leading entries of `rows`/`cols` that are delayed pivots.
    delayed: usize,
}

/// LU factors produced from one matrix under one symbolic analysis.
#[derive(Debug)]
pub struct Numeric {
    symbolic_id: u64,
    n: usize,
    /// `row_perm[k]` = permuted row eliminated at step `k`.
    pub(crate) row_perm: Vec<usize>,
    /// Inverse of `row_perm`.
    pub(crate) slot_of: Vec<usize>,
    /// Per-row divisors applied before assembly, in original row labels.
    pub(crate) row_scale: Option<Vec<f64>>,
    pub(crate) fronts: Vec<FrontFactor>,
    stats: FactorStats,
}

impl Numeric {
    /// Id of the symbolic analysis these factors were built from.
    pub fn symbolic_id(&self) -> u64 {
        self.symbolic_id
    }

    /// System dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Factorization statistics.
    pub fn stats(&self) -> &FactorStats {
        &self.stats
    }
}

struct FactorCtx<'a> {
    symbolic: &'a Symbolic,
    values: &'a [f64],
    row_idx: &'a [usize],
    row_scale: Option<&'a [f64]>,
    strategy: Strategy,
    pivot_tol: f64,
    diag_tol: f64,
    parallel: bool,
    slots: &'a [OnceLock<FrontFactor>],
    budget: &'a MemoryBudget,
}

/// Factorize `a` using a previously computed symbolic analysis.
///
/// The matrix must have the same dimension and pattern size the
/// analysis was built for. Fails without producing factors when a pivot
/// column remains zero at its root front; the symbolic analysis stays
/// valid for a retry with different values or tolerances.
pub fn factorize(a: &SparseMatrix, symbolic: &Symbolic, control: &Control) -> Result<Numeric> {
    if a.n() != symbolic.n() || a.nnz() != symbolic.nnz() {
        return Err(Error::InvalidInput(format!(
            "matrix ({} x {}, {} entries) does not match the analysis ({} x {}, {} entries)",
            a.n(),
            a.n(),
            a.nnz(),
            symbolic.n(),
            symbolic.n(),
            symbolic.nnz()
        )));
    }
    let n = symbolic.n();

    let row_scale = match control.prescale() {
        Prescale::Off => None,
        Prescale::RowMax => {
            let mut scale = a.row_max_abs();
            // A zero row scales by 1 and surfaces as a singular pivot.
            for s in scale.iter_mut() {
                if *s == 0.0 {
                    *s = 1.0;
                }
            }
            Some(scale)
        }
    };

    let budget = match control.memory_limit() {
        Some(limit) => MemoryBudget::with_limit(limit),
        None => MemoryBudget::unlimited(),
    };

    let parallel = symbolic.fronts().len() >= control.parallel_threshold()
        && rayon::current_num_threads() > 1;

    let slots: Vec<OnceLock<FrontFactor>> =
        (0..symbolic.fronts().len()).map(|_| OnceLock::new()).collect();
    let ctx = FactorCtx {
        symbolic,
        values: a.values(),
        row_idx: a.row_idx(),
        row_scale: row_scale.as_deref(),
        strategy: symbolic.strategy_used(),
        pivot_tol: control.pivot_tolerance(),
        diag_tol: control.diag_pivot_tolerance(),
        parallel,
        slots: &slots,
        budget: &budget,
    };

    let walk = |&root: &usize| factor_subtree(&ctx, root).map(|_| ());
    let result: Result<Vec<()>> = if parallel {
        symbolic.roots().par_iter().map(walk).collect()
    } else {
        symbolic.roots().iter().map(walk).collect()
    };
    // Report the failing pivot column in original labels.
    result.map_err(|e| match e {
        Error::NumericallySingular { col } => Error::NumericallySingular {
            col: symbolic.perm()[col],
        },
        other => other,
    })?;

    let fronts: Vec<FrontFactor> = slots
        .into_iter()
        .map(|slot| slot.into_inner().expect("every front is factored exactly once"))
        .collect();

    // Stats and the realized row permutation, in one sequential pass.
    let mut flops = 0.0f64;
    let mut lnz = 0usize;
    let mut unz = 0usize;
    let mut umin = f64::INFINITY;
    let mut umax = 0.0f64;
    let mut row_perm = vec![0usize; n];
    let mut step = 0usize;
    for factor in &fronts {
        let q = factor.u.nrows();
        let m = factor.rows.len();
        flops += factor.flops;
        for k in 0..q {
            row_perm[step] = factor.rows[k];
            step += 1;
            let d = factor.u[(k, k)].abs();
            umin = umin.min(d);
            umax = umax.max(d);
            lnz += (k..m).filter(|&i| factor.l[(i, k)] != 0.0).count();
            unz += (k..m).filter(|&j| factor.u[(k, j)] != 0.0).count();
        }
    }
    debug_assert_eq!(step, n);
    let rcond = if n == 0 { 1.0 } else { umin / umax };
    let mut slot_of = vec![0usize; n];
    for (k, &r) in row_perm.iter().enumerate() {
        slot_of[r] = k;
    }

    Ok(Numeric {
        symbolic_id: symbolic.id(),
        n,
        row_perm,
        slot_of,
        row_scale,
        fronts,
        stats: FactorStats {
            flops,
            lnz,
            unz,
            rcond,
            mode: if parallel {
                SchedulingMode::TreeParallel
            } else {
                SchedulingMode::Sequential
            },
        },
    })
}

/// Factor front `f` and its whole subtree, returning the Schur
/// complement block (delayed pivots first) to extend-add into the
/// parent.
fn factor_subtree(ctx: &FactorCtx<'_>, f: usize) -> Result<UpdateBlock> {
    let front = &ctx.symbolic.fronts()[f];

    let children = front.children();
    let updates: Vec<UpdateBlock> = if ctx.parallel {
        children
            .par_iter()
            .map(|&c| factor_subtree(ctx, c))
            .collect::<Result<Vec<_>>>()?
    } else {
        children
            .iter()
            .map(|&c| factor_subtree(ctx, c))
            .collect::<Result<Vec<_>>>()?
    };

    let sym_rows = front.rows();
    let npiv = front.num_pivots();
    let nd: usize = updates.iter().map(|u| u.delayed).sum();
    let p = npiv + nd;
    let m = p + (sym_rows.len() - npiv);

    // Local index layout: own pivots, then delayed pivots inherited
    // from children, then the symbolic update variables.
    let mut rows: Vec<usize> = Vec::with_capacity(m);
    let mut cols: Vec<usize> = Vec::with_capacity(m);
    rows.extend_from_slice(&sym_rows[..npiv]);
    cols.extend_from_slice(&sym_rows[..npiv]);
    for upd in &updates {
        rows.extend_from_slice(&upd.rows[..upd.delayed]);
        cols.extend_from_slice(&upd.cols[..upd.delayed]);
    }
    rows.extend_from_slice(&sym_rows[npiv..]);
    cols.extend_from_slice(&sym_rows[npiv..]);

    let fmat_bytes = m * m * std::mem::size_of::<f64>();
    ctx.budget.reserve(fmat_bytes)?;
    let mut fmat = DMatrix::<f64>::zeros(m, m);

    // Original entries routed to this front. The symbolic map was built
    // without delayed slots, so update-range indices shift by nd.
    let remap = |idx: usize| if idx < npiv { idx } else { idx + nd };
    for e in &ctx.symbolic.assembly[f] {
        let mut v = ctx.values[e.src];
        if let Some(scale) = ctx.row_scale {
            v /= scale[ctx.row_idx[e.src]];
        }
        fmat[(remap(e.row as usize), remap(e.col as usize))] += v;
    }

    // Extend-add the children's Schur complements. Update variables are
    // addressed through the symbolic row set; delayed pivots land in the
    // slots reserved for this child.
    let mut offset = 0usize;
    for upd in &updates {
        let base = npiv + offset;
        let local_row = |i: usize| {
            if i < upd.delayed {
                base + i
            } else {
                remap(front.local_index(upd.rows[i]))
            }
        };
        let local_col = |j: usize| {
            if j < upd.delayed {
                base + j
            } else {
                remap(front.local_index(upd.cols[j]))
            }
        };
        for j in 0..upd.cols.len() {
            let lj = local_col(j);
            for i in 0..upd.rows.len() {
                fmat[(local_row(i), lj)] += upd.block[(i, j)];
            }
        }
        offset += upd.delayed;
        ctx.budget
            .release(upd.block.nrows() * upd.block.ncols() * std::mem::size_of::<f64>());
    }
    drop(updates);

    let out = factor_front(
        &mut fmat,
        &mut rows,
        &mut cols,
        p,
        ctx.strategy,
        ctx.pivot_tol,
        ctx.diag_tol,
    );
    let q = out.eliminated;
    if q < p && front.parent().is_none() {
        // Nothing above this front can contribute to the delayed column.
        ctx.budget.release(fmat_bytes);
        return Err(Error::NumericallySingular { col: cols[q] });
    }

    // Split into stored L / U blocks and the outgoing update.
    ctx.budget
        .reserve(2 * m * q * std::mem::size_of::<f64>())?;
    let mut l = DMatrix::<f64>::zeros(m, q);
    let mut u = DMatrix::<f64>::zeros(q, m);
    for j in 0..q {
        l[(j, j)] = 1.0;
        for i in j + 1..m {
            l[(i, j)] = fmat[(i, j)];
        }
    }
    for i in 0..q {
        for j in i..m {
            u[(i, j)] = fmat[(i, j)];
        }
    }
    let ns = m - q;
    ctx.budget.reserve(ns * ns * std::mem::size_of::<f64>())?;
    let block = fmat.view_range(q..m, q..m).clone_owned();
    drop(fmat);
    ctx.budget.release(fmat_bytes);

    let update = UpdateBlock {
        block,
        rows: rows[q..].to_vec(),
        cols: cols[q..].to_vec(),
        delayed: p - q,
    };
    let _ = ctx.slots[f].set(FrontFactor {
        rows,
        cols,
        l,
        u,
        flops: out.flops,
    });
    Ok(update)
}
