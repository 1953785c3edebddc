//! Statistics query surface.
//!
//! A single keyed accessor over the analysis and factorization results,
//! so callers can report solver behavior without reaching into the
//! phase objects.

use crate::error::{Error, Result};
use crate::kernel::BLAS_BACKEND;
use crate::numeric::Numeric;
use crate::symbolic::Symbolic;

/// Reportable solver statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Metric {
    /// Factorization strategy actually used ("symmetric"/"unsymmetric").
    StrategyUsed,
    /// Fill-reducing ordering actually applied.
    OrderingUsed,
    /// Floating point operations spent in the dense kernels.
    FlopCount,
    /// Stored nonzeros in L, unit diagonal included.
    Lnz,
    /// Stored nonzeros in U, diagonal included.
    Unz,
    /// Cheap conditioning estimate: min |U_kk| / max |U_kk|.
    RcondEstimate,
    /// Dense linear algebra backend name.
    BlasLibrary,
    /// Frontal-tree scheduling mode ("sequential"/"parallel").
    FrontTreeTasking,
}

/// A statistic value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl std::fmt::Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Look up one statistic.
///
/// Metrics that describe the numeric factorization require `numeric`;
/// asking for one with only an analysis at hand fails with
/// `NotAvailable`. A `numeric` built from a different analysis than
/// `symbolic` fails with `InvalidState`.
pub fn stat(symbolic: &Symbolic, numeric: Option<&Numeric>, metric: Metric) -> Result<StatValue> {
    if let Some(num) = numeric {
        if num.symbolic_id() != symbolic.id() {
            return Err(Error::InvalidState);
        }
    }
    let need_numeric = || numeric.ok_or(Error::NotAvailable);
    Ok(match metric {
        Metric::StrategyUsed => StatValue::Str(symbolic.strategy_used().name()),
        Metric::OrderingUsed => StatValue::Str(symbolic.ordering_used()),
        Metric::BlasLibrary => StatValue::Str(BLAS_BACKEND),
        Metric::FlopCount => StatValue::Float(need_numeric()?.stats().flops()),
        Metric::Lnz => StatValue::Int(need_numeric()?.stats().lnz() as i64),
        Metric::Unz => StatValue::Int(need_numeric()?.stats().unz() as i64),
        Metric::RcondEstimate => StatValue::Float(need_numeric()?.stats().rcond()),
        Metric::FrontTreeTasking => StatValue::Str(need_numeric()?.stats().mode().name()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;
    use crate::numeric::factorize;
    use crate::symbolic::analyze;
    use frontal_core::SparseMatrix;

    fn small_spd() -> SparseMatrix {
        SparseMatrix::from_triplets(
            3,
            &[
                (0, 0, 4.0),
                (0, 1, -1.0),
                (1, 0, -1.0),
                (1, 1, 4.0),
                (1, 2, -1.0),
                (2, 1, -1.0),
                (2, 2, 4.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn analysis_metrics_work_without_factors() {
        let a = small_spd();
        let symbolic = analyze(&a, &Control::default()).unwrap();

        assert_eq!(
            stat(&symbolic, None, Metric::StrategyUsed).unwrap(),
            StatValue::Str("symmetric")
        );
        assert_eq!(
            stat(&symbolic, None, Metric::OrderingUsed).unwrap(),
            StatValue::Str("amd(A+A')")
        );
        assert_eq!(
            stat(&symbolic, None, Metric::BlasLibrary).unwrap(),
            StatValue::Str("nalgebra")
        );
    }

    #[test]
    fn numeric_metrics_require_factors() {
        let a = small_spd();
        let symbolic = analyze(&a, &Control::default()).unwrap();

        for metric in [
            Metric::FlopCount,
            Metric::Lnz,
            Metric::Unz,
            Metric::RcondEstimate,
            Metric::FrontTreeTasking,
        ] {
            assert!(matches!(
                stat(&symbolic, None, metric),
                Err(Error::NotAvailable)
            ));
        }
    }

    #[test]
    fn numeric_metrics_report_after_factorization() {
        let a = small_spd();
        let control = Control::default();
        let symbolic = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &symbolic, &control).unwrap();

        match stat(&symbolic, Some(&numeric), Metric::Lnz).unwrap() {
            StatValue::Int(lnz) => assert!(lnz >= 3),
            other => panic!("unexpected value {other:?}"),
        }
        match stat(&symbolic, Some(&numeric), Metric::RcondEstimate).unwrap() {
            StatValue::Float(rcond) => assert!(rcond > 0.0 && rcond <= 1.0),
            other => panic!("unexpected value {other:?}"),
        }
        assert_eq!(
            stat(&symbolic, Some(&numeric), Metric::FrontTreeTasking).unwrap(),
            StatValue::Str("sequential")
        );
    }

    #[test]
    fn mismatched_numeric_is_rejected() {
        let a = small_spd();
        let control = Control::default();
        let s1 = analyze(&a, &control).unwrap();
        let s2 = analyze(&a, &control).unwrap();
        let numeric = factorize(&a, &s1, &control).unwrap();

        assert!(matches!(
            stat(&s2, Some(&numeric), Metric::Lnz),
            Err(Error::InvalidState)
        ));
    }
}
