//! Solver configuration.
//!
//! `Control` collects the ordering choice, factorization strategy,
//! pivoting tolerances, prescaling flag, amalgamation relaxation, and
//! scheduling hints. Setters validate their argument and leave the
//! configuration untouched when the value is out of range, so a failed
//! set is observable as a no-op. A single `Control` may be reused
//! across any number of analyze/factorize calls.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ordering::FillReducingOrderer;

/// Default threshold partial pivoting tolerance.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 0.1;

/// Default diagonal-preference tolerance under the symmetric strategy.
pub const DEFAULT_DIAG_PIVOT_TOLERANCE: f64 = 0.001;

/// Default amalgamation relaxation bound.
pub const DEFAULT_RELAXATION: usize = 4;

/// Default minimum front count before the tree-parallel scheduler is
/// considered (below this, sequential is faster).
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 16;

/// Largest accepted amalgamation relaxation bound.
pub const MAX_RELAXATION: usize = 64;

/// Fill-reducing ordering choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum OrderingChoice {
    /// Approximate minimum degree on A + A' (default).
    #[default]
    Amd,
    /// Column approximate minimum degree.
    Colamd,
    /// METIS nested dissection.
    Metis,
    /// METIS, guarded against dense rows.
    MetisGuard,
    /// Let a CHOLMOD-style meta-orderer pick.
    Cholmod,
    /// No reordering; factorize in the given order.
    Natural,
}

impl OrderingChoice {
    /// Parse from string (for CLI-style configuration).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "amd" => Some(Self::Amd),
            "colamd" => Some(Self::Colamd),
            "metis" => Some(Self::Metis),
            "metis_guard" => Some(Self::MetisGuard),
            "cholmod" => Some(Self::Cholmod),
            "none" | "natural" => Some(Self::Natural),
            _ => None,
        }
    }

    /// Get the ordering name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Amd => "amd",
            Self::Colamd => "colamd",
            Self::Metis => "metis",
            Self::MetisGuard => "metis_guard",
            Self::Cholmod => "cholmod",
            Self::Natural => "none",
        }
    }
}

impl std::fmt::Display for OrderingChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Factorization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Strategy {
    /// Inspect the pattern during analysis and pick symmetric or
    /// unsymmetric (default).
    #[default]
    Auto,
    /// Diagonal-preference pivoting for nearly-symmetric matrices.
    Symmetric,
    /// Plain threshold partial pivoting.
    Unsymmetric,
}

impl Strategy {
    /// Parse from string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "symmetric" => Some(Self::Symmetric),
            "unsymmetric" => Some(Self::Unsymmetric),
            _ => None,
        }
    }

    /// Get the strategy name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Symmetric => "symmetric",
            Self::Unsymmetric => "unsymmetric",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Row prescaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Prescale {
    /// No scaling (default).
    #[default]
    Off,
    /// Divide each row by its maximum absolute entry before assembly.
    /// The scaling is folded into the stored factors, so solves are
    /// transparent to the caller.
    RowMax,
}

/// Solver configuration.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Control {
    ordering: OrderingChoice,
    strategy: Strategy,
    pivot_tolerance: f64,
    diag_pivot_tolerance: f64,
    prescale: Prescale,
    relaxation: usize,
    parallel_threshold: usize,
    memory_limit: Option<usize>,
    /// External fill-reducing orderer; when set it overrides the
    /// built-in stand-ins for every non-natural ordering choice.
    #[cfg_attr(feature = "serde", serde(skip))]
    orderer: Option<Arc<dyn FillReducingOrderer>>,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            ordering: OrderingChoice::Amd,
            strategy: Strategy::Auto,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            diag_pivot_tolerance: DEFAULT_DIAG_PIVOT_TOLERANCE,
            prescale: Prescale::Off,
            relaxation: DEFAULT_RELAXATION,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            memory_limit: None,
            orderer: None,
        }
    }
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("ordering", &self.ordering)
            .field("strategy", &self.strategy)
            .field("pivot_tolerance", &self.pivot_tolerance)
            .field("diag_pivot_tolerance", &self.diag_pivot_tolerance)
            .field("prescale", &self.prescale)
            .field("relaxation", &self.relaxation)
            .field("parallel_threshold", &self.parallel_threshold)
            .field("memory_limit", &self.memory_limit)
            .field("orderer", &self.orderer.as_ref().map(|o| o.name()))
            .finish()
    }
}

impl Control {
    /// Configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill-reducing ordering choice.
    pub fn ordering(&self) -> OrderingChoice {
        self.ordering
    }

    /// Select the fill-reducing ordering.
    pub fn set_ordering(&mut self, ordering: OrderingChoice) -> Result<()> {
        self.ordering = ordering;
        Ok(())
    }

    /// Factorization strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Select the factorization strategy.
    pub fn set_strategy(&mut self, strategy: Strategy) -> Result<()> {
        self.strategy = strategy;
        Ok(())
    }

    /// Threshold partial pivoting tolerance.
    pub fn pivot_tolerance(&self) -> f64 {
        self.pivot_tolerance
    }

    /// Set the pivot tolerance; must lie in (0, 1].
    pub fn set_pivot_tolerance(&mut self, tol: f64) -> Result<()> {
        if !(tol > 0.0 && tol <= 1.0) {
            return Err(Error::InvalidOption(format!(
                "pivot tolerance {tol} outside (0, 1]"
            )));
        }
        self.pivot_tolerance = tol;
        Ok(())
    }

    /// Diagonal-preference pivot tolerance (symmetric strategy).
    pub fn diag_pivot_tolerance(&self) -> f64 {
        self.diag_pivot_tolerance
    }

    /// Set the diagonal pivot tolerance; must lie in (0, 1].
    pub fn set_diag_pivot_tolerance(&mut self, tol: f64) -> Result<()> {
        if !(tol > 0.0 && tol <= 1.0) {
            return Err(Error::InvalidOption(format!(
                "diagonal pivot tolerance {tol} outside (0, 1]"
            )));
        }
        self.diag_pivot_tolerance = tol;
        Ok(())
    }

    /// Row prescaling mode.
    pub fn prescale(&self) -> Prescale {
        self.prescale
    }

    /// Set the row prescaling mode.
    pub fn set_prescale(&mut self, prescale: Prescale) -> Result<()> {
        self.prescale = prescale;
        Ok(())
    }

    /// Amalgamation relaxation bound.
    pub fn relaxation(&self) -> usize {
        self.relaxation
    }

    /// Set the amalgamation relaxation bound (0 disables relaxed
    /// amalgamation; fundamental supernodes are always formed).
    pub fn set_relaxation(&mut self, relax: usize) -> Result<()> {
        if relax > MAX_RELAXATION {
            return Err(Error::InvalidOption(format!(
                "relaxation {relax} exceeds maximum {MAX_RELAXATION}"
            )));
        }
        self.relaxation = relax;
        Ok(())
    }

    /// Minimum front count for the tree-parallel scheduler.
    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    /// Set the minimum front count for tree-parallel scheduling; must
    /// be at least 1.
    pub fn set_parallel_threshold(&mut self, fronts: usize) -> Result<()> {
        if fronts == 0 {
            return Err(Error::InvalidOption(
                "parallel threshold must be at least 1".into(),
            ));
        }
        self.parallel_threshold = fronts;
        Ok(())
    }

    /// Optional byte limit for the factorization workspace.
    pub fn memory_limit(&self) -> Option<usize> {
        self.memory_limit
    }

    /// Set (or clear) the workspace byte limit.
    pub fn set_memory_limit(&mut self, limit: Option<usize>) -> Result<()> {
        self.memory_limit = limit;
        Ok(())
    }

    /// External fill-reducing orderer, if any.
    pub fn orderer(&self) -> Option<&Arc<dyn FillReducingOrderer>> {
        self.orderer.as_ref()
    }

    /// Register an external fill-reducing orderer.
    pub fn set_orderer(&mut self, orderer: Arc<dyn FillReducingOrderer>) -> Result<()> {
        self.orderer = Some(orderer);
        Ok(())
    }

    /// Remove any registered external orderer.
    pub fn clear_orderer(&mut self) {
        self.orderer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let control = Control::default();
        assert_eq!(control.ordering(), OrderingChoice::Amd);
        assert_eq!(control.strategy(), Strategy::Auto);
        assert!((control.pivot_tolerance() - 0.1).abs() < 1e-15);
        assert!((control.diag_pivot_tolerance() - 0.001).abs() < 1e-15);
        assert_eq!(control.prescale(), Prescale::Off);
        assert_eq!(control.relaxation(), DEFAULT_RELAXATION);
        assert_eq!(control.parallel_threshold(), DEFAULT_PARALLEL_THRESHOLD);
        assert_eq!(control.memory_limit(), None);
        assert!(control.orderer().is_none());
    }

    #[test]
    fn invalid_tolerance_leaves_control_unchanged() {
        let mut control = Control::default();
        control.set_pivot_tolerance(0.5).unwrap();

        for bad in [-1.0, 0.0, 1.5, f64::NAN] {
            let result = control.set_pivot_tolerance(bad);
            assert!(matches!(result, Err(Error::InvalidOption(_))), "tol {bad}");
            assert!((control.pivot_tolerance() - 0.5).abs() < 1e-15);
        }
    }

    #[test]
    fn invalid_diag_tolerance_rejected() {
        let mut control = Control::default();
        assert!(matches!(
            control.set_diag_pivot_tolerance(2.0),
            Err(Error::InvalidOption(_))
        ));
        assert!((control.diag_pivot_tolerance() - 0.001).abs() < 1e-15);
    }

    #[test]
    fn relaxation_bound_enforced() {
        let mut control = Control::default();
        control.set_relaxation(0).unwrap();
        control.set_relaxation(MAX_RELAXATION).unwrap();
        assert!(matches!(
            control.set_relaxation(MAX_RELAXATION + 1),
            Err(Error::InvalidOption(_))
        ));
        assert_eq!(control.relaxation(), MAX_RELAXATION);
    }

    #[test]
    fn parallel_threshold_must_be_positive() {
        let mut control = Control::default();
        assert!(matches!(
            control.set_parallel_threshold(0),
            Err(Error::InvalidOption(_))
        ));
        control.set_parallel_threshold(1).unwrap();
    }

    #[test]
    fn names_round_trip() {
        for choice in [
            OrderingChoice::Amd,
            OrderingChoice::Colamd,
            OrderingChoice::Metis,
            OrderingChoice::MetisGuard,
            OrderingChoice::Cholmod,
            OrderingChoice::Natural,
        ] {
            assert_eq!(OrderingChoice::from_name(choice.name()), Some(choice));
        }
        for strategy in [Strategy::Auto, Strategy::Symmetric, Strategy::Unsymmetric] {
            assert_eq!(Strategy::from_name(strategy.name()), Some(strategy));
        }
        assert_eq!(OrderingChoice::from_name("qr"), None);
        assert_eq!(Strategy::from_name("cholesky"), None);
    }
}
