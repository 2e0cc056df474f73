//! Symbolic solver boundary.
//!
//! Analyses never do algebra themselves. They hand an [`EquationSet`] to a
//! [`SymbolicSolver`] and ask it to evaluate target expressions against the
//! resulting [`SolutionSet`]. Everything crossing the boundary is plain text in
//! the grammar described in [`expr`].
//!
//! [`EliminationSolver`] is the bundled reference backend. It accepts any
//! system that is linear in its unknowns and returns results as canonical
//! rational functions. Arithmetic is exact over `i128` coefficients, so a very
//! large circuit can still end in [`SolverError::Overflow`] or hit the
//! configured timeout.

mod elimination;
pub mod expr;
mod poly;
mod rational;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::circuit::EquationSet;

pub use elimination::EliminationSolver;
pub use expr::Expr;

/// Errors reported across the solver boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Expression text could not be parsed
    #[error("Syntax error in '{input}': {message}")]
    Syntax { input: String, message: String },

    /// Equation is not linear in the unknowns
    #[error("Equation '{equation}' is not linear in the unknowns")]
    NonLinear { equation: String },

    /// Function call the backend cannot represent
    #[error("Unsupported function '{name}'")]
    UnsupportedFunction { name: String },

    /// Exponent that is not an integer constant
    #[error("Unsupported exponent in '{expression}'")]
    UnsupportedExponent { expression: String },

    /// Numeric literal the backend cannot represent exactly
    #[error("Invalid number '{text}'")]
    InvalidNumber { text: String },

    /// Division by an expression that is identically zero
    #[error("Division by zero")]
    DivisionByZero,

    /// An expression refers to unknowns the equations do not fix
    #[error("System is underdetermined: no solution for {unknowns:?}")]
    Underdetermined { unknowns: Vec<String> },

    /// Equations contradict each other
    #[error("System is inconsistent: equation '{equation}' cannot be satisfied")]
    Inconsistent { equation: String },

    /// The same unknown was listed twice
    #[error("Unknown '{name}' listed more than once")]
    DuplicateUnknown { name: String },

    /// A division that must be exact left a remainder
    #[error("Inexact division of '{dividend}' by '{divisor}'")]
    InexactDivision { dividend: String, divisor: String },

    /// Exact coefficient arithmetic left the supported range
    #[error("Coefficient overflow")]
    Overflow,

    /// Configured time limit elapsed
    #[error("Solver timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Cancellation flag was raised
    #[error("Solver cancelled")]
    Cancelled,
}

impl SolverError {
    /// Create a syntax error
    pub fn syntax(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Solved unknowns, each paired with its closed-form expression.
///
/// Unknowns the equations leave free are listed separately. They only cause
/// an error when an evaluated expression refers to them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolutionSet {
    entries: Vec<(String, String)>,
    undetermined: Vec<String>,
}

impl SolutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the expression for an unknown, replacing any earlier entry.
    pub fn insert(&mut self, unknown: impl Into<String>, expression: impl Into<String>) {
        let unknown = unknown.into();
        let expression = expression.into();
        match self.entries.iter_mut().find(|(name, _)| *name == unknown) {
            Some(entry) => entry.1 = expression,
            None => self.entries.push((unknown, expression)),
        }
    }

    /// Expression solved for `unknown`, if any.
    pub fn get(&self, unknown: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == unknown)
            .map(|(_, expr)| expr.as_str())
    }

    /// Record an unknown that has no unique value.
    pub fn mark_undetermined(&mut self, unknown: impl Into<String>) {
        let unknown = unknown.into();
        if !self.undetermined.contains(&unknown) {
            self.undetermined.push(unknown);
        }
    }

    pub fn undetermined(&self) -> &[String] {
        &self.undetermined
    }

    pub fn is_undetermined(&self, unknown: &str) -> bool {
        self.undetermined.iter().any(|name| name == unknown)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Contract every symbolic backend fulfils.
pub trait SymbolicSolver {
    /// Solve the equations for the listed unknowns.
    fn solve_equations(&self, equations: &EquationSet) -> Result<SolutionSet, SolverError>;

    /// Substitute a solution into `expression` and simplify the result.
    fn evaluate(&self, expression: &str, solution: &SolutionSet) -> Result<String, SolverError>;

    /// Bring `expression` into the backend's canonical form.
    fn simplify(&self, expression: &str) -> Result<String, SolverError>;
}

/// Limits applied to a single solver call.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Wall-clock limit per call (`None` = unlimited).
    pub timeout: Option<Duration>,
    /// Raised by another thread to abandon the current call.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SolverConfig {
    /// Create a configuration without limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wall-clock limit per call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation flag.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn start(&self) -> Budget<'_> {
        Budget {
            config: self,
            started: Instant::now(),
        }
    }
}

/// Running check against a [`SolverConfig`] for one call.
pub(crate) struct Budget<'a> {
    config: &'a SolverConfig,
    started: Instant,
}

impl Budget<'_> {
    pub(crate) fn check(&self) -> Result<(), SolverError> {
        if let Some(flag) = &self.config.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(SolverError::Cancelled);
            }
        }
        if let Some(limit) = self.config.timeout {
            let elapsed = self.started.elapsed();
            if elapsed > limit {
                return Err(SolverError::Timeout { elapsed });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_set_insert_replaces() {
        let mut solution = SolutionSet::new();
        solution.insert("NV1", "V1");
        solution.insert("NV1", "2*V1");
        assert_eq!(solution.len(), 1);
        assert_eq!(solution.get("NV1"), Some("2*V1"));
        assert_eq!(solution.get("NV2"), None);
    }

    #[test]
    fn test_solution_set_undetermined() {
        let mut solution = SolutionSet::new();
        solution.mark_undetermined("NV3");
        solution.mark_undetermined("NV3");
        assert_eq!(solution.undetermined().to_vec(), vec!["NV3".to_string()]);
        assert!(solution.is_undetermined("NV3"));
        assert!(!solution.is_undetermined("NV1"));
        assert!(solution.is_empty());
    }

    #[test]
    fn test_budget_cancel() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = SolverConfig::new().with_cancel_flag(flag.clone());
        let budget = config.start();
        assert!(budget.check().is_ok());
        flag.store(true, Ordering::Relaxed);
        assert_eq!(budget.check(), Err(SolverError::Cancelled));
    }

    #[test]
    fn test_budget_timeout() {
        let config = SolverConfig::new().with_timeout(Duration::ZERO);
        let budget = config.start();
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(budget.check(), Err(SolverError::Timeout { .. })));
    }
}
