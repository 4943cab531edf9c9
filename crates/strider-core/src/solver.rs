//! Solver-facing interface for assembled problems.

use std::collections::BTreeMap;
use std::fmt;

use crate::problem::Nlp;

/// Termination classification reported by a solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Converged to the requested tolerances.
    Solved,
    /// Stopped at a point satisfying only the acceptable tolerances.
    AcceptablePoint,
    /// The backend proved the constraints infeasible.
    Infeasible,
    /// Hit the iteration limit before converging.
    MaxIterations,
    /// Iterates diverged.
    Diverged,
    /// The backend reported a code this crate does not classify.
    Unknown,
}

impl SolverStatus {
    /// True when the returned point is usable as a solution.
    pub fn is_success(&self) -> bool {
        matches!(self, SolverStatus::Solved | SolverStatus::AcceptablePoint)
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolverStatus::Infeasible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverStatus::Solved => "solved",
            SolverStatus::AcceptablePoint => "acceptable_point",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::MaxIterations => "max_iterations",
            SolverStatus::Diverged => "diverged",
            SolverStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by solver backends.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The problem could not be handed to the backend.
    Assembly(String),
    /// The backend aborted with an internal failure.
    Backend(String),
    /// The backend ran but produced no usable point.
    NoSolution { status: SolverStatus },
}

impl SolverError {
    pub fn code(&self) -> &'static str {
        match self {
            SolverError::Assembly(_) => "SOLVER_ASSEMBLY",
            SolverError::Backend(_) => "SOLVER_BACKEND",
            SolverError::NoSolution { .. } => "SOLVER_NO_SOLUTION",
        }
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Assembly(message) => {
                write!(f, "[{}] Problem assembly failed: {}", self.code(), message)
            }
            SolverError::Backend(message) => {
                write!(f, "[{}] Solver backend failed: {}", self.code(), message)
            }
            SolverError::NoSolution { status } => {
                write!(f, "[{}] Solver finished without a solution: {}", self.code(), status)
            }
        }
    }
}

impl std::error::Error for SolverError {}

/// Outcome of one solve, independent of the backend.
#[derive(Debug, Clone)]
pub struct SolveSummary {
    /// Final flat decision vector, also scattered back onto the problem.
    pub x: Vec<f64>,
    /// Objective at `x`; `0.0` for feasibility problems.
    pub objective: f64,
    /// Constraint residual at `x`.
    pub constraint_values: Vec<f64>,
    pub status: SolverStatus,
    pub iterations: usize,
    pub solve_time_seconds: f64,
    /// Backend-specific scalar diagnostics keyed by name.
    pub metadata: BTreeMap<String, f64>,
}

/// A backend that can minimise an assembled [`Nlp`].
///
/// Implementations drive the evaluation methods with their own iterates and
/// scatter the final point back before returning, so `nlp.starting_values()`
/// after a solve yields the solution.
pub trait NlpSolver {
    fn solve(&mut self, nlp: &mut Nlp) -> Result<SolveSummary, SolverError>;
}
