//! Strider core: nonlinear-program assembly with lazy linking.

pub mod bounds;
pub mod constraint;
pub mod cost;
pub mod error;
pub mod jacobian;
pub mod problem;
pub mod solver;
pub mod variables;

pub use bounds::Bounds;
pub use constraint::{ConstraintContainer, ConstraintSet};
pub use cost::{CostContainer, CostTerm};
pub use error::{ComponentKind, NlpError};
pub use jacobian::{Jacobian, JacobianBlock};
pub use problem::{GroupReport, Nlp, ProblemReport, SetReport};
pub use solver::{NlpSolver, SolveSummary, SolverError, SolverStatus};
pub use variables::{VariableContainer, VariableGroup};
