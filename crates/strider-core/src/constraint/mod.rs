//! Constraint sets and their stacked container.

mod container;
mod status;

pub use container::ConstraintContainer;

use crate::bounds::Bounds;
use crate::jacobian::JacobianBlock;
use crate::variables::VariableContainer;

/// A named block of constraint rows evaluated against the current variable
/// state.
///
/// A set declares the variable groups it reads through [`dependencies`];
/// every undeclared group contributes a structurally-zero Jacobian block and
/// is never queried. Evaluation must be a pure function of the current group
/// values, so that residual and Jacobian can be requested in any order after
/// the most recent scatter.
///
/// [`dependencies`]: ConstraintSet::dependencies
pub trait ConstraintSet {
    /// Unique name within the constraint container.
    fn name(&self) -> &str;

    /// Number of rows `m` contributed to the global residual.
    fn row_count(&self) -> usize;

    /// Per-row bounds. Must be constant across evaluations.
    fn row_bounds(&self) -> Vec<Bounds>;

    /// Names of the variable groups this set reads.
    fn dependencies(&self) -> Vec<String>;

    /// Write the residual `g(x)` into `out`, where `out.len()` equals
    /// [`row_count`](ConstraintSet::row_count).
    fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]);

    /// Write the block `dg/dx_group` for one declared dependency.
    ///
    /// The block arrives zeroed; only structurally non-zero cells need to be
    /// written. Called once per dependency per Jacobian evaluation, never
    /// for undeclared groups.
    fn fill_jacobian_block(
        &self,
        vars: &VariableContainer,
        group: &str,
        block: &mut JacobianBlock<'_>,
    );
}
