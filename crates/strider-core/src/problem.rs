//! The assembled nonlinear program facade.

use serde::Serialize;

use crate::bounds::Bounds;
use crate::constraint::{ConstraintContainer, ConstraintSet};
use crate::cost::{CostContainer, CostTerm};
use crate::error::NlpError;
use crate::jacobian::Jacobian;
use crate::variables::VariableContainer;

/// A complete nonlinear program: decision variables, stacked constraints and
/// a weighted cost, exposed to a solver through flat vectors.
///
/// Built in two phases. During assembly the driver registers variable groups
/// on the container, then hands it to [`Nlp::new`] and adds constraint sets
/// and cost terms. The first evaluation links everything, validates the
/// dependency graph, freezes the layout and allocates the reusable
/// evaluation buffers; from then on the solver loop is allocation-free apart
/// from the variable scatter.
pub struct Nlp {
    variables: VariableContainer,
    constraints: ConstraintContainer,
    costs: CostContainer,
    linked: bool,
    residual: Vec<f64>,
    gradient: Vec<f64>,
}

impl Nlp {
    /// Wrap a populated variable container. Constraints and costs are added
    /// afterwards; the variable set itself can still grow until the first
    /// flat access.
    pub fn new(variables: VariableContainer) -> Self {
        Self {
            variables,
            constraints: ConstraintContainer::new(),
            costs: CostContainer::new(),
            linked: false,
            residual: Vec::new(),
            gradient: Vec::new(),
        }
    }

    /// Register one constraint set.
    pub fn add_constraint(&mut self, set: Box<dyn ConstraintSet>) -> Result<(), NlpError> {
        self.constraints.add_set(set)
    }

    /// Register several constraint sets in order.
    pub fn add_constraints(
        &mut self,
        sets: impl IntoIterator<Item = Box<dyn ConstraintSet>>,
    ) -> Result<(), NlpError> {
        for set in sets {
            self.constraints.add_set(set)?;
        }
        Ok(())
    }

    /// Register one cost term with its weight.
    pub fn add_cost(&mut self, term: Box<dyn CostTerm>, weight: f64) -> Result<(), NlpError> {
        self.costs.add_term(term, weight)
    }

    pub fn variables(&self) -> &VariableContainer {
        &self.variables
    }

    /// Dimension `N` of the flat decision vector.
    pub fn num_variables(&self) -> usize {
        self.variables.total_dim()
    }

    /// Per-coordinate variable bounds, concatenated in registration order.
    /// Freezes variable registration.
    pub fn variable_bounds(&self) -> Vec<Bounds> {
        self.variables.flat_bounds()
    }

    /// The flat vector at the current variable state. Right after assembly
    /// this is the initial guess; after a solve it is whatever the solver
    /// scattered last. Freezes variable registration.
    pub fn starting_values(&self) -> Vec<f64> {
        self.variables.flat_values()
    }

    /// Scatter a flat vector `x` onto the variable groups.
    ///
    /// On a length mismatch nothing is written.
    pub fn set_variables(&mut self, x: &[f64]) -> Result<(), NlpError> {
        self.variables.scatter(x)
    }

    /// False for a pure feasibility problem; solvers then minimise a
    /// constant zero objective.
    pub fn has_costs(&self) -> bool {
        !self.costs.is_empty()
    }

    /// Total number of constraint rows `M`.
    pub fn num_constraints(&self) -> usize {
        self.constraints.row_count()
    }

    /// Per-row constraint bounds, stacked in set registration order.
    pub fn constraint_bounds(&self) -> Vec<Bounds> {
        self.constraints.row_bounds()
    }

    /// Weighted cost at `x`. Scatters, then evaluates.
    pub fn evaluate_cost(&mut self, x: &[f64]) -> Result<f64, NlpError> {
        self.ensure_linked()?;
        self.variables.scatter(x)?;
        Ok(self.costs.value(&self.variables))
    }

    /// Stacked cost gradient at `x`. The slice aliases an internal buffer
    /// overwritten by the next call.
    pub fn evaluate_cost_gradient(&mut self, x: &[f64]) -> Result<&[f64], NlpError> {
        self.ensure_linked()?;
        self.variables.scatter(x)?;
        self.gradient.fill(0.0);
        self.costs.add_gradient_into(&self.variables, &mut self.gradient)?;
        Ok(&self.gradient)
    }

    /// Stacked constraint residual `g(x)`. The slice aliases an internal
    /// buffer overwritten by the next call.
    pub fn evaluate_constraints(&mut self, x: &[f64]) -> Result<&[f64], NlpError> {
        self.ensure_linked()?;
        self.variables.scatter(x)?;
        self.constraints
            .fill_values(&self.variables, &mut self.residual)?;
        Ok(&self.residual)
    }

    /// Constraint Jacobian at `x` in the frozen sparsity pattern.
    pub fn evaluate_jacobian(&mut self, x: &[f64]) -> Result<&Jacobian, NlpError> {
        self.ensure_linked()?;
        self.variables.scatter(x)?;
        self.constraints.refresh_jacobian(&self.variables)
    }

    /// Jacobian values at `x` copied into `out`, which must hold exactly
    /// `nnz` entries in the canonical triplet order. Solver interfaces that
    /// query the pattern once and then poll values use this path.
    pub fn evaluate_jacobian_values(&mut self, x: &[f64], out: &mut [f64]) -> Result<(), NlpError> {
        let jacobian = self.evaluate_jacobian(x)?;
        jacobian.copy_values_into(out)
    }

    /// Number of structural non-zeros once linked.
    pub fn jacobian_nnz(&mut self) -> Result<usize, NlpError> {
        self.ensure_linked()?;
        Ok(self.constraints.jacobian_nnz().unwrap_or(0))
    }

    /// Per-set violation report at the current variable state.
    pub fn format_status(&self, tol: f64) -> String {
        self.constraints.format_status(&self.variables, tol)
    }

    /// Print [`Self::format_status`] to stdout.
    pub fn print_status(&self, tol: f64) {
        print!("{}", self.format_status(tol));
    }

    /// Structural summary of the assembled problem.
    pub fn report(&self) -> ProblemReport {
        let groups = self
            .variables
            .groups()
            .zip(self.variables.offsets())
            .map(|(group, &offset)| GroupReport {
                name: group.name().to_string(),
                dim: group.dim(),
                offset,
            })
            .collect();
        let sets = self
            .constraints
            .sets()
            .zip(self.constraints.row_offsets())
            .map(|(set, &row_offset)| SetReport {
                name: set.name().to_string(),
                rows: set.row_count(),
                row_offset,
            })
            .collect();
        ProblemReport {
            variable_count: self.variables.total_dim(),
            constraint_count: self.constraints.row_count(),
            cost_term_count: self.costs.term_count(),
            groups,
            sets,
            jacobian_nnz: self.constraints.jacobian_nnz(),
        }
    }

    /// Link containers, freeze layouts and allocate evaluation buffers.
    /// Idempotent after the first success.
    fn ensure_linked(&mut self) -> Result<(), NlpError> {
        if self.linked {
            return Ok(());
        }
        if self.variables.total_dim() == 0 {
            return Err(NlpError::EmptyProblem);
        }
        self.constraints.link_to(&self.variables)?;
        self.costs.link_to(&self.variables)?;
        self.residual = vec![0.0; self.constraints.row_count()];
        self.gradient = vec![0.0; self.variables.total_dim()];
        self.linked = true;
        tracing::debug!(
            component = "nlp",
            operation = "link",
            status = "success",
            variables = self.variables.total_dim(),
            constraints = self.constraints.row_count(),
            cost_terms = self.costs.term_count(),
            jacobian_nnz = self.constraints.jacobian_nnz().unwrap_or(0),
            "Linked problem"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Nlp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nlp")
            .field("variables", &self.variables.total_dim())
            .field("constraints", &self.constraints.row_count())
            .field("cost_terms", &self.costs.term_count())
            .field("linked", &self.linked)
            .finish()
    }
}

/// Serializable structural summary of an assembled problem.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemReport {
    pub variable_count: usize,
    pub constraint_count: usize,
    pub cost_term_count: usize,
    pub groups: Vec<GroupReport>,
    pub sets: Vec<SetReport>,
    /// `None` until the problem has linked.
    pub jacobian_nnz: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub dim: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetReport {
    pub name: String,
    pub rows: usize,
    pub row_offset: usize,
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::Nlp;
    use crate::bounds::Bounds;
    use crate::constraint::ConstraintSet;
    use crate::cost::CostTerm;
    use crate::error::NlpError;
    use crate::jacobian::JacobianBlock;
    use crate::variables::{VariableContainer, VariableGroup};

    /// Fixture set: `g_i = x_i - target` over one group.
    struct Shift {
        name: String,
        group: String,
        target: f64,
        rows: usize,
    }

    impl ConstraintSet for Shift {
        fn name(&self) -> &str {
            &self.name
        }

        fn row_count(&self) -> usize {
            self.rows
        }

        fn row_bounds(&self) -> Vec<Bounds> {
            vec![Bounds::equal(0.0); self.rows]
        }

        fn dependencies(&self) -> Vec<String> {
            vec![self.group.clone()]
        }

        fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) {
            for (g, &x) in out.iter_mut().zip(vars.values_of(&self.group)) {
                *g = x - self.target;
            }
        }

        fn fill_jacobian_block(
            &self,
            _vars: &VariableContainer,
            _group: &str,
            block: &mut JacobianBlock<'_>,
        ) {
            for row in 0..self.rows {
                block.set(row, row, 1.0);
            }
        }
    }

    /// Fixture cost: `c = sum x_i^2` over one group.
    struct Quad {
        group: String,
    }

    impl CostTerm for Quad {
        fn name(&self) -> &str {
            "quad"
        }

        fn dependencies(&self) -> Vec<String> {
            vec![self.group.clone()]
        }

        fn value(&self, vars: &VariableContainer) -> f64 {
            vars.values_of(&self.group).iter().map(|x| x * x).sum()
        }

        fn fill_gradient_block(&self, vars: &VariableContainer, _group: &str, grad: &mut [f64]) {
            for (g, &x) in grad.iter_mut().zip(vars.values_of(&self.group)) {
                *g = 2.0 * x;
            }
        }
    }

    fn fixture() -> Nlp {
        let mut vars = VariableContainer::new();
        vars.add_group(VariableGroup::new("p", vec![1.0, 2.0]))
            .unwrap_or_else(|err| panic!("{}", err));
        vars.add_group(VariableGroup::new("q", vec![0.5]))
            .unwrap_or_else(|err| panic!("{}", err));

        let mut nlp = Nlp::new(vars);
        nlp.add_constraint(Box::new(Shift {
            name: "pin-p".to_string(),
            group: "p".to_string(),
            target: 1.0,
            rows: 2,
        }))
        .unwrap_or_else(|err| panic!("{}", err));
        nlp.add_cost(Box::new(Quad {
            group: "q".to_string(),
        }), 2.0)
        .unwrap_or_else(|err| panic!("{}", err));
        nlp
    }

    #[test]
    fn evaluations_agree_with_the_scattered_point() {
        let mut nlp = fixture();
        let x = vec![3.0, -1.0, 0.25];
        assert_eq!(
            nlp.evaluate_cost(&x).unwrap_or_else(|err| panic!("{}", err)),
            2.0 * 0.0625
        );
        let grad = nlp
            .evaluate_cost_gradient(&x)
            .unwrap_or_else(|err| panic!("{}", err));
        assert_eq!(grad, &[0.0, 0.0, 1.0]);
        let g = nlp
            .evaluate_constraints(&x)
            .unwrap_or_else(|err| panic!("{}", err));
        assert_eq!(g, &[2.0, -2.0]);
    }

    #[test]
    fn jacobian_values_follow_the_frozen_pattern() {
        let mut nlp = fixture();
        let x = vec![1.0, 1.0, 0.0];
        let jac = nlp
            .evaluate_jacobian(&x)
            .unwrap_or_else(|err| panic!("{}", err));
        assert_eq!(jac.row_count(), 2);
        assert_eq!(jac.col_count(), 3);
        assert_eq!(jac.nnz(), 4);
        assert_eq!(jac.value_at(0, 0), 1.0);
        assert_eq!(jac.value_at(1, 1), 1.0);
        assert!(!jac.is_structural(0, 2));

        let nnz = nlp.jacobian_nnz().unwrap_or_else(|err| panic!("{}", err));
        let mut values = vec![0.0; nnz];
        nlp.evaluate_jacobian_values(&x, &mut values)
            .unwrap_or_else(|err| panic!("{}", err));
        assert_eq!(values, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn starting_values_track_the_most_recent_scatter() {
        let mut nlp = fixture();
        assert_eq!(nlp.starting_values(), vec![1.0, 2.0, 0.5]);
        nlp.set_variables(&[9.0, 8.0, 7.0])
            .unwrap_or_else(|err| panic!("{}", err));
        assert_eq!(nlp.starting_values(), vec![9.0, 8.0, 7.0]);
    }

    #[test]
    fn empty_problem_is_rejected_at_first_evaluation() {
        let mut nlp = Nlp::new(VariableContainer::new());
        let err = nlp.evaluate_cost(&[]).unwrap_err();
        assert!(matches!(err, NlpError::EmptyProblem));
        assert_eq!(err.code(), "PROBLEM_EMPTY");
    }

    #[test]
    fn registration_is_frozen_after_first_evaluation() {
        let mut nlp = fixture();
        let x = vec![1.0, 2.0, 0.5];
        let _ = nlp.evaluate_cost(&x).unwrap_or_else(|err| panic!("{}", err));
        let err = nlp
            .add_constraint(Box::new(Shift {
                name: "late".to_string(),
                group: "p".to_string(),
                target: 0.0,
                rows: 1,
            }))
            .unwrap_err();
        assert_eq!(err.code(), "CONTAINER_FROZEN");
    }

    #[test]
    fn report_summarises_the_assembled_layout() {
        let mut nlp = fixture();
        let before = nlp.report();
        assert_eq!(before.jacobian_nnz, None);

        let x = vec![1.0, 2.0, 0.5];
        let _ = nlp
            .evaluate_constraints(&x)
            .unwrap_or_else(|err| panic!("{}", err));
        let report = nlp.report();
        assert_eq!(report.variable_count, 3);
        assert_eq!(report.constraint_count, 2);
        assert_eq!(report.cost_term_count, 1);
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[1].name, "q");
        assert_eq!(report.groups[1].offset, 2);
        assert_eq!(report.sets[0].name, "pin-p");
        assert_eq!(report.jacobian_nnz, Some(4));

        let json = serde_json::to_string(&report).unwrap_or_else(|err| panic!("{}", err));
        assert!(json.contains("\"variable_count\":3"));
    }

    #[test]
    fn feasibility_problem_has_zero_cost() {
        let mut vars = VariableContainer::new();
        vars.add_group(VariableGroup::new("p", vec![1.0]))
            .unwrap_or_else(|err| panic!("{}", err));
        let mut nlp = Nlp::new(vars);
        nlp.add_constraint(Box::new(Shift {
            name: "pin".to_string(),
            group: "p".to_string(),
            target: 0.0,
            rows: 1,
        }))
        .unwrap_or_else(|err| panic!("{}", err));

        assert!(!nlp.has_costs());
        assert_eq!(
            nlp.evaluate_cost(&[2.0]).unwrap_or_else(|err| panic!("{}", err)),
            0.0
        );
        let grad = nlp
            .evaluate_cost_gradient(&[2.0])
            .unwrap_or_else(|err| panic!("{}", err));
        assert_eq!(grad, &[0.0]);
    }
}
