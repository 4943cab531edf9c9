//! Human-readable constraint status report.

use std::fmt::Write as _;

use crate::constraint::ConstraintContainer;
use crate::variables::VariableContainer;

const NAME_HEADER: &str = "constraint set";

impl ConstraintContainer {
    /// Render one line per set: name, global row range, max bound violation
    /// of the residual at the current variable state, and an `ok`/`VIOLATED`
    /// marker against `tol`.
    ///
    /// Diagnostic path; allocates freely and is not meant for the solver
    /// loop. The line layout is stable within a version.
    pub fn format_status(&self, vars: &VariableContainer, tol: f64) -> String {
        let name_width = self
            .sets()
            .map(|set| set.name().len())
            .chain(std::iter::once(NAME_HEADER.len()))
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<name_width$}  {:>14}  {:>13}  status",
            NAME_HEADER, "rows", "max violation",
        );

        let mut residual = Vec::new();
        for (set, &offset) in self.sets().zip(self.row_offsets()) {
            let m = set.row_count();
            residual.clear();
            residual.resize(m, 0.0);
            set.fill_values(vars, &mut residual);

            let bounds = set.row_bounds();
            let max_violation = residual
                .iter()
                .zip(&bounds)
                .map(|(&value, bound)| bound.violation(value))
                .fold(0.0_f64, f64::max);

            let marker = if max_violation > tol { "VIOLATED" } else { "ok" };
            let range = format!("[{}, {})", offset, offset + m);
            let _ = writeln!(
                out,
                "{:<name_width$}  {:>14}  {:>13.3e}  {}",
                set.name(),
                range,
                max_violation,
                marker,
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::bounds::Bounds;
    use crate::constraint::{ConstraintContainer, ConstraintSet};
    use crate::jacobian::JacobianBlock;
    use crate::variables::{VariableContainer, VariableGroup};

    /// One-row set pinning a single coordinate to a target value.
    struct Pin {
        name: String,
        group: String,
        target: f64,
    }

    impl ConstraintSet for Pin {
        fn name(&self) -> &str {
            &self.name
        }

        fn row_count(&self) -> usize {
            1
        }

        fn row_bounds(&self) -> Vec<Bounds> {
            vec![Bounds::equal(self.target)]
        }

        fn dependencies(&self) -> Vec<String> {
            vec![self.group.clone()]
        }

        fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) {
            out[0] = vars.values_of(&self.group)[0];
        }

        fn fill_jacobian_block(
            &self,
            _vars: &VariableContainer,
            _group: &str,
            block: &mut JacobianBlock<'_>,
        ) {
            block.set(0, 0, 1.0);
        }
    }

    #[test]
    fn status_marks_violated_sets_with_their_max_violation() {
        let mut vars = VariableContainer::new();
        vars.add_group(VariableGroup::new("u", vec![0.0]))
            .unwrap_or_else(|err| panic!("{}", err));
        vars.add_group(VariableGroup::new("v", vec![0.3]))
            .unwrap_or_else(|err| panic!("{}", err));

        let mut constraints = ConstraintContainer::new();
        constraints
            .add_set(Box::new(Pin {
                name: "anchored".to_string(),
                group: "u".to_string(),
                target: 0.0,
            }))
            .unwrap_or_else(|err| panic!("{}", err));
        constraints
            .add_set(Box::new(Pin {
                name: "drifting".to_string(),
                group: "v".to_string(),
                target: 0.0,
            }))
            .unwrap_or_else(|err| panic!("{}", err));

        let rendered = constraints.format_status(&vars, 1e-6);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("anchored"));
        assert!(lines[1].contains("[0, 1)"));
        assert!(lines[1].ends_with("ok"));
        assert!(lines[2].starts_with("drifting"));
        assert!(lines[2].contains("[1, 2)"));
        assert!(lines[2].contains("3.000e-1"));
        assert!(lines[2].ends_with("VIOLATED"));
    }
}
