//! Ordered collection of constraint sets with a stacked residual and a
//! single sparse Jacobian.

use std::fmt;

use crate::bounds::Bounds;
use crate::constraint::ConstraintSet;
use crate::error::{ComponentKind, NlpError};
use crate::jacobian::{Jacobian, JacobianBlock};
use crate::variables::VariableContainer;

/// One dense dependency block inside the global pattern.
#[derive(Debug, Clone)]
struct BlockSlot {
    set_index: usize,
    group: String,
    rows: usize,
    cols: usize,
    value_offset: usize,
}

#[derive(Debug)]
struct LinkState {
    jacobian: Jacobian,
    slots: Vec<BlockSlot>,
}

/// Stacks constraint sets into one residual vector of `M` rows and one
/// `M x N` sparse Jacobian.
///
/// Row offsets are assigned in registration order. Linking against a
/// variable container validates every declared dependency, freezes the
/// container, and builds the Jacobian pattern once; later evaluations only
/// rewrite values in pre-allocated slots.
#[derive(Default)]
pub struct ConstraintContainer {
    sets: Vec<Box<dyn ConstraintSet>>,
    row_offsets: Vec<usize>,
    total_rows: usize,
    link: Option<LinkState>,
}

impl ConstraintContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a set at the next free row offset.
    pub fn add_set(&mut self, set: Box<dyn ConstraintSet>) -> Result<(), NlpError> {
        if self.link.is_some() {
            return Err(NlpError::FrozenContainer {
                container: "constraint",
            });
        }
        if self.sets.iter().any(|s| s.name() == set.name()) {
            return Err(NlpError::DuplicateName {
                kind: ComponentKind::ConstraintSet,
                name: set.name().to_string(),
            });
        }

        tracing::debug!(
            component = "constraints",
            operation = "add_set",
            status = "success",
            set = %set.name(),
            rows = set.row_count(),
            row_offset = self.total_rows,
            "Registered constraint set"
        );

        self.row_offsets.push(self.total_rows);
        self.total_rows += set.row_count();
        self.sets.push(set);
        Ok(())
    }

    /// Total row count `M`.
    pub fn row_count(&self) -> usize {
        self.total_rows
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Sets in registration order.
    pub fn sets(&self) -> impl Iterator<Item = &dyn ConstraintSet> {
        self.sets.iter().map(AsRef::as_ref)
    }

    /// Row offsets in registration order.
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Structural non-zero count of the Jacobian, once linked.
    pub fn jacobian_nnz(&self) -> Option<usize> {
        self.link.as_ref().map(|link| link.jacobian.nnz())
    }

    /// Stacked per-row bounds in registration order.
    pub fn row_bounds(&self) -> Vec<Bounds> {
        let mut bounds = Vec::with_capacity(self.total_rows);
        for set in &self.sets {
            let set_bounds = set.row_bounds();
            debug_assert_eq!(set_bounds.len(), set.row_count());
            bounds.extend_from_slice(&set_bounds);
        }
        bounds
    }

    /// Validate dependencies, freeze registration, and build the global
    /// Jacobian pattern. Idempotent; later calls are no-ops.
    ///
    /// Dependency blocks of one set are ordered by the group's registration
    /// offset, dense per block and row-major within, which fixes the
    /// canonical triplet order for the lifetime of the container.
    pub fn link_to(&mut self, vars: &VariableContainer) -> Result<(), NlpError> {
        if self.link.is_some() {
            return Ok(());
        }

        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut slots = Vec::new();

        for (set_index, set) in self.sets.iter().enumerate() {
            let m = set.row_count();
            let row_offset = self.row_offsets[set_index];

            let mut deps: Vec<(usize, String)> = Vec::new();
            for group in set.dependencies() {
                let Some(col_offset) = vars.offset_of(&group) else {
                    return Err(NlpError::UnlinkedGroup {
                        consumer: set.name().to_string(),
                        group,
                    });
                };
                deps.push((col_offset, group));
            }
            deps.sort_by_key(|&(offset, _)| offset);
            deps.dedup_by_key(|&mut (offset, _)| offset);

            for (col_offset, group) in deps {
                let n = vars.group(&group).dim();
                let value_offset = rows.len();
                for r in 0..m {
                    for c in 0..n {
                        rows.push((row_offset + r) as u32);
                        cols.push((col_offset + c) as u32);
                    }
                }
                slots.push(BlockSlot {
                    set_index,
                    group,
                    rows: m,
                    cols: n,
                    value_offset,
                });
            }
        }

        let jacobian = Jacobian::with_pattern(self.total_rows, vars.total_dim(), rows, cols);
        tracing::debug!(
            component = "constraints",
            operation = "link",
            status = "success",
            sets = self.sets.len(),
            rows = self.total_rows,
            cols = vars.total_dim(),
            nnz = jacobian.nnz(),
            blocks = slots.len(),
            "Linked constraint sets and froze the Jacobian pattern"
        );
        self.link = Some(LinkState { jacobian, slots });
        Ok(())
    }

    /// Stack each set's residual into `out` at its row offset.
    pub fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) -> Result<(), NlpError> {
        if out.len() != self.total_rows {
            return Err(NlpError::ShapeMismatch {
                context: "constraint residual buffer",
                expected: self.total_rows,
                actual: out.len(),
            });
        }
        for (set, &offset) in self.sets.iter().zip(&self.row_offsets) {
            set.fill_values(vars, &mut out[offset..offset + set.row_count()]);
        }
        Ok(())
    }

    /// Rewrite the Jacobian values at the current variable state and return
    /// the persistent matrix. Links on first use.
    pub fn refresh_jacobian(&mut self, vars: &VariableContainer) -> Result<&Jacobian, NlpError> {
        self.link_to(vars)?;
        let Some(link) = self.link.as_mut() else {
            unreachable!("link_to installs the link state");
        };

        let LinkState { jacobian, slots } = link;
        let values = jacobian.values_mut();
        values.fill(0.0);
        for slot in slots.iter() {
            let end = slot.value_offset + slot.rows * slot.cols;
            let mut block =
                JacobianBlock::new(slot.rows, slot.cols, &mut values[slot.value_offset..end]);
            self.sets[slot.set_index].fill_jacobian_block(vars, &slot.group, &mut block);
        }
        Ok(&*jacobian)
    }
}

impl fmt::Debug for ConstraintContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintContainer")
            .field(
                "sets",
                &self.sets.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("total_rows", &self.total_rows)
            .field("linked", &self.link.is_some())
            .finish()
    }
}
