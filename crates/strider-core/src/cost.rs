//! Cost terms and their weighted-sum container.

use std::fmt;

use crate::error::{ComponentKind, NlpError};
use crate::variables::VariableContainer;

/// A scalar cost contribution with a dense gradient per dependency group.
///
/// Formally a one-row constraint set without bounds; kept as its own
/// abstraction so terms can be weighted and reported separately.
pub trait CostTerm {
    /// Unique name within the cost container.
    fn name(&self) -> &str;

    /// Names of the variable groups this term reads.
    fn dependencies(&self) -> Vec<String>;

    /// Cost value `c(x)` at the current variable state.
    fn value(&self, vars: &VariableContainer) -> f64;

    /// Write `dc/dx_group` into `grad`, whose length equals the group
    /// dimension. `grad` arrives zeroed; never called for undeclared groups.
    fn fill_gradient_block(&self, vars: &VariableContainer, group: &str, grad: &mut [f64]);
}

struct WeightedTerm {
    term: Box<dyn CostTerm>,
    weight: f64,
}

/// Flat-vector placement of one dependency's gradient block, resolved at
/// link time so the evaluation loop never re-queries dependency lists.
struct GradSlot {
    group: String,
    offset: usize,
    dim: usize,
}

/// Weighted sum of cost terms with a stacked global gradient.
///
/// Summation is left-to-right in registration order. Freezes when linked,
/// like the other containers.
#[derive(Default)]
pub struct CostContainer {
    terms: Vec<WeightedTerm>,
    // Per-term gradient slots, parallel to `terms` once linked.
    layout: Vec<Vec<GradSlot>>,
    frozen: bool,
    scratch: Vec<f64>,
}

impl CostContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a term with its weight.
    pub fn add_term(&mut self, term: Box<dyn CostTerm>, weight: f64) -> Result<(), NlpError> {
        if self.frozen {
            return Err(NlpError::FrozenContainer { container: "cost" });
        }
        if self.terms.iter().any(|t| t.term.name() == term.name()) {
            return Err(NlpError::DuplicateName {
                kind: ComponentKind::CostTerm,
                name: term.name().to_string(),
            });
        }

        tracing::debug!(
            component = "costs",
            operation = "add_term",
            status = "success",
            term = %term.name(),
            weight,
            "Registered cost term"
        );

        self.terms.push(WeightedTerm { term, weight });
        Ok(())
    }

    /// True when no terms are registered; the facade reports such problems
    /// to the solver as pure feasibility problems.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Resolve dependency placements, freeze registration, and size the
    /// gradient scratch block. Idempotent.
    pub fn link_to(&mut self, vars: &VariableContainer) -> Result<(), NlpError> {
        if self.frozen {
            return Ok(());
        }
        let mut max_dim = 0;
        let mut layout = Vec::with_capacity(self.terms.len());
        for weighted in &self.terms {
            let mut slots = Vec::new();
            for group in weighted.term.dependencies() {
                let Some(offset) = vars.offset_of(&group) else {
                    return Err(NlpError::UnlinkedGroup {
                        consumer: weighted.term.name().to_string(),
                        group,
                    });
                };
                let dim = vars.group(&group).dim();
                max_dim = max_dim.max(dim);
                slots.push(GradSlot { group, offset, dim });
            }
            slots.sort_by_key(|slot| slot.offset);
            slots.dedup_by_key(|slot| slot.offset);
            layout.push(slots);
        }
        self.layout = layout;
        self.scratch = vec![0.0; max_dim];
        self.frozen = true;
        tracing::debug!(
            component = "costs",
            operation = "link",
            status = "success",
            terms = self.terms.len(),
            "Linked cost terms"
        );
        Ok(())
    }

    /// Weighted total `sum w_t * c_t(x)`; `0.0` with no terms.
    pub fn value(&self, vars: &VariableContainer) -> f64 {
        self.terms
            .iter()
            .map(|weighted| weighted.weight * weighted.term.value(vars))
            .sum()
    }

    /// Accumulate `w_t * dc_t/dx` into `out` at each dependency group's
    /// offset. The caller zero-initialises `out`. Links first if needed;
    /// allocation-free once linked.
    pub fn add_gradient_into(
        &mut self,
        vars: &VariableContainer,
        out: &mut [f64],
    ) -> Result<(), NlpError> {
        self.link_to(vars)?;
        if out.len() != vars.total_dim() {
            return Err(NlpError::ShapeMismatch {
                context: "cost gradient buffer",
                expected: vars.total_dim(),
                actual: out.len(),
            });
        }
        for (weighted, slots) in self.terms.iter().zip(&self.layout) {
            for slot in slots {
                let block = &mut self.scratch[..slot.dim];
                block.fill(0.0);
                weighted.term.fill_gradient_block(vars, &slot.group, block);
                let target = &mut out[slot.offset..slot.offset + slot.dim];
                for (acc, &g) in target.iter_mut().zip(block.iter()) {
                    *acc += weighted.weight * g;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CostContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostContainer")
            .field(
                "terms",
                &self
                    .terms
                    .iter()
                    .map(|t| (t.term.name().to_string(), t.weight))
                    .collect::<Vec<_>>(),
            )
            .field("frozen", &self.frozen)
            .finish()
    }
}
