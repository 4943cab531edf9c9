//! Decision-variable groups and their ordered container.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::bounds::Bounds;
use crate::error::{ComponentKind, NlpError};

/// A named contiguous block of decision variables.
///
/// Created by the driver with an initial value, mutated only through the
/// container's scatter step, and read by constraint sets and cost terms.
/// Values are never clamped to the bounds; the solver is free to probe
/// outside them.
#[derive(Debug, Clone)]
pub struct VariableGroup {
    name: String,
    values: Vec<f64>,
    bounds: Vec<Bounds>,
}

impl VariableGroup {
    /// Create a group seeded with `initial` and free bounds per coordinate.
    ///
    /// Panics if `initial` is empty; a group has dimension `>= 1`.
    pub fn new(name: impl Into<String>, initial: Vec<f64>) -> Self {
        let name = name.into();
        assert!(
            !initial.is_empty(),
            "variable group '{}' must have at least one coordinate",
            name
        );
        let dim = initial.len();
        Self {
            name,
            values: initial,
            bounds: vec![Bounds::free(); dim],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    /// Copy `values` into internal storage. The only mutator of a group.
    pub fn set_values(&mut self, values: &[f64]) -> Result<(), NlpError> {
        if values.len() != self.values.len() {
            return Err(NlpError::ShapeMismatch {
                context: "variable group values",
                expected: self.values.len(),
                actual: values.len(),
            });
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    /// Replace the per-coordinate bounds.
    pub fn set_bounds(&mut self, bounds: Vec<Bounds>) -> Result<(), NlpError> {
        if bounds.len() != self.values.len() {
            return Err(NlpError::ShapeMismatch {
                context: "variable group bounds",
                expected: self.values.len(),
                actual: bounds.len(),
            });
        }
        self.bounds = bounds;
        Ok(())
    }

    /// Apply the same bound to every coordinate.
    pub fn set_uniform_bounds(&mut self, bounds: Bounds) {
        self.bounds.fill(bounds);
    }
}

/// Ordered collection of variable groups with a flat-vector view.
///
/// Each group occupies a fixed offset range of the global vector, assigned
/// in registration order. The container freezes on the first flat access
/// (`flat_values`, `gather_into`, `scatter`, `flat_bounds`); offsets never
/// shift afterwards and further registration fails.
#[derive(Debug, Clone, Default)]
pub struct VariableContainer {
    groups: Vec<VariableGroup>,
    index: BTreeMap<String, usize>,
    offsets: Vec<usize>,
    total_dim: usize,
    frozen: Cell<bool>,
}

impl VariableContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group at the next free offset.
    pub fn add_group(&mut self, group: VariableGroup) -> Result<(), NlpError> {
        if self.frozen.get() {
            return Err(NlpError::FrozenContainer {
                container: "variable",
            });
        }
        if self.index.contains_key(group.name()) {
            return Err(NlpError::DuplicateName {
                kind: ComponentKind::VariableGroup,
                name: group.name().to_string(),
            });
        }

        tracing::debug!(
            component = "variables",
            operation = "add_group",
            status = "success",
            group = %group.name(),
            dim = group.dim(),
            offset = self.total_dim,
            "Registered variable group"
        );

        self.index.insert(group.name().to_string(), self.groups.len());
        self.offsets.push(self.total_dim);
        self.total_dim += group.dim();
        self.groups.push(group);
        Ok(())
    }

    /// Total dimension `N` of the flat vector.
    pub fn total_dim(&self) -> usize {
        self.total_dim
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    /// Groups in registration order.
    pub fn groups(&self) -> impl Iterator<Item = &VariableGroup> {
        self.groups.iter()
    }

    pub fn try_group(&self, name: &str) -> Option<&VariableGroup> {
        self.index.get(name).map(|&i| &self.groups[i])
    }

    /// Look up a group by name.
    ///
    /// Panics if the name is unknown. Constraint sets and cost terms only
    /// query groups they declared as dependencies, and those are validated
    /// when the containers link.
    pub fn group(&self, name: &str) -> &VariableGroup {
        match self.try_group(name) {
            Some(group) => group,
            None => panic!("variable group '{}' is not registered", name),
        }
    }

    /// Current values of a group, by name. Panics like [`Self::group`].
    pub fn values_of(&self, name: &str) -> &[f64] {
        self.group(name).values()
    }

    /// Offset of a group's first coordinate in the flat vector.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|&i| self.offsets[i])
    }

    /// Group offsets in registration order.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Concatenated group values in registration order. Freezes.
    pub fn flat_values(&self) -> Vec<f64> {
        self.freeze();
        let mut flat = Vec::with_capacity(self.total_dim);
        for group in &self.groups {
            flat.extend_from_slice(group.values());
        }
        flat
    }

    /// Write the concatenated values into `out` without allocating. Freezes.
    pub fn gather_into(&self, out: &mut [f64]) -> Result<(), NlpError> {
        self.freeze();
        if out.len() != self.total_dim {
            return Err(NlpError::ShapeMismatch {
                context: "flat variable vector",
                expected: self.total_dim,
                actual: out.len(),
            });
        }
        for (group, &offset) in self.groups.iter().zip(&self.offsets) {
            out[offset..offset + group.dim()].copy_from_slice(group.values());
        }
        Ok(())
    }

    /// Distribute the flat vector `x` back to the groups. Freezes.
    ///
    /// On a length mismatch nothing is written and every group keeps its
    /// previous values.
    pub fn scatter(&mut self, x: &[f64]) -> Result<(), NlpError> {
        self.freeze();
        if x.len() != self.total_dim {
            return Err(NlpError::ShapeMismatch {
                context: "flat variable vector",
                expected: self.total_dim,
                actual: x.len(),
            });
        }
        for (group, &offset) in self.groups.iter_mut().zip(&self.offsets) {
            let dim = group.dim();
            group.values.copy_from_slice(&x[offset..offset + dim]);
        }
        Ok(())
    }

    /// Concatenated per-coordinate bounds in registration order. Freezes.
    pub fn flat_bounds(&self) -> Vec<Bounds> {
        self.freeze();
        let mut flat = Vec::with_capacity(self.total_dim);
        for group in &self.groups {
            flat.extend_from_slice(group.bounds());
        }
        flat
    }

    fn freeze(&self) {
        if !self.frozen.replace(true) {
            tracing::debug!(
                component = "variables",
                operation = "freeze",
                status = "success",
                groups = self.groups.len(),
                total_dim = self.total_dim,
                "Froze variable registration"
            );
        }
    }
}
