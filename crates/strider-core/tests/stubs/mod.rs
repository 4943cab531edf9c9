//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use strider_core::{Bounds, ConstraintSet, CostTerm, JacobianBlock, VariableContainer};

/// `g = A * x - b` over a single group, with a dense coefficient matrix.
pub struct LinearConstraint {
    pub name: String,
    pub group: String,
    /// Row-major, `rows x dim` of the group.
    pub coefficients: Vec<f64>,
    pub rhs: Vec<f64>,
}

impl LinearConstraint {
    pub fn rows(&self) -> usize {
        self.rhs.len()
    }
}

impl ConstraintSet for LinearConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.rows()
    }

    fn row_bounds(&self) -> Vec<Bounds> {
        vec![Bounds::equal(0.0); self.rows()]
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.group.clone()]
    }

    fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) {
        let x = vars.values_of(&self.group);
        let dim = x.len();
        for (row, slot) in out.iter_mut().enumerate() {
            let mut acc = -self.rhs[row];
            for (col, &value) in x.iter().enumerate() {
                acc += self.coefficients[row * dim + col] * value;
            }
            *slot = acc;
        }
    }

    fn fill_jacobian_block(
        &self,
        vars: &VariableContainer,
        _group: &str,
        block: &mut JacobianBlock<'_>,
    ) {
        let dim = vars.values_of(&self.group).len();
        for row in 0..self.rows() {
            for col in 0..dim {
                block.set(row, col, self.coefficients[row * dim + col]);
            }
        }
    }
}

/// `g_i = a_i * b_i - target` coupling two groups of equal dimension.
/// Both Jacobian blocks are diagonal.
pub struct CouplingSet {
    pub name: String,
    pub first: String,
    pub second: String,
    pub target: f64,
}

impl ConstraintSet for CouplingSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        3
    }

    fn row_bounds(&self) -> Vec<Bounds> {
        vec![Bounds::equal(0.0); 3]
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.first.clone(), self.second.clone()]
    }

    fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) {
        let a = vars.values_of(&self.first);
        let b = vars.values_of(&self.second);
        for (slot, (&ai, &bi)) in out.iter_mut().zip(a.iter().zip(b)) {
            *slot = ai * bi - self.target;
        }
    }

    fn fill_jacobian_block(
        &self,
        vars: &VariableContainer,
        group: &str,
        block: &mut JacobianBlock<'_>,
    ) {
        let other = if group == self.first {
            vars.values_of(&self.second)
        } else {
            vars.values_of(&self.first)
        };
        for (row, &value) in other.iter().enumerate() {
            block.set(row, row, value);
        }
    }
}

/// `c = sum x_i^2` over one group, gradient `2 x`.
pub struct SquaredNormCost {
    pub name: String,
    pub group: String,
}

impl CostTerm for SquaredNormCost {
    fn name(&self) -> &str {
        &self.name
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

/// `c = sum sin(x_i)` over one group, gradient `cos(x_i)`.
pub struct SineCost {
    pub name: String,
    pub group: String,
}

impl CostTerm for SineCost {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.group.clone()]
    }

    fn value(&self, vars: &VariableContainer) -> f64 {
        vars.values_of(&self.group).iter().map(|x| x.sin()).sum()
    }

    fn fill_gradient_block(&self, vars: &VariableContainer, _group: &str, grad: &mut [f64]) {
        for (g, &x) in grad.iter_mut().zip(vars.values_of(&self.group)) {
            *g = x.cos();
        }
    }
}

/// Deterministic sample generator for sweep tests (splitmix64).
pub struct Samples {
    state: u64,
}

impl Samples {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[-range, range)`.
    pub fn next_f64(&mut self, range: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        (2.0 * unit - 1.0) * range
    }

    pub fn vector(&mut self, len: usize, range: f64) -> Vec<f64> {
        (0..len).map(|_| self.next_f64(range)).collect()
    }
}
