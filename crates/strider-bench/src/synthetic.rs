//! Synthetic whole-body problem generator for benchmarking.
//!
//! Builds a trajectory-optimization shaped problem: a floating base sampled
//! at `nodes` points, four feet with contact forces, linear dynamics and
//! kinematic-range coupling, unilateral normal forces and a force-smoothness
//! objective. The forms are simple enough for analytic Jacobians while
//! reproducing the block structure of a real gait problem.

use strider_core::{
    Bounds, ConstraintSet, CostTerm, JacobianBlock, Nlp, VariableContainer, VariableGroup,
};

pub const FOOT_COUNT: usize = 4;
const BASE_MASS: f64 = 20.0;
const REACH: f64 = 0.4;
const MAX_NORMAL_FORCE: f64 = 400.0;

/// `g = base - (1/m) * sum_f force_f`, one row per base coordinate.
/// All Jacobian blocks are diagonal.
struct DynamicsSet {
    rows: usize,
    force_groups: Vec<String>,
}

impl ConstraintSet for DynamicsSet {
    fn name(&self) -> &str {
        "dynamics"
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn row_bounds(&self) -> Vec<Bounds> {
        vec![Bounds::equal(0.0); self.rows]
    }

    fn dependencies(&self) -> Vec<String> {
        let mut deps = vec!["base-lin".to_string()];
        deps.extend(self.force_groups.iter().cloned());
        deps
    }

    fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) {
        out.copy_from_slice(vars.values_of("base-lin"));
        for group in &self.force_groups {
            for (slot, &f) in out.iter_mut().zip(vars.values_of(group)) {
                *slot -= f / BASE_MASS;
            }
        }
    }

    fn fill_jacobian_block(
        &self,
        _vars: &VariableContainer,
        group: &str,
        block: &mut JacobianBlock<'_>,
    ) {
        let value = if group == "base-lin" {
            1.0
        } else {
            -1.0 / BASE_MASS
        };
        for i in 0..self.rows {
            block.set(i, i, value);
        }
    }
}

/// `g = foot - base`, bounded by the leg reach per coordinate.
struct KinematicSet {
    name: String,
    foot: String,
    rows: usize,
}

impl ConstraintSet for KinematicSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn row_bounds(&self) -> Vec<Bounds> {
        vec![Bounds::new(-REACH, REACH); self.rows]
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.foot.clone(), "base-lin".to_string()]
    }

    fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) {
        let foot = vars.values_of(&self.foot);
        let base = vars.values_of("base-lin");
        for (slot, (&p, &b)) in out.iter_mut().zip(foot.iter().zip(base)) {
            *slot = p - b;
        }
    }

    fn fill_jacobian_block(
        &self,
        _vars: &VariableContainer,
        group: &str,
        block: &mut JacobianBlock<'_>,
    ) {
        let value = if group == self.foot { 1.0 } else { -1.0 };
        for i in 0..self.rows {
            block.set(i, i, value);
        }
    }
}

/// Unilateral contact: the z component of each force node must stay in
/// `[0, MAX_NORMAL_FORCE]`. One row per node.
struct NormalForceSet {
    name: String,
    force: String,
    nodes: usize,
}

impl ConstraintSet for NormalForceSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.nodes
    }

    fn row_bounds(&self) -> Vec<Bounds> {
        vec![Bounds::new(0.0, MAX_NORMAL_FORCE); self.nodes]
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.force.clone()]
    }

    fn fill_values(&self, vars: &VariableContainer, out: &mut [f64]) {
        let force = vars.values_of(&self.force);
        for (node, slot) in out.iter_mut().enumerate() {
            *slot = force[3 * node + 2];
        }
    }

    fn fill_jacobian_block(
        &self,
        _vars: &VariableContainer,
        _group: &str,
        block: &mut JacobianBlock<'_>,
    ) {
        for node in 0..self.nodes {
            block.set(node, 3 * node + 2, 1.0);
        }
    }
}

/// `c = sum_k ||f_{k+1} - f_k||^2` over the force nodes of one foot.
struct ForceSmoothnessCost {
    name: String,
    force: String,
    nodes: usize,
}

impl CostTerm for ForceSmoothnessCost {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.force.clone()]
    }

    fn value(&self, vars: &VariableContainer) -> f64 {
        let force = vars.values_of(&self.force);
        let mut total = 0.0;
        for node in 0..self.nodes.saturating_sub(1) {
            for axis in 0..3 {
                let step = force[3 * (node + 1) + axis] - force[3 * node + axis];
                total += step * step;
            }
        }
        total
    }

    fn fill_gradient_block(&self, vars: &VariableContainer, _group: &str, grad: &mut [f64]) {
        let force = vars.values_of(&self.force);
        for node in 0..self.nodes.saturating_sub(1) {
            for axis in 0..3 {
                let lo = 3 * node + axis;
                let hi = 3 * (node + 1) + axis;
                let step = force[hi] - force[lo];
                grad[lo] -= 2.0 * step;
                grad[hi] += 2.0 * step;
            }
        }
    }
}

/// Assemble the synthetic problem for a trajectory with `nodes` samples.
pub fn build_problem(nodes: usize) -> Nlp {
    let base_dim = 3 * nodes;
    let mut vars = VariableContainer::new();
    vars.add_group(VariableGroup::new("base-lin", vec![0.0; base_dim]))
        .unwrap_or_else(|err| panic!("{}", err));
    vars.add_group(VariableGroup::new("base-ang", vec![0.0; base_dim]))
        .unwrap_or_else(|err| panic!("{}", err));

    let mut force_groups = Vec::with_capacity(FOOT_COUNT);
    for foot in 0..FOOT_COUNT {
        vars.add_group(VariableGroup::new(format!("foot-{}", foot), vec![0.0; base_dim]))
            .unwrap_or_else(|err| panic!("{}", err));
        let force = format!("force-{}", foot);
        let mut group = VariableGroup::new(force.clone(), vec![0.0; base_dim]);
        group.set_uniform_bounds(Bounds::new(-MAX_NORMAL_FORCE, MAX_NORMAL_FORCE));
        vars.add_group(group).unwrap_or_else(|err| panic!("{}", err));
        force_groups.push(force);
    }

    let mut nlp = Nlp::new(vars);
    nlp.add_constraint(Box::new(DynamicsSet {
        rows: base_dim,
        force_groups: force_groups.clone(),
    }))
    .unwrap_or_else(|err| panic!("{}", err));
    for foot in 0..FOOT_COUNT {
        nlp.add_constraint(Box::new(KinematicSet {
            name: format!("kinematic-{}", foot),
            foot: format!("foot-{}", foot),
            rows: base_dim,
        }))
        .unwrap_or_else(|err| panic!("{}", err));
        nlp.add_constraint(Box::new(NormalForceSet {
            name: format!("normal-force-{}", foot),
            force: force_groups[foot].clone(),
            nodes,
        }))
        .unwrap_or_else(|err| panic!("{}", err));
        nlp.add_cost(
            Box::new(ForceSmoothnessCost {
                name: format!("force-smoothness-{}", foot),
                force: force_groups[foot].clone(),
                nodes,
            }),
            1e-2,
        )
        .unwrap_or_else(|err| panic!("{}", err));
    }
    nlp
}
