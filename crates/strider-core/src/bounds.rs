//! Scalar interval bounds for variables and constraint rows.

/// Closed interval `[lower, upper]` attached to one decision variable or one
/// constraint row. Infinite endpoints express one- or two-sided
/// unboundedness.
///
/// Bounds are advisory input to the solver; nothing in the assembly layer
/// clamps values into them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Equality bound `[value, value]`.
    pub fn equal(value: f64) -> Self {
        Self::new(value, value)
    }

    /// One-sided bound `[value, +inf]`.
    pub fn greater_equal(value: f64) -> Self {
        Self::new(value, f64::INFINITY)
    }

    /// One-sided bound `[-inf, value]`.
    pub fn less_equal(value: f64) -> Self {
        Self::new(f64::NEG_INFINITY, value)
    }

    /// Unbounded interval `[-inf, +inf]`.
    pub fn free() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn is_free(&self) -> bool {
        self.lower == f64::NEG_INFINITY && self.upper == f64::INFINITY
    }

    /// Whether `value` lies inside the interval, widened by `tol` on both
    /// sides.
    pub fn contains(&self, value: f64, tol: f64) -> bool {
        value >= self.lower - tol && value <= self.upper + tol
    }

    /// Distance of `value` outside the interval; `0.0` when inside.
    pub fn violation(&self, value: f64) -> f64 {
        if value < self.lower {
            self.lower - value
        } else if value > self.upper {
            value - self.upper
        } else {
            0.0
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::free()
    }
}
