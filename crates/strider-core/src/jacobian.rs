//! Sparse constraint Jacobian with a frozen symbolic pattern.

use crate::error::NlpError;

/// Triplet-stored `M x N` sparse matrix.
///
/// The symbolic pattern (row and column indices) is fixed when the
/// constraint container links against the variables; every later evaluation
/// only rewrites `values` in place. Triplets are kept in the canonical order
/// consumed by flat-value writers: constraint sets in registration order,
/// dependency blocks ordered by the dependent group's registration offset,
/// row-major within each block.
#[derive(Debug, Clone)]
pub struct Jacobian {
    row_count: usize,
    col_count: usize,
    rows: Vec<u32>,
    cols: Vec<u32>,
    values: Vec<f64>,
}

impl Jacobian {
    pub(crate) fn with_pattern(
        row_count: usize,
        col_count: usize,
        rows: Vec<u32>,
        cols: Vec<u32>,
    ) -> Self {
        debug_assert_eq!(rows.len(), cols.len());
        let nnz = rows.len();
        Self {
            row_count,
            col_count,
            rows,
            cols,
            values: vec![0.0; nnz],
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Number of structural non-zero slots.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Non-zero values in canonical triplet order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Iterate `(row, col, value)` in canonical triplet order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r as usize, c as usize, v))
    }

    /// Matrix entry at `(row, col)`; zero for coordinates outside the
    /// pattern. The canonical pattern holds at most one slot per coordinate.
    pub fn value_at(&self, row: usize, col: usize) -> f64 {
        self.triplets()
            .filter(|&(r, c, _)| r == row && c == col)
            .map(|(_, _, v)| v)
            .sum()
    }

    /// Whether `(row, col)` is a structural non-zero of the pattern.
    pub fn is_structural(&self, row: usize, col: usize) -> bool {
        self.triplets().any(|(r, c, _)| r == row && c == col)
    }

    /// Copy the non-zero values into `out` in canonical triplet order.
    pub fn copy_values_into(&self, out: &mut [f64]) -> Result<(), NlpError> {
        if out.len() != self.values.len() {
            return Err(NlpError::ShapeMismatch {
                context: "Jacobian value buffer",
                expected: self.values.len(),
                actual: out.len(),
            });
        }
        out.copy_from_slice(&self.values);
        Ok(())
    }

    /// Dense row-major copy, for diagnostics and tests.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.row_count * self.col_count];
        for (r, c, v) in self.triplets() {
            dense[r * self.col_count + c] += v;
        }
        dense
    }
}

/// Dense row-major view of one `m x n_k` block of the global Jacobian.
///
/// Handed to a constraint set so it can declare derivatives against its own
/// dependency group without knowing global offsets. The caller zeroes the
/// slots beforehand; a set only writes the cells it touches.
#[derive(Debug)]
pub struct JacobianBlock<'a> {
    row_count: usize,
    col_count: usize,
    values: &'a mut [f64],
}

impl<'a> JacobianBlock<'a> {
    pub(crate) fn new(row_count: usize, col_count: usize, values: &'a mut [f64]) -> Self {
        debug_assert_eq!(values.len(), row_count * col_count);
        Self {
            row_count,
            col_count,
            values,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Overwrite the cell at `(row, col)`.
    ///
    /// Panics if the coordinate lies outside the block.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.index(row, col);
        self.values[idx] = value;
    }

    /// Accumulate into the cell at `(row, col)`.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.index(row, col);
        self.values[idx] += value;
    }

    fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.row_count && col < self.col_count,
            "cell ({}, {}) outside {}x{} Jacobian block",
            row,
            col,
            self.row_count,
            self.col_count
        );
        row * self.col_count + col
    }
}
