//! Dense value table backing the recursion buffers.

use crate::wealth::TransitionPosition;
use serde::Serialize;

/// Row-major `f64` matrix. Tables carry one padding row and column past the
/// wealth grid so a transition position at the last interior index can read
/// `index + 1` without branching.
#[derive(Debug, Clone, Serialize)]
pub struct ValueTable {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl ValueTable {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn constant(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn at(&self, r: usize, c: usize) -> f64 {
        debug_assert!(r < self.rows && c < self.cols);
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        debug_assert!(r < self.rows && c < self.cols);
        self.data[r * self.cols + c] = value;
    }

    /// Interpolate along row `r` at a column position.
    #[inline]
    pub fn row_interp(&self, r: usize, pos: TransitionPosition) -> f64 {
        self.at(r, pos.index) * pos.weight + self.at(r, pos.index + 1) * (1.0 - pos.weight)
    }

    /// Interpolate down column `c` at a row position.
    #[inline]
    pub fn col_interp(&self, pos: TransitionPosition, c: usize) -> f64 {
        self.at(pos.index, c) * pos.weight + self.at(pos.index + 1, c) * (1.0 - pos.weight)
    }

    /// Bilinear interpolation at a (row, column) position pair.
    pub fn bilinear(&self, rpos: TransitionPosition, cpos: TransitionPosition) -> f64 {
        rpos.weight * self.row_interp(rpos.index, cpos)
            + (1.0 - rpos.weight) * self.row_interp(rpos.index + 1, cpos)
    }

    /// Copy the last row and column from their interior neighbors so padding
    /// reads stay consistent with the solved region.
    pub fn mirror_padding(&mut self) {
        if self.rows < 2 || self.cols < 2 {
            return;
        }
        for c in 0..self.cols {
            let v = self.at(self.rows - 2, c);
            self.set(self.rows - 1, c, v);
        }
        for r in 0..self.rows {
            let v = self.at(r, self.cols - 2);
            self.set(r, self.cols - 1, v);
        }
    }

    /// Rows as slices, for serialization.
    pub fn row_slices(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(index: usize, weight: f64) -> TransitionPosition {
        TransitionPosition { index, weight }
    }

    #[test]
    fn interpolation_mixes_neighbors() {
        let mut t = ValueTable::zeros(3, 3);
        t.set(1, 0, 2.0);
        t.set(1, 1, 4.0);
        t.set(2, 1, 8.0);
        assert_eq!(t.row_interp(1, pos(0, 0.25)), 2.0 * 0.25 + 4.0 * 0.75);
        assert_eq!(t.col_interp(pos(1, 0.5), 1), 4.0 * 0.5 + 8.0 * 0.5);
    }

    #[test]
    fn bilinear_reduces_to_corner_at_unit_weights() {
        let mut t = ValueTable::constant(3, 3, 7.0);
        t.set(0, 0, 1.0);
        assert_eq!(t.bilinear(pos(0, 1.0), pos(0, 1.0)), 1.0);
        // half weights average the four corners
        let mut q = ValueTable::zeros(3, 3);
        q.set(0, 0, 1.0);
        q.set(0, 1, 2.0);
        q.set(1, 0, 3.0);
        q.set(1, 1, 4.0);
        assert_eq!(q.bilinear(pos(0, 0.5), pos(0, 0.5)), 2.5);
    }

    #[test]
    fn mirror_padding_copies_interior_edge() {
        let mut t = ValueTable::zeros(3, 3);
        t.set(1, 1, 5.0);
        t.mirror_padding();
        assert_eq!(t.at(2, 1), 5.0);
        assert_eq!(t.at(1, 2), 5.0);
        assert_eq!(t.at(2, 2), 5.0);
    }
}
