//! ELLPACK row structure derived from a COO matrix

use crate::dtype::SemiringElement;
use crate::matrix::CooMatrix;

/// One matrix row as ordered `(column, value)` pairs, sorted ascending by
/// column. Length equals the row's non-zero count.
pub type EllpackRow<T> = Vec<(i32, T)>;

/// Whole-matrix ELLPACK structure plus the row statistics the encoder
/// needs: per-row lengths and the matrix-wide maximum row width.
#[derive(Debug, Clone)]
pub struct EllpackMatrix<T: SemiringElement> {
    rows: Vec<EllpackRow<T>>,
    row_lengths: Vec<usize>,
    max_width: usize,
}

impl<T: SemiringElement> EllpackMatrix<T> {
    /// Build from a COO matrix: histogram the row lengths, bucket the
    /// triples per row, and sort each row by column.
    pub(crate) fn from_coo(coo: &CooMatrix<T>) -> Self {
        let height = coo.height();
        let mut row_lengths = vec![0usize; height];
        let mut max_width = 0;
        for &(r, _, _) in coo.triples() {
            row_lengths[r] += 1;
            if row_lengths[r] > max_width {
                max_width = row_lengths[r];
            }
        }

        let mut rows: Vec<EllpackRow<T>> = row_lengths
            .iter()
            .map(|&len| Vec::with_capacity(len))
            .collect();
        for &(r, c, v) in coo.triples() {
            rows[r].push((c as i32, v));
        }
        for row in &mut rows {
            row.sort_by_key(|&(col, _)| col);
        }

        Self {
            rows,
            row_lengths,
            max_width,
        }
    }

    /// Rows in order, each sorted by column
    pub fn rows(&self) -> &[EllpackRow<T>] {
        &self.rows
    }

    /// Non-zero count per row
    pub fn row_lengths(&self) -> &[usize] {
        &self.row_lengths
    }

    /// Longest row's non-zero count
    #[inline]
    pub fn max_width(&self) -> usize {
        self.max_width
    }

    /// Row count
    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }
}
