//! Coordinate-format sparse matrix

use std::cell::OnceCell;
use std::path::Path;

use crate::dtype::SemiringElement;
use crate::error::{Error, Result};
use crate::matrix::ellpack::EllpackMatrix;
use crate::matrix::market;

/// Immutable coordinate-format sparse matrix.
///
/// Holds the `(row, col, value)` triples produced by the Matrix-Market
/// loader, 0-based, with symmetric matrices already expanded into explicit
/// mirrored entries. Created once per benchmark run and never mutated;
/// the ELLPACK view is derived lazily and cached.
#[derive(Debug, Clone)]
pub struct CooMatrix<T: SemiringElement> {
    pub(crate) triples: Vec<(usize, usize, T)>,
    rows: usize,
    cols: usize,
    declared_nonzeros: usize,
    ellpack: OnceCell<EllpackMatrix<T>>,
}

impl<T: SemiringElement> CooMatrix<T> {
    /// Create a matrix from already-expanded triples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`]-style validation failure if any index is out
    /// of range for the declared dimensions.
    pub fn new(triples: Vec<(usize, usize, T)>, rows: usize, cols: usize) -> Result<Self> {
        for &(r, c, _) in &triples {
            if r >= rows || c >= cols {
                return Err(Error::load(
                    "<triples>",
                    format!("entry ({r}, {c}) outside {rows} x {cols} matrix"),
                ));
            }
        }
        let declared_nonzeros = triples.len();
        Ok(Self {
            triples,
            rows,
            cols,
            declared_nonzeros,
            ellpack: OnceCell::new(),
        })
    }

    /// Load from a Matrix-Market coordinate file.
    ///
    /// Symmetric matrices are expanded to mirrored triples and pattern
    /// matrices default every value to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] for an unreadable file, a bad banner, an
    /// unsupported typecode, or malformed entries. Callers treat this as
    /// fatal: no partial matrix is produced.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        market::load(path.as_ref())
    }

    pub(crate) fn from_market_parts(
        triples: Vec<(usize, usize, T)>,
        rows: usize,
        cols: usize,
        declared_nonzeros: usize,
    ) -> Self {
        Self {
            triples,
            rows,
            cols,
            declared_nonzeros,
            ellpack: OnceCell::new(),
        }
    }

    /// Number of rows (matrix height)
    #[inline]
    pub fn height(&self) -> usize {
        self.rows
    }

    /// Number of columns (matrix width)
    #[inline]
    pub fn width(&self) -> usize {
        self.cols
    }

    /// Non-zero count as declared by the file header.
    ///
    /// For symmetric matrices the stored triple count is larger because
    /// mirrored entries are explicit.
    #[inline]
    pub fn nonzeros(&self) -> usize {
        self.declared_nonzeros
    }

    /// Stored triple count after symmetric expansion
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.triples.len()
    }

    /// The raw `(row, col, value)` triples
    pub fn triples(&self) -> &[(usize, usize, T)] {
        &self.triples
    }

    /// Fail unless the matrix is square.
    ///
    /// The iterative graph kernels multiply a vector repeatedly by the
    /// matrix, which only makes sense for square inputs.
    pub fn require_square(&self) -> Result<()> {
        if self.rows == self.cols {
            Ok(())
        } else {
            Err(Error::NotSquare {
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    /// The ELLPACK view of this matrix, computed at most once.
    pub fn ellpack(&self) -> &EllpackMatrix<T> {
        self.ellpack.get_or_init(|| EllpackMatrix::from_coo(self))
    }
}
