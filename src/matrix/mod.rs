//! Sparse matrix loading and host-side representations
//!
//! - `coo` — coordinate-format matrix, the loader's output
//! - `ellpack` — per-row sorted (column, value) structure derived from COO
//! - `market` — Matrix-Market file parser

mod coo;
mod ellpack;
mod market;

pub use coo::CooMatrix;
pub use ellpack::{EllpackMatrix, EllpackRow};
