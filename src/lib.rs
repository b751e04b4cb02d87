//! # ellbench
//!
//! **Sparse-matrix GPU kernel benchmarking: binary matrix encoding and a
//! convergence-driven execution engine.**
//!
//! ellbench takes generated sparse-matrix kernels (SpMV and the iterative
//! graph algorithms built on it), encodes a Matrix-Market matrix into the
//! exact binary layout each kernel expects, and sweeps NDRange
//! configurations over it, timing every kernel execution and iterating
//! each configuration to a numeric fixed point.
//!
//! ## What it does
//!
//! - **Encoding**: padded ELLPACK, chunk-padded, and ragged
//!   self-describing layouts, produced as byte-exact index/value buffer
//!   pairs with allocation-limit guarding
//! - **Execution**: ping-pong buffered iteration with type-aware
//!   convergence detection, iteration caps, and adaptive timeouts
//! - **Reporting**: per-execution timings with median/sum aggregates,
//!   rendered as SQL INSERT statements
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ellbench::matrix::CooMatrix;
//! use ellbench::encode::{encode, EncodingFlags};
//!
//! let matrix = CooMatrix::<f32>::from_file("graph.mtx")?;
//! let encoded = encode(&matrix, &EncodingFlags::regular(0.0), limit)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod config;
pub mod dtype;
pub mod encode;
pub mod error;
pub mod gpu;
pub mod harness;
pub mod matrix;
pub mod report;
pub mod run;
pub mod vector;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::args::ArgContainer;
    pub use crate::config::KernelConfig;
    pub use crate::dtype::SemiringElement;
    pub use crate::encode::{encode, EncodedMatrix, EncodingFlags};
    pub use crate::error::{Error, Result};
    pub use crate::harness::{ExecutionEngine, KernelExecutor, TrialOptions, TrialOutcome};
    pub use crate::matrix::CooMatrix;
    pub use crate::run::Run;
    pub use crate::vector::VectorStrategy;
}
