//! Error types for ellbench

use thiserror::Error;

/// Result type alias using ellbench's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ellbench operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input file (matrix, kernel config, run list) could not be loaded
    ///
    /// Fatal at the application level: there is nothing to benchmark
    /// without the input.
    #[error("Failed to load {path}: {reason}")]
    Load {
        /// Path of the offending file
        path: String,
        /// Human-readable failure description
        reason: String,
    },

    /// Matrix shape does not meet an algorithm requirement
    ///
    /// The graph applications iterate `x = A * x` and need a square matrix.
    #[error("Matrix is not square: {rows} rows x {cols} cols")]
    NotSquare {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// Encoded index buffer would exceed the device allocation limit
    ///
    /// Raised before any buffer is allocated, so the caller can report it
    /// and carry on without having touched the device.
    #[error("Encoded matrix needs {attempted} bytes but device limit is {limit}")]
    AllocationOverflow {
        /// Byte size the encoder would have allocated
        attempted: u64,
        /// Device maximum single-allocation size
        limit: u64,
    },

    /// A buffer write or read fell outside the buffer's declared size
    #[error("Buffer access out of bounds: offset {offset} + {len} bytes in buffer of {size}")]
    BufferOverrun {
        /// Byte offset of the access
        offset: usize,
        /// Length of the access in bytes
        len: usize,
        /// Declared buffer size in bytes
        size: usize,
    },

    /// Kernel-config size expression could not be evaluated
    #[error("Bad size expression '{expr}': {reason}")]
    Expr {
        /// The offending expression text
        expr: String,
        /// Parse or evaluation failure description
        reason: String,
    },

    /// Kernel configuration is structurally invalid
    #[error("Invalid kernel config: {0}")]
    Config(String),

    /// GPU initialization or dispatch failed
    #[error("GPU error: {0}")]
    Gpu(String),
}

impl Error {
    /// Create a load error for a path
    pub fn load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an expression error
    pub fn expr(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Expr {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code the application should use for this error
    ///
    /// Non-square matrices exit with a distinct code so sweep scripts can
    /// tell "wrong input" from "broken input".
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotSquare { .. } => 2,
            _ => 1,
        }
    }
}
