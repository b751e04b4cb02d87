//! Convergence-driven iterative kernel execution
//!
//! One generic engine drives every benchmark: launch the kernel over the
//! run's NDRange, download the output, compare against the input under the
//! element type's equality policy, swap the ping-pong buffer roles, and
//! repeat until a fixed point, the iteration cap, or the timeout.
//!
//! The engine talks to the device exclusively through [`KernelExecutor`],
//! so trials run identically against the wgpu backend and against the
//! in-memory executor the tests use.

mod convergence;
mod engine;
mod executor;

pub use convergence::buffers_equal;
pub use engine::{ExecutionEngine, TrialOptions, TrialOutcome, TrialResult};
pub use executor::{EngineBuffers, KernelExecutor};
