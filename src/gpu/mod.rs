//! wgpu execution backend
//!
//! [`GpuContext`] owns the adapter, device and queue; [`GpuKernel`]
//! compiles one kernel config into a compute pipeline and implements the
//! [`KernelExecutor`](crate::harness::KernelExecutor) seam the execution
//! engine drives. Kernel timing uses device timestamp queries when the
//! adapter supports them and falls back to host wall-clock time otherwise.

mod context;
mod kernel;

pub use context::GpuContext;
pub use kernel::{GpuBuffer, GpuKernel};
