//! The device seam the engine drives

use std::time::Duration;

use crate::error::Result;
use crate::run::Run;

/// Device operations the execution engine needs.
///
/// Every operation blocks until the device reports completion; there is no
/// overlap between host and device work across calls. `launch` returns the
/// device-reported elapsed time for the execution itself, independent of
/// host wall-clock time.
pub trait KernelExecutor {
    /// Opaque device buffer identifier
    type Handle: Copy + Eq + std::fmt::Debug;

    /// Upload `data` into a device buffer.
    fn upload(&mut self, handle: Self::Handle, data: &[u8]) -> Result<()>;

    /// Zero-fill a device buffer.
    fn fill_zero(&mut self, handle: Self::Handle) -> Result<()>;

    /// Bind which buffers serve the kernel's input and output argument
    /// slots for subsequent launches.
    ///
    /// When `y` is `Some`, the y-vector argument slot is rebound as well;
    /// the min-plus and label-propagation kernels read the previous
    /// iteration's result through y, so their y slot has to track the
    /// current input buffer across swaps.
    fn bind_io(
        &mut self,
        input: Self::Handle,
        output: Self::Handle,
        y: Option<Self::Handle>,
    ) -> Result<()>;

    /// Launch the kernel over the run's NDRange and block until complete.
    fn launch(&mut self, run: &Run) -> Result<Duration>;

    /// Download a device buffer into `out` (blocking).
    fn download(&mut self, handle: Self::Handle, out: &mut [u8]) -> Result<()>;
}

/// The engine's device buffers, in kernel argument order.
///
/// `x_vect` and `output` are the ping-pong pair; their roles swap every
/// iteration. The rest are uploaded at INIT and rewritten only by the
/// between-trials reset.
#[derive(Debug, Clone)]
pub struct EngineBuffers<H> {
    /// Encoded matrix index buffer
    pub matrix_idxs: H,
    /// Encoded matrix value buffer
    pub matrix_vals: H,
    /// x vector: the initial iteration input
    pub x_vect: H,
    /// y vector
    pub y_vect: H,
    /// Kernel output buffer: the initial iteration output
    pub output: H,
    /// Temp-global buffers, zero-filled before every execution
    pub temp_globals: Vec<H>,
}
