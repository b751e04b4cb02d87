//! Device bootstrap
//!
//! `GpuContext` owns the wgpu device and queue for one benchmark process.
//! Adapters are selected by enumeration index so sweeps on multi-GPU hosts
//! can pin a specific card.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use wgpu::{Adapter, Backend, Buffer, BufferDescriptor, BufferUsages, Device, Limits, Queue};

use crate::error::{Error, Result};

/// How long to wait for the device before declaring it wedged.
const DEVICE_WAIT: Duration = Duration::from_secs(60);

/// An initialized GPU: adapter info plus the device/queue pair every
/// kernel on this process submits through.
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    adapter_name: String,
    backend: Backend,
    limits: Limits,
    timestamps_supported: bool,
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter_name)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl GpuContext {
    /// Initialize the adapter at `index` (enumeration order) and request a
    /// device from it.
    ///
    /// An out-of-range index falls back to the highest-performance adapter
    /// rather than failing, so single-GPU configs work unchanged on any
    /// host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gpu`] when no adapter exists or device creation
    /// fails.
    pub fn new(index: usize) -> Result<Self> {
        let adapter = pollster::block_on(select_adapter(index))?;
        let info = adapter.get_info();
        let limits = adapter.limits();

        let features = adapter.features();
        let timestamps_supported = features.contains(wgpu::Features::TIMESTAMP_QUERY);
        let required_features = if timestamps_supported {
            wgpu::Features::TIMESTAMP_QUERY
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("ellbench device"),
            required_features,
            // The encoder checks sizes against the adapter's real buffer
            // limits, so the device must carry them too.
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
            experimental_features: wgpu::ExperimentalFeatures::default(),
        }))
        .map_err(|e| Error::Gpu(format!("device request failed: {e:?}")))?;

        info!(
            "using adapter '{}' ({:?}), timestamps {}",
            info.name,
            info.backend,
            if timestamps_supported { "on" } else { "off" }
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name: info.name,
            backend: info.backend,
            limits,
            timestamps_supported,
        })
    }

    /// Adapter name as reported by the driver.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Backend the adapter runs on (Vulkan, Metal, DX12, ...).
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Largest single buffer this device will allocate, in bytes.
    ///
    /// The encoder rejects matrices whose encoded buffers would exceed
    /// this before any allocation happens.
    pub fn max_allocation(&self) -> u64 {
        self.limits
            .max_buffer_size
            .min(u64::from(self.limits.max_storage_buffer_binding_size))
    }

    /// Whether kernel timing comes from device timestamp queries.
    pub fn timestamps_supported(&self) -> bool {
        self.timestamps_supported
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    pub(crate) fn queue(&self) -> &Queue {
        &self.queue
    }

    /// A shader-visible buffer that can also serve as a copy endpoint.
    pub(crate) fn create_storage_buffer(&self, label: &str, size: u64) -> Buffer {
        self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    /// A mappable buffer for GPU-to-host readback.
    pub(crate) fn create_staging_buffer(&self, label: &str, size: u64) -> Buffer {
        self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// A uniform buffer for the kernel's scalar argument block.
    pub(crate) fn create_uniform_buffer(&self, label: &str, size: u64) -> Buffer {
        self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Submit one encoder's commands and block until the device has
    /// executed them.
    pub(crate) fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) -> Result<()> {
        let submission = self.queue.submit(std::iter::once(encoder.finish()));
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: Some(DEVICE_WAIT),
            })
            .map_err(|e| Error::Gpu(format!("device poll failed: {e}")))?;
        Ok(())
    }

    /// Flush pending queue writes and block until they land.
    pub(crate) fn flush(&self) -> Result<()> {
        let submission = self.queue.submit(std::iter::empty());
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: Some(DEVICE_WAIT),
            })
            .map_err(|e| Error::Gpu(format!("device poll failed: {e}")))?;
        Ok(())
    }

    /// Map the leading bytes of a staging buffer and copy the first
    /// `out.len()` into `out` (blocking).
    ///
    /// Mapped range sizes must be 4-byte multiples, so the range is
    /// rounded up; staging buffers are allocated 4-byte aligned.
    pub(crate) fn read_staging(&self, staging: &Buffer, out: &mut [u8]) -> Result<()> {
        let slice = staging.slice(..map_len(out.len()));

        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(DEVICE_WAIT),
            })
            .map_err(|e| Error::Gpu(format!("poll failed during readback: {e}")))?;

        receiver
            .recv()
            .map_err(|_| Error::Gpu("map_async callback was not invoked".into()))?
            .map_err(|e| Error::Gpu(format!("map_async failed: {e}")))?;

        {
            let data = slice.get_mapped_range();
            out.copy_from_slice(&data[..out.len()]);
        }
        staging.unmap();
        Ok(())
    }
}

/// Byte length to map for a readback of `len` bytes, rounded up to the
/// 4-byte map granularity.
fn map_len(len: usize) -> u64 {
    (len as u64).div_ceil(4) * 4
}

/// Pick an adapter by enumeration index, falling back to the
/// high-performance default when the index is out of range.
async fn select_adapter(index: usize) -> Result<Adapter> {
    let instance = wgpu::Instance::default();

    let mut adapters: Vec<_> = instance.enumerate_adapters(wgpu::Backends::all()).await;
    if adapters.is_empty() {
        return Err(Error::Gpu("no GPU adapter found".into()));
    }

    if index < adapters.len() {
        Ok(adapters.swap_remove(index))
    } else {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| Error::Gpu("no GPU adapter found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::map_len;

    #[test]
    fn map_length_rounds_up_to_four_bytes() {
        assert_eq!(map_len(0), 0);
        assert_eq!(map_len(1), 4);
        assert_eq!(map_len(4), 4);
        assert_eq!(map_len(13), 16);
        assert_eq!(map_len(16), 16);
    }
}
