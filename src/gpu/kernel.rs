//! One compiled kernel and its device buffers
//!
//! `GpuKernel` turns a kernel config into a compute pipeline with a fixed
//! binding order: matrix indices, matrix values, x vector, y vector, temp
//! globals in declaration order, output, then a uniform block carrying
//! alpha, beta and the three size scalars. Temp locals live as workgroup
//! arrays inside the kernel source and never bind host-side.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType, BufferUsages, ComputePipeline,
    ShaderStages,
};

use crate::args::ArgContainer;
use crate::config::KernelConfig;
use crate::dtype::SemiringElement;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::harness::{EngineBuffers, KernelExecutor};
use crate::run::Run;

/// Opaque device buffer handle; an index into the kernel's buffer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBuffer(usize);

struct Timestamps {
    query_set: wgpu::QuerySet,
    resolve: Buffer,
    staging: Buffer,
    /// Nanoseconds per timestamp tick
    period: f32,
}

/// A compiled kernel bound to its argument buffers.
pub struct GpuKernel {
    ctx: Arc<GpuContext>,
    pipeline: ComputePipeline,
    layout: BindGroupLayout,
    /// Storage buffers with their logical byte sizes, indexed by handle
    buffers: Vec<(Buffer, u64)>,
    /// Scalar argument block (alpha, beta, size scalars)
    uniform: Buffer,
    /// Current handle per storage binding slot, in argument order
    bindings: Vec<GpuBuffer>,
    /// Binding slot of the iteration input
    input_slot: usize,
    /// Binding slot of the y vector
    y_slot: usize,
    /// Binding slot of the kernel output
    output_slot: usize,
    bind_group: Option<BindGroup>,
    /// Readback buffer sized to the largest storage buffer
    staging: Buffer,
    timestamps: Option<Timestamps>,
}

impl GpuKernel {
    /// Compile `config` into a pipeline, allocate every argument buffer,
    /// and return the kernel together with the engine's handle set.
    ///
    /// Buffer contents are not uploaded here; the engine's per-trial reset
    /// does that.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gpu`] for shader or pipeline failures.
    pub fn create<T: SemiringElement>(
        ctx: Arc<GpuContext>,
        config: &KernelConfig,
        args: &ArgContainer<T>,
    ) -> Result<(Self, EngineBuffers<GpuBuffer>)> {
        let module = ctx
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&config.name),
                source: wgpu::ShaderSource::Wgsl(config.source.as_str().into()),
            });

        // Argument order: m_idxs, m_vals, x, y, temp globals, output.
        let mut sizes: Vec<u64> = vec![
            args.m_idxs.len() as u64,
            args.m_vals.len() as u64,
            args.x_vect.len() as u64,
            args.y_vect.len() as u64,
        ];
        sizes.extend(args.temp_globals.iter().copied());
        sizes.push(args.output);

        for tl in &config.temp_locals {
            debug!("temp local '{}' declared in-kernel", tl.variable);
        }

        let buffers: Vec<(Buffer, u64)> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                // wgpu requires 4-byte-aligned buffer sizes
                let aligned = size.div_ceil(4) * 4;
                let buf = ctx.create_storage_buffer(&format!("arg{i}"), aligned.max(4));
                (buf, size)
            })
            .collect();

        let layout = scalar_storage_layout(&ctx, buffers.len() as u32);

        let pipeline_layout =
            ctx.device()
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(&format!("{}_layout", config.name)),
                    bind_group_layouts: &[&layout],
                    immediate_size: 0,
                });
        let pipeline = ctx
            .device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&config.name),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(&config.name),
                compilation_options: Default::default(),
                cache: None,
            });

        let scalar_block = scalar_block(args);
        let uniform = ctx.create_uniform_buffer("scalars", scalar_block.len() as u64);
        ctx.queue().write_buffer(&uniform, 0, &scalar_block);

        let largest = sizes.iter().copied().max().unwrap_or(4).max(4);
        let staging = ctx.create_staging_buffer("readback", largest.div_ceil(4) * 4);

        let timestamps = ctx.timestamps_supported().then(|| {
            let query_set = ctx.device().create_query_set(&wgpu::QuerySetDescriptor {
                label: Some("kernel timing"),
                ty: wgpu::QueryType::Timestamp,
                count: 2,
            });
            let resolve = ctx.device().create_buffer(&wgpu::BufferDescriptor {
                label: Some("timestamp resolve"),
                size: 16,
                usage: BufferUsages::QUERY_RESOLVE | BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let staging = ctx.create_staging_buffer("timestamp readback", 16);
            let period = ctx.queue().get_timestamp_period();
            Timestamps {
                query_set,
                resolve,
                staging,
                period,
            }
        });

        let temp_count = args.temp_globals.len();
        let handles = EngineBuffers {
            matrix_idxs: GpuBuffer(0),
            matrix_vals: GpuBuffer(1),
            x_vect: GpuBuffer(2),
            y_vect: GpuBuffer(3),
            temp_globals: (0..temp_count).map(|i| GpuBuffer(4 + i)).collect(),
            output: GpuBuffer(4 + temp_count),
        };

        let bindings: Vec<GpuBuffer> = (0..buffers.len()).map(GpuBuffer).collect();
        let mut kernel = Self {
            ctx,
            pipeline,
            layout,
            buffers,
            uniform,
            bindings,
            input_slot: 2,
            y_slot: 3,
            output_slot: 4 + temp_count,
            bind_group: None,
            staging,
            timestamps,
        };
        kernel.rebuild_bind_group();
        Ok((kernel, handles))
    }

    fn buffer(&self, handle: GpuBuffer) -> Result<&(Buffer, u64)> {
        self.buffers
            .get(handle.0)
            .ok_or_else(|| Error::Gpu(format!("unknown buffer handle {handle:?}")))
    }

    fn rebuild_bind_group(&mut self) {
        let mut entries: Vec<BindGroupEntry> = self
            .bindings
            .iter()
            .enumerate()
            .map(|(i, h)| BindGroupEntry {
                binding: i as u32,
                resource: self.buffers[h.0].0.as_entire_binding(),
            })
            .collect();
        entries.push(BindGroupEntry {
            binding: self.bindings.len() as u32,
            resource: self.uniform.as_entire_binding(),
        });

        self.bind_group = Some(self.ctx.device().create_bind_group(&BindGroupDescriptor {
            label: Some("kernel args"),
            layout: &self.layout,
            entries: &entries,
        }));
    }
}

impl KernelExecutor for GpuKernel {
    type Handle = GpuBuffer;

    fn upload(&mut self, handle: GpuBuffer, data: &[u8]) -> Result<()> {
        let (buffer, size) = self.buffer(handle)?;
        if data.len() as u64 > buffer.size() {
            return Err(Error::Gpu(format!(
                "upload of {} bytes into {size}-byte buffer {handle:?}",
                data.len()
            )));
        }
        self.ctx.queue().write_buffer(buffer, 0, data);
        self.ctx.flush()
    }

    fn fill_zero(&mut self, handle: GpuBuffer) -> Result<()> {
        let (buffer, _) = self.buffer(handle)?;
        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("zero fill"),
            });
        encoder.clear_buffer(buffer, 0, None);
        self.ctx.submit_and_wait(encoder)
    }

    fn bind_io(&mut self, input: GpuBuffer, output: GpuBuffer, y: Option<GpuBuffer>) -> Result<()> {
        self.buffer(input)?;
        self.buffer(output)?;
        self.bindings[self.input_slot] = input;
        self.bindings[self.output_slot] = output;
        if let Some(y) = y {
            self.buffer(y)?;
            self.bindings[self.y_slot] = y;
        }
        self.rebuild_bind_group();
        Ok(())
    }

    fn launch(&mut self, run: &Run) -> Result<Duration> {
        let bind_group = self
            .bind_group
            .as_ref()
            .ok_or_else(|| Error::Gpu("launch before bind_io".into()))?;

        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kernel launch"),
            });

        {
            let timestamp_writes =
                self.timestamps
                    .as_ref()
                    .map(|t| wgpu::ComputePassTimestampWrites {
                        query_set: &t.query_set,
                        beginning_of_pass_write_index: Some(0),
                        end_of_pass_write_index: Some(1),
                    });
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("kernel pass"),
                timestamp_writes,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            let [x, y, z] = run.workgroups();
            pass.dispatch_workgroups(x, y, z);
        }

        if let Some(t) = &self.timestamps {
            encoder.resolve_query_set(&t.query_set, 0..2, &t.resolve, 0);
            encoder.copy_buffer_to_buffer(&t.resolve, 0, &t.staging, 0, 16);
        }

        let started = Instant::now();
        self.ctx.submit_and_wait(encoder)?;
        let wall = started.elapsed();

        match &self.timestamps {
            Some(t) => {
                let mut raw = [0u8; 16];
                self.ctx.read_staging(&t.staging, &mut raw)?;
                let start: u64 = bytemuck::pod_read_unaligned(&raw[..8]);
                let end: u64 = bytemuck::pod_read_unaligned(&raw[8..]);
                let nanos = end.saturating_sub(start) as f64 * f64::from(t.period);
                Ok(Duration::from_nanos(nanos as u64))
            }
            None => Ok(wall),
        }
    }

    fn download(&mut self, handle: GpuBuffer, out: &mut [u8]) -> Result<()> {
        let (buffer, size) = self.buffer(handle)?;
        if out.len() as u64 > *size {
            return Err(Error::Gpu(format!(
                "download of {} bytes from {size}-byte buffer {handle:?}",
                out.len()
            )));
        }
        let copy_len = (out.len() as u64).div_ceil(4) * 4;
        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback copy"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &self.staging, 0, copy_len.min(buffer.size()));
        self.ctx.submit_and_wait(encoder)?;
        self.ctx.read_staging(&self.staging, out)
    }
}

/// Bind group layout: `n` read-write storage buffers then one uniform.
fn scalar_storage_layout(ctx: &GpuContext, storage_count: u32) -> BindGroupLayout {
    let mut entries: Vec<BindGroupLayoutEntry> = (0..storage_count)
        .map(|i| BindGroupLayoutEntry {
            binding: i,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();
    entries.push(BindGroupLayoutEntry {
        binding: storage_count,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });
    ctx.device()
        .create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("kernel layout"),
            entries: &entries,
        })
}

/// The uniform scalar block: alpha, beta, then the three size scalars,
/// padded to a 16-byte multiple.
fn scalar_block<T: SemiringElement>(args: &ArgContainer<T>) -> Vec<u8> {
    let mut block = Vec::with_capacity(32);
    block.extend_from_slice(bytemuck::bytes_of(&args.alpha));
    block.extend_from_slice(bytemuck::bytes_of(&args.beta));
    block.extend_from_slice(bytemuck::cast_slice(&args.size_args));
    while block.len() % 16 != 0 {
        block.push(0);
    }
    block
}
