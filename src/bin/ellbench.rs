//! Benchmark driver
//!
//! One subcommand per benchmark application. All of them share the same
//! pipeline: load matrix + kernel config + run list, encode the matrix for
//! the kernel's layout, bind arguments, then sweep every run configuration
//! through the convergence-driven engine, printing one SQL INSERT per run.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use ellbench::args::ArgContainer;
use ellbench::config::KernelConfig;
use ellbench::dtype::SemiringElement;
use ellbench::encode::{encode, EncodingFlags};
use ellbench::error::{Error, Result};
use ellbench::gpu::{GpuContext, GpuKernel};
use ellbench::harness::{ExecutionEngine, TrialOptions};
use ellbench::matrix::CooMatrix;
use ellbench::report::{make_sql_command, ReportContext};
use ellbench::run::Run;
use ellbench::vector::VectorStrategy;

#[derive(Parser)]
#[command(
    name = "ellbench",
    about = "Benchmark harness for generated sparse-matrix GPU kernels",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sparse matrix-vector multiplication
    Spmv(Common),
    /// Breadth-first search by iterated SpMV
    Bfs(Common),
    /// Single-source shortest paths (min-plus semiring)
    Sssp(Common),
    /// Strongly connected components (integer label propagation)
    Scc(Common),
    /// PageRank power iteration
    Pagerank(Common),
    /// Eigenvector centrality power iteration
    Eigenvector(Common),
}

#[derive(Args)]
struct Common {
    /// Input matrix file (Matrix-Market coordinate format)
    #[arg(short, long)]
    matrix: String,

    /// Matrix name for result reporting
    #[arg(short = 'f', long)]
    matrix_name: String,

    /// Kernel configuration file (JSON)
    #[arg(short, long)]
    kernel: String,

    /// Run configuration CSV (global1,global2,global3,local1,local2,local3)
    #[arg(short, long)]
    runfile: String,

    /// Host the harness is running on
    #[arg(short = 'n', long)]
    hostname: String,

    /// Experiment ID for data reporting
    #[arg(short, long)]
    experiment: String,

    /// GPU adapter index
    #[arg(short, long, default_value_t = 0)]
    device: usize,

    /// Independent trials per run configuration
    #[arg(short = 'i', long, default_value_t = 10)]
    trials: u32,

    /// Iteration cap per trial
    #[arg(long, default_value_t = 1000)]
    max_iterations: u32,

    /// Per-trial timeout in milliseconds (0 disables)
    #[arg(short, long, default_value_t = 100)]
    timeout: u64,

    /// Delta for floating point comparisons
    #[arg(short = 'c', long, default_value_t = 1e-4)]
    delta: f64,
}

impl Common {
    fn options(&self) -> TrialOptions {
        TrialOptions {
            trials: self.trials,
            max_iterations: self.max_iterations,
            timeout: Duration::from_millis(self.timeout),
            delta: self.delta,
            ..TrialOptions::default()
        }
    }
}

/// Scalar and vector seeding for one application.
struct Seeding<T: SemiringElement> {
    zero: T,
    x: VectorStrategy<T>,
    y: VectorStrategy<T>,
    alpha: T,
    beta: T,
    /// Rebind y to the current input buffer every iteration; the SSSP and
    /// SCC kernels read the previous result through y.
    y_follows_input: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match &cli.command {
        Command::Spmv(c) | Command::Pagerank(c) | Command::Eigenvector(c) => bench(
            c,
            Seeding {
                zero: 0.0f32,
                x: VectorStrategy::Constant(1.0),
                y: VectorStrategy::Constant(0.0),
                alpha: 1.0,
                beta: 0.0,
                y_follows_input: false,
            },
        ),
        Command::Bfs(c) => bench(
            c,
            Seeding {
                zero: 0.0f32,
                x: VectorStrategy::Constant(1000.0),
                y: VectorStrategy::Constant(0.0),
                alpha: 1.0,
                beta: 0.0,
                y_follows_input: false,
            },
        ),
        Command::Sssp(c) => bench(
            c,
            Seeding {
                zero: f32::MAX,
                x: VectorStrategy::InitialDistance { infinity: f32::MAX },
                y: VectorStrategy::InitialDistance { infinity: f32::MAX },
                alpha: 0.0f32,
                beta: 0.0,
                y_follows_input: true,
            },
        ),
        Command::Scc(c) => bench(
            c,
            Seeding {
                zero: i32::MIN,
                x: VectorStrategy::Identity,
                y: VectorStrategy::Constant(i32::MIN),
                alpha: i32::MAX,
                beta: i32::MIN,
                y_follows_input: true,
            },
        ),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // both streams: stdout feeds the sweep logs, stderr the operator
            println!("{e}");
            eprintln!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn bench<T: SemiringElement>(common: &Common, seeding: Seeding<T>) -> Result<()> {
    let matrix = CooMatrix::<T>::from_file(&common.matrix)?;
    let config = KernelConfig::from_file(&common.kernel)?;
    let runs = Run::load_csv(&common.runfile)?;

    matrix.require_square()?;
    info!(
        "matrix '{}': {} x {}, {} nonzeros",
        common.matrix_name,
        matrix.height(),
        matrix.width(),
        matrix.nonzeros()
    );

    let ctx = Arc::new(GpuContext::new(common.device)?);

    let flags = EncodingFlags::from_properties(&config.properties, seeding.zero);
    let encoded = match encode(&matrix, &flags, ctx.max_allocation()) {
        Ok(encoded) => encoded,
        Err(e @ Error::AllocationOverflow { .. }) => {
            // too big for this device; nothing in the sweep can run
            error!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    info!(
        "encoded: cl_width = {}, cl_height = {}, {} index bytes, {} value bytes",
        encoded.cl_width(),
        encoded.cl_height(),
        encoded.indices().len(),
        encoded.values().len()
    );

    let args = ArgContainer::bind(
        &encoded,
        &config,
        &seeding.x,
        &seeding.y,
        seeding.alpha,
        seeding.beta,
        matrix.width(),
    )?;

    let (kernel, handles) = GpuKernel::create(ctx.clone(), &config, &args)?;
    let options = TrialOptions {
        y_follows_input: seeding.y_follows_input,
        ..common.options()
    };
    let mut engine = ExecutionEngine::new(kernel, args, handles, options);

    let device_name = ctx.adapter_name().to_string();
    let report_ctx = ReportContext {
        kernel: &config.name,
        host: &common.hostname,
        device: &device_name,
        matrix: &common.matrix_name,
        experiment_id: &common.experiment,
    };

    for run in &runs {
        info!("benchmarking run: {run}");
        let results = engine.benchmark(run)?;
        for result in &results {
            info!("  {:?}", result.outcome);
        }
        let stats: Vec<_> = results.into_iter().flat_map(|r| r.stats).collect();
        println!("{}", make_sql_command(&stats, &report_ctx));
    }
    Ok(())
}
