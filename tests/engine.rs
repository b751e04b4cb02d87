//! Trial-loop behavior through an in-memory kernel executor.

use std::time::Duration;

use ellbench::args::ArgContainer;
use ellbench::error::Result;
use ellbench::harness::{
    EngineBuffers, ExecutionEngine, KernelExecutor, TrialOptions, TrialOutcome,
};
use ellbench::report::Statistic;
use ellbench::run::Run;

type Step = Box<dyn FnMut(&[f32], &[f32]) -> Vec<f32>>;

/// In-memory device. Handles index a table of byte buffers; every launch
/// maps the bound input and y buffers through `step` into the bound output
/// and charges a fixed amount of device time.
struct MockDevice {
    buffers: Vec<Vec<u8>>,
    input: usize,
    y: usize,
    output: usize,
    launches: u32,
    uploads: u32,
    tick: Duration,
    step: Step,
}

impl MockDevice {
    fn new(vector_len: usize, tick: Duration, step: Step) -> Self {
        let bytes = vector_len * 4;
        Self {
            // matrix idxs, matrix vals, x, y, output
            buffers: vec![vec![0; 16], vec![0; 16], vec![0; bytes], vec![0; bytes], vec![0; bytes]],
            input: 2,
            y: 3,
            output: 4,
            launches: 0,
            uploads: 0,
            tick,
            step,
        }
    }

    fn handles() -> EngineBuffers<usize> {
        EngineBuffers {
            matrix_idxs: 0,
            matrix_vals: 1,
            x_vect: 2,
            y_vect: 3,
            output: 4,
            temp_globals: vec![],
        }
    }
}

impl KernelExecutor for MockDevice {
    type Handle = usize;

    fn upload(&mut self, handle: usize, data: &[u8]) -> Result<()> {
        self.uploads += 1;
        self.buffers[handle][..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn fill_zero(&mut self, handle: usize) -> Result<()> {
        self.buffers[handle].fill(0);
        Ok(())
    }

    fn bind_io(&mut self, input: usize, output: usize, y: Option<usize>) -> Result<()> {
        self.input = input;
        self.output = output;
        if let Some(y) = y {
            self.y = y;
        }
        Ok(())
    }

    fn launch(&mut self, _run: &Run) -> Result<Duration> {
        self.launches += 1;
        let input: Vec<f32> = bytemuck::pod_collect_to_vec(&self.buffers[self.input]);
        let y: Vec<f32> = bytemuck::pod_collect_to_vec(&self.buffers[self.y]);
        let output = (self.step)(&input, &y);
        self.buffers[self.output] = bytemuck::cast_slice(&output).to_vec();
        Ok(self.tick)
    }

    fn download(&mut self, handle: usize, out: &mut [u8]) -> Result<()> {
        out.copy_from_slice(&self.buffers[handle][..out.len()]);
        Ok(())
    }
}

fn args(initial: &[f32]) -> ArgContainer<f32> {
    ArgContainer {
        m_idxs: vec![0; 16],
        m_vals: vec![0; 16],
        x_vect: bytemuck::cast_slice(initial).to_vec(),
        y_vect: vec![0; initial.len() * 4],
        alpha: 1.0,
        beta: 0.0,
        temp_globals: vec![],
        output: (initial.len() * 4) as u64,
        temp_locals: vec![],
        size_args: [initial.len() as u32; 3],
    }
}

fn run() -> Run {
    Run {
        global: [4, 1, 1],
        local: [1, 1, 1],
    }
}

fn options(trials: u32) -> TrialOptions {
    TrialOptions {
        trials,
        max_iterations: 100,
        timeout: Duration::ZERO,
        delta: 1e-3,
        y_follows_input: false,
    }
}

#[test]
fn iterates_until_fixed_point() {
    // each step moves every element one toward zero; from 3.0 that is
    // 3 -> 2 -> 1 -> 0, and the 0 -> 0 step is the fixed point
    let device = MockDevice::new(
        4,
        Duration::from_millis(1),
        Box::new(|v, _| v.iter().map(|x| (x - 1.0).max(0.0)).collect()),
    );
    let a = args(&[3.0; 4]);
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), options(1));

    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, TrialOutcome::Converged { iterations: 4 });
}

#[test]
fn identity_kernel_converges_in_one_iteration() {
    // a kernel that copies input to output hits the fixed point at once
    let device = MockDevice::new(4, Duration::from_millis(1), Box::new(|v, _| v.to_vec()));
    let a = args(&[2.0; 4]);
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), options(1));

    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(results[0].outcome, TrialOutcome::Converged { iterations: 1 });
    assert_eq!(results[0].stale_iterations, 0);
}

#[test]
fn divergent_kernel_hits_the_iteration_cap() {
    let device = MockDevice::new(
        4,
        Duration::from_millis(1),
        Box::new(|v, _| v.iter().map(|x| x + 1.0).collect()),
    );
    let a = args(&[0.0; 4]);
    let opts = TrialOptions {
        max_iterations: 5,
        ..options(1)
    };
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), opts);

    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(
        results[0].outcome,
        TrialOutcome::IterationCap { iterations: 5 }
    );
    // 5 raw rows plus the median and sum aggregates
    assert_eq!(results[0].stats.len(), 7);
    assert_eq!(results[0].stats[5].statistic, Statistic::MedianResult);
    assert_eq!(results[0].stats[6].statistic, Statistic::MultiIterationSum);
}

#[test]
fn slow_divergent_kernel_times_out() {
    let device = MockDevice::new(
        4,
        Duration::from_millis(10),
        Box::new(|v, _| v.iter().map(|x| x + 1.0).collect()),
    );
    let a = args(&[0.0; 4]);
    let opts = TrialOptions {
        timeout: Duration::from_millis(25),
        ..options(1)
    };
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), opts);

    let results = engine.benchmark(&run()).unwrap();
    // accumulated device time crosses 25ms during the third execution
    assert_eq!(results[0].outcome, TrialOutcome::TimedOut { iterations: 3 });
}

#[test]
fn fast_trials_shrink_the_timeout() {
    let device = MockDevice::new(4, Duration::from_millis(1), Box::new(|v, _| v.to_vec()));
    let a = args(&[2.0; 4]);
    let opts = TrialOptions {
        timeout: Duration::from_millis(100),
        ..options(3)
    };
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), opts);

    engine.benchmark(&run()).unwrap();
    // one 1ms iteration per trial; the budget settles at twice that
    assert_eq!(engine.current_timeout(), Duration::from_millis(2));
}

#[test]
fn zero_timeout_disables_the_time_check() {
    let device = MockDevice::new(
        4,
        Duration::from_secs(1),
        Box::new(|v, _| v.iter().map(|x| (x - 1.0).max(0.0)).collect()),
    );
    let a = args(&[3.0; 4]);
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), options(1));

    let results = engine.benchmark(&run()).unwrap();
    assert!(results[0].outcome.converged());
    assert_eq!(engine.current_timeout(), Duration::ZERO);
}

#[test]
fn trials_are_isolated_by_the_input_reset() {
    // stateless step + per-trial reset means every trial behaves the same
    let device = MockDevice::new(
        4,
        Duration::from_millis(1),
        Box::new(|v, _| v.iter().map(|x| (x - 1.0).max(0.0)).collect()),
    );
    let a = args(&[2.0; 4]);
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), options(3));

    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(results.len(), 3);
    for result in &results {
        assert_eq!(result.outcome, TrialOutcome::Converged { iterations: 3 });
        assert_eq!(result.stats.len(), 5);
    }
    let executor = engine.into_executor();
    // four buffers re-uploaded per trial
    assert_eq!(executor.uploads, 12);
    assert_eq!(executor.launches, 9);
}

#[test]
fn y_argument_tracks_the_input_across_swaps() {
    // a relaxation step that averages the input with y: when y is rebound
    // to the input buffer every iteration the two slices are identical, so
    // the very first output equals the input
    let averaging: fn() -> Step =
        || Box::new(|v, y| v.iter().zip(y).map(|(a, b)| (a + b) / 2.0).collect());

    let device = MockDevice::new(4, Duration::from_millis(1), averaging());
    let a = args(&[2.0; 4]);
    let opts = TrialOptions {
        y_follows_input: true,
        ..options(1)
    };
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), opts);
    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(results[0].outcome, TrialOutcome::Converged { iterations: 1 });

    // without the rebinding the same kernel averages against the seeded
    // all-zero y forever, halving toward zero: 2 / 2^k first comes within
    // the 1e-3 delta of its predecessor at k = 11
    let device = MockDevice::new(4, Duration::from_millis(1), averaging());
    let a = args(&[2.0; 4]);
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), options(1));
    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(results[0].outcome, TrialOutcome::Converged { iterations: 11 });
}

#[test]
fn repeated_output_is_counted_as_stale() {
    // a broken kernel that emits the same non-converging output every
    // execution; NaN never compares equal to itself under the delta, so
    // the trial runs to the cap with every download after the first
    // byte-identical to its predecessor
    let device = MockDevice::new(
        4,
        Duration::from_millis(1),
        Box::new(|_, _| vec![f32::NAN; 4]),
    );
    let a = args(&[0.0; 4]);
    let opts = TrialOptions {
        max_iterations: 4,
        ..options(1)
    };
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), opts);

    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(
        results[0].outcome,
        TrialOutcome::IterationCap { iterations: 4 }
    );
    assert_eq!(results[0].stale_iterations, 3);
}

#[test]
fn all_zero_first_output_is_not_stale() {
    // the output buffer is zero-filled at reset; a kernel whose first
    // iteration legitimately produces zeros must not be flagged for it.
    // only the second, genuinely repeated download counts
    let device = MockDevice::new(4, Duration::from_millis(1), Box::new(|_, _| vec![0.0; 4]));
    let a = args(&[3.0; 4]);
    let mut engine = ExecutionEngine::new(device, a, MockDevice::handles(), options(1));

    let results = engine.benchmark(&run()).unwrap();
    assert_eq!(results[0].outcome, TrialOutcome::Converged { iterations: 2 });
    assert_eq!(results[0].stale_iterations, 1);
}

#[test]
fn outcome_reports_iteration_counts() {
    assert_eq!(TrialOutcome::Converged { iterations: 7 }.iterations(), 7);
    assert!(!TrialOutcome::TimedOut { iterations: 2 }.converged());
    assert!(!TrialOutcome::IterationCap { iterations: 9 }.converged());
}
