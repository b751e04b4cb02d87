//! The trial loop

use std::time::Duration;

use log::{debug, warn};

use crate::args::ArgContainer;
use crate::dtype::SemiringElement;
use crate::error::Result;
use crate::harness::convergence::buffers_equal;
use crate::harness::executor::{EngineBuffers, KernelExecutor};
use crate::report::{self, SqlStat};
use crate::run::Run;

/// Knobs for one benchmark configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrialOptions {
    /// Independent trials per run configuration
    pub trials: u32,
    /// Iteration cap per trial; reaching it is an explicit outcome, never
    /// a silent success
    pub max_iterations: u32,
    /// Per-trial device-time budget; `Duration::ZERO` disables the check
    pub timeout: Duration,
    /// Absolute delta for floating-point convergence comparison
    pub delta: f64,
    /// Rebind the y argument to the current input buffer on every swap.
    ///
    /// The SSSP and SCC kernels read the previous iteration's result
    /// through their y argument, so y has to follow the ping-pong input
    /// rather than stay on the seeded y buffer.
    pub y_follows_input: bool,
}

impl Default for TrialOptions {
    fn default() -> Self {
        Self {
            trials: 10,
            max_iterations: 1000,
            timeout: Duration::from_millis(100),
            delta: 1e-4,
            y_follows_input: false,
        }
    }
}

/// How a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// Output reached a fixed point
    Converged {
        /// Kernel executions performed (always at least 1)
        iterations: u32,
    },
    /// The configured iteration cap was reached without convergence
    IterationCap {
        /// Kernel executions performed
        iterations: u32,
    },
    /// The per-trial time budget ran out
    TimedOut {
        /// Kernel executions performed
        iterations: u32,
    },
}

impl TrialOutcome {
    /// Whether the trial reached a fixed point
    pub fn converged(&self) -> bool {
        matches!(self, TrialOutcome::Converged { .. })
    }

    /// Kernel executions performed
    pub fn iterations(&self) -> u32 {
        match *self {
            TrialOutcome::Converged { iterations }
            | TrialOutcome::IterationCap { iterations }
            | TrialOutcome::TimedOut { iterations } => iterations,
        }
    }
}

/// One trial's outcome plus its timing rows (raw rows, then the appended
/// median and sum aggregates).
#[derive(Debug, Clone)]
pub struct TrialResult {
    /// Why the trial ended
    pub outcome: TrialOutcome,
    /// Timing rows for reporting
    pub stats: Vec<SqlStat>,
    /// Iterations whose downloaded output was byte-identical to the
    /// previous iteration's. A nonzero count on a non-converged trial
    /// usually means the kernel made no progress.
    pub stale_iterations: u32,
}

/// The convergence-driven execution engine.
///
/// Owns the ping-pong [`EngineBuffers`] for one benchmark configuration
/// and drives `INIT -> (EXECUTE -> DOWNLOAD -> COMPARE -> SWAP)* -> done`
/// per trial. Between trials every input buffer is rewritten from the
/// original encoded bytes so trials are isolated.
pub struct ExecutionEngine<T: SemiringElement, E: KernelExecutor> {
    executor: E,
    args: ArgContainer<T>,
    buffers: EngineBuffers<E::Handle>,
    options: TrialOptions,
    timeout: Duration,
}

impl<T: SemiringElement, E: KernelExecutor> ExecutionEngine<T, E> {
    /// Build an engine over an executor whose buffers are already
    /// allocated. Uploads nothing yet; every trial starts with a full
    /// input reset.
    pub fn new(
        executor: E,
        args: ArgContainer<T>,
        buffers: EngineBuffers<E::Handle>,
        options: TrialOptions,
    ) -> Self {
        let timeout = options.timeout;
        Self {
            executor,
            args,
            buffers,
            options,
            timeout,
        }
    }

    /// The current (possibly shrunk) per-trial timeout.
    pub fn current_timeout(&self) -> Duration {
        self.timeout
    }

    /// Give back the executor (used by callers that reuse the device).
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Run all configured trials for one run configuration.
    ///
    /// Each trial's stats carry the raw per-iteration timings plus the
    /// median and sum aggregate rows.
    pub fn benchmark(&mut self, run: &Run) -> Result<Vec<TrialResult>> {
        let mut results = Vec::with_capacity(self.options.trials as usize);
        for trial in 0..self.options.trials as usize {
            self.reset_inputs()?;
            let mut result = self.execute_trial(run, trial)?;
            let trial_time: Duration = result.stats.iter().map(|s| s.time).sum();
            report::append_aggregates(&mut result.stats, run, trial);
            debug!(
                "trial {trial}: {:?} in {:?}",
                result.outcome, trial_time
            );
            results.push(result);
            self.lower_timeout(trial_time);
        }
        Ok(results)
    }

    /// Rewrite every input buffer from the original encoded bytes and
    /// restore the initial input/output orientation.
    fn reset_inputs(&mut self) -> Result<()> {
        self.executor
            .upload(self.buffers.matrix_idxs, &self.args.m_idxs)?;
        self.executor
            .upload(self.buffers.matrix_vals, &self.args.m_vals)?;
        self.executor.upload(self.buffers.x_vect, &self.args.x_vect)?;
        self.executor.upload(self.buffers.y_vect, &self.args.y_vect)?;
        self.executor.fill_zero(self.buffers.output)?;
        for &tg in &self.buffers.temp_globals {
            self.executor.fill_zero(tg)?;
        }
        let y = self.y_binding(self.buffers.x_vect);
        self.executor
            .bind_io(self.buffers.x_vect, self.buffers.output, y)
    }

    /// The y rebinding for a given input buffer, if this configuration
    /// needs the y argument to follow the input.
    fn y_binding(&self, input: E::Handle) -> Option<E::Handle> {
        self.options.y_follows_input.then_some(input)
    }

    /// One trial: iterate to a fixed point, the cap, or the timeout.
    fn execute_trial(&mut self, run: &Run, trial: usize) -> Result<TrialResult> {
        let mut input_handle = self.buffers.x_vect;
        let mut output_handle = self.buffers.output;
        let mut input_host = self.args.x_vect.clone();
        let mut output_host = vec![0u8; self.args.output as usize];
        // empty until the first download so an all-zero first output is
        // never mistaken for a repeat of the zero-filled reset state
        let mut prev_output: Vec<u8> = Vec::new();

        let temp_globals = self.buffers.temp_globals.clone();
        let mut stats = Vec::new();
        let mut elapsed = Duration::ZERO;
        let mut iteration: u32 = 0;
        let mut stale_iterations: u32 = 0;

        let outcome = loop {
            // temp globals are scratch and must not leak state across
            // executions
            for &tg in &temp_globals {
                self.executor.fill_zero(tg)?;
            }

            let time = self.executor.launch(run)?;
            elapsed += time;
            stats.push(SqlStat::raw(time, run, trial, iteration as usize));

            self.executor.download(output_handle, &mut output_host)?;
            if !prev_output.is_empty() && output_host == prev_output {
                stale_iterations += 1;
                warn!(
                    "iteration {iteration}: output identical to previous iteration, \
                     kernel has probably made no progress"
                );
            }
            prev_output.clear();
            prev_output.extend_from_slice(&output_host);

            let converged = buffers_equal::<T>(&input_host, &output_host, self.options.delta);

            // O(1) role swap, then rebind the relabelled buffers
            std::mem::swap(&mut input_handle, &mut output_handle);
            std::mem::swap(&mut input_host, &mut output_host);
            let y = self.y_binding(input_handle);
            self.executor.bind_io(input_handle, output_handle, y)?;

            iteration += 1;

            if converged {
                break TrialOutcome::Converged { iterations: iteration };
            }
            if iteration >= self.options.max_iterations {
                break TrialOutcome::IterationCap { iterations: iteration };
            }
            if !self.timeout.is_zero() && elapsed >= self.timeout {
                break TrialOutcome::TimedOut { iterations: iteration };
            }
        };

        Ok(TrialResult {
            outcome,
            stats,
            stale_iterations,
        })
    }

    /// Shrink the timeout toward the best measured trial time.
    ///
    /// A 2x gap is taken as the noise margin: once a trial finishes in
    /// less than half the current budget, obviously-bad configurations in
    /// the rest of the sweep get cut off at twice the measured time.
    fn lower_timeout(&mut self, measured: Duration) {
        if self.timeout.is_zero() {
            return;
        }
        let doubled = measured * 2;
        if doubled < self.timeout {
            self.timeout = doubled;
        }
    }
}
