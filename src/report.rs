//! Result reporting: timing rows rendered as SQL INSERT statements
//!
//! Every kernel execution produces one `RAW_RESULT` row; per trial the
//! aggregator appends a `MEDIAN_RESULT` and a `MULTI_ITERATION_SUM` row so
//! downstream analysis can query either granularity.

use std::fmt::Write as _;
use std::time::Duration;

use crate::run::Run;

/// Correctness status attached to a timing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correctness {
    /// Output validated against a gold reference
    Correct,
    /// No validation performed
    NotChecked,
    /// Validation machinery itself failed
    GenericFailure,
    /// Output had the wrong length
    BadLength,
    /// Output values did not match
    BadValues,
}

impl Correctness {
    fn as_sql(self) -> &'static str {
        match self {
            Correctness::Correct => "correct",
            Correctness::NotChecked => "notchecked",
            Correctness::GenericFailure => "genericfailure",
            Correctness::BadLength => "badlength",
            Correctness::BadValues => "badvalues",
        }
    }
}

/// Which statistic a row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// One kernel execution's device-reported time
    RawResult,
    /// Median of a trial's raw results
    MedianResult,
    /// Sum of a trial's raw results
    MultiIterationSum,
}

impl Statistic {
    fn as_sql(self) -> &'static str {
        match self {
            Statistic::RawResult => "RAW_RESULT",
            Statistic::MedianResult => "MEDIAN_RESULT",
            Statistic::MultiIterationSum => "MULTI_ITERATION_SUM",
        }
    }
}

/// One timing row.
#[derive(Debug, Clone)]
pub struct SqlStat {
    /// Measured time for this row
    pub time: Duration,
    /// Validation status
    pub correctness: Correctness,
    /// First global NDRange dimension
    pub global: u32,
    /// First local NDRange dimension
    pub local: u32,
    /// Iteration index within the trial
    pub iteration: usize,
    /// Trial index within the run
    pub trial: usize,
    /// Row statistic kind
    pub statistic: Statistic,
}

impl SqlStat {
    /// A raw per-iteration timing row.
    pub fn raw(time: Duration, run: &Run, trial: usize, iteration: usize) -> Self {
        Self {
            time,
            correctness: Correctness::NotChecked,
            global: run.global[0],
            local: run.local[0],
            iteration,
            trial,
            statistic: Statistic::RawResult,
        }
    }

    fn render(&self, ctx: &ReportContext<'_>) -> String {
        format!(
            "({}, \"{}\", \"{}\", {}, {}, \"{}\", \"{}\", \"{}\", {}, {}, \"{}\", \"{}\")",
            self.time.as_nanos(),
            self.correctness.as_sql(),
            ctx.kernel,
            self.global,
            self.local,
            ctx.host,
            ctx.device,
            ctx.matrix,
            self.iteration,
            self.trial,
            self.statistic.as_sql(),
            ctx.experiment_id,
        )
    }
}

/// Identity columns shared by every row of a report.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    /// Kernel name from the config
    pub kernel: &'a str,
    /// Host the harness ran on
    pub host: &'a str,
    /// GPU device name
    pub device: &'a str,
    /// Matrix name (not the file path)
    pub matrix: &'a str,
    /// Experiment identifier for this sweep
    pub experiment_id: &'a str,
}

/// Append a trial's median and sum rows to its raw timings.
///
/// The median is the middle element of the time-sorted raw rows (upper
/// median for even counts). No-op on an empty trial.
pub fn append_aggregates(stats: &mut Vec<SqlStat>, run: &Run, trial: usize) {
    if stats.is_empty() {
        return;
    }

    let mut times: Vec<Duration> = stats.iter().map(|s| s.time).collect();
    times.sort();
    let median = times[times.len() / 2];
    let total: Duration = times.iter().sum();

    stats.push(SqlStat {
        time: median,
        correctness: Correctness::NotChecked,
        global: run.global[0],
        local: run.local[0],
        iteration: 0,
        trial,
        statistic: Statistic::MedianResult,
    });
    stats.push(SqlStat {
        time: total,
        correctness: Correctness::NotChecked,
        global: run.global[0],
        local: run.local[0],
        iteration: 0,
        trial,
        statistic: Statistic::MultiIterationSum,
    });
}

/// Render one trial's rows as a single multi-value INSERT statement.
pub fn make_sql_command(stats: &[SqlStat], ctx: &ReportContext<'_>) -> String {
    let mut out = String::from(
        "INSERT INTO table_name (time, correctness, kernel, global, local, \
         host, device, matrix, iteration, trial, statistic, experiment_id) VALUES ",
    );
    for (i, stat) in stats.iter().enumerate() {
        if i != 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", stat.render(ctx));
    }
    out.push(';');
    out
}
