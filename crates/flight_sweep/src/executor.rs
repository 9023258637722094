//! Execution of a single parameter set.
//!
//! [`RunExecutor`] is the seam between scheduling and simulation: the batch
//! scheduler only ever sees this trait, so tests can drive it with closures
//! while production runs go through [`SubprocessExecutor`].

use std::path::PathBuf;
use std::time::Duration;

use flight_sweep_core::ParameterSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::metrics::{summarize, SummaryMetrics, SummaryOptions};
use crate::time_series::{ChannelMap, TimeSeries};

#[path = "executor/workspace.rs"]
mod workspace;

pub use workspace::{PARAMETERS_FILE, STDERR_FILE, STDOUT_FILE, WIND_TABLE_FILE};
use workspace::{classify_io_error, ProcessExit, RunWorkspace};

/// Why a run produced no usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The simulator exceeded its wall-clock budget and was killed.
    Timeout,
    /// Non-zero exit, launch failure, or output that could not be parsed.
    Simulator,
    /// Workspace preparation or cleanup failed.
    Io,
    /// The flight never came back down through ground level.
    IncompleteRun,
    /// The batch was cancelled before this run was dispatched.
    Cancelled,
    /// Disk space or file handles ran out; fatal to the batch.
    ResourceExhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Simulator => "simulator",
            Self::Io => "io",
            Self::IncompleteRun => "incomplete_run",
            Self::Cancelled => "cancelled",
            Self::ResourceExhausted => "resource_exhausted",
        }
    }
}

/// Result of executing one parameter set. Exactly one exists per set.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success {
        parameter_set: ParameterSet,
        time_series: TimeSeries,
        metrics: SummaryMetrics,
    },
    Failure {
        parameter_set: ParameterSet,
        kind: FailureKind,
        diagnostic: String,
    },
}

impl RunOutcome {
    /// Summarize a finished time series. A flight that never lands becomes
    /// an [`FailureKind::IncompleteRun`] failure rather than a guessed
    /// landing point.
    pub fn from_time_series(
        parameter_set: ParameterSet,
        time_series: TimeSeries,
        options: &SummaryOptions,
    ) -> Self {
        match summarize(&time_series, options) {
            Ok(metrics) => Self::Success {
                parameter_set,
                time_series,
                metrics,
            },
            Err(_) => {
                let final_altitude = time_series.altitude.last().copied().unwrap_or(f64::NAN);
                Self::failure(
                    parameter_set,
                    FailureKind::IncompleteRun,
                    format!(
                        "time series never descends through ground level {} (final altitude {final_altitude})",
                        options.ground_level
                    ),
                )
            }
        }
    }

    pub fn failure(
        parameter_set: ParameterSet,
        kind: FailureKind,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self::Failure {
            parameter_set,
            kind,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn parameter_set(&self) -> &ParameterSet {
        match self {
            Self::Success { parameter_set, .. } | Self::Failure { parameter_set, .. } => {
                parameter_set
            }
        }
    }

    pub fn sweep_index(&self) -> usize {
        self.parameter_set().sweep_index()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn metrics(&self) -> Option<&SummaryMetrics> {
        match self {
            Self::Success { metrics, .. } => Some(metrics),
            Self::Failure { .. } => None,
        }
    }

    pub fn time_series(&self) -> Option<&TimeSeries> {
        match self {
            Self::Success { time_series, .. } => Some(time_series),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { diagnostic, .. } => Some(diagnostic),
        }
    }
}

/// Runs one parameter set to completion.
///
/// Implementations must not panic or return early without an outcome: every
/// failure is reported as [`RunOutcome::Failure`].
pub trait RunExecutor: Sync {
    fn execute(&self, parameter_set: ParameterSet) -> RunOutcome;
}

impl<F> RunExecutor for F
where
    F: Fn(ParameterSet) -> RunOutcome + Sync,
{
    fn execute(&self, parameter_set: ParameterSet) -> RunOutcome {
        self(parameter_set)
    }
}

/// How to invoke the external flight simulator.
///
/// Arguments may contain `{workspace}`, `{params}` and `{index}`, which are
/// replaced with the run's workspace directory, the path of its
/// `parameters.json` and its sweep index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    /// File the simulator writes inside its workspace. Stdout is parsed when
    /// unset or when the file was not produced.
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub channels: ChannelMap,
    #[serde(default)]
    pub ground_level: f64,
}

pub fn default_timeout_ms() -> u64 {
    10 * 60 * 1000
}

pub fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("flight_sweep")
}

impl SimulatorConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_ms: default_timeout_ms(),
            workspace_root: default_workspace_root(),
            output_file: None,
            channels: ChannelMap::default(),
            ground_level: 0.0,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_output_file(mut self, name: impl Into<String>) -> Self {
        self.output_file = Some(name.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Runs the simulator as a child process inside a throwaway workspace.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    config: SimulatorConfig,
}

impl SubprocessExecutor {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn run_in(&self, workspace: &RunWorkspace, parameter_set: ParameterSet) -> RunOutcome {
        if let Err(error) = workspace.write_inputs(&parameter_set) {
            return RunOutcome::failure(
                parameter_set,
                classify_io_error(&error),
                format!("failed to write simulator inputs: {error}"),
            );
        }

        let exit = match workspace.invoke(&self.config, parameter_set.sweep_index()) {
            Ok(exit) => exit,
            Err(error) => {
                let kind = match classify_io_error(&error) {
                    FailureKind::ResourceExhausted => FailureKind::ResourceExhausted,
                    _ => FailureKind::Simulator,
                };
                return RunOutcome::failure(
                    parameter_set,
                    kind,
                    format!(
                        "failed to launch simulator {}: {error}",
                        self.config.program.display()
                    ),
                );
            }
        };

        match exit {
            ProcessExit::TimedOut => RunOutcome::failure(
                parameter_set,
                FailureKind::Timeout,
                format!(
                    "simulator exceeded {} ms timeout; stderr: {}",
                    self.config.timeout_ms,
                    workspace.stderr_excerpt()
                ),
            ),
            ProcessExit::Exited(status) if !status.success() => RunOutcome::failure(
                parameter_set,
                FailureKind::Simulator,
                format!(
                    "simulator exited with {status}; stderr: {}",
                    workspace.stderr_excerpt()
                ),
            ),
            ProcessExit::Exited(_) => {
                let reader = match workspace.open_output(self.config.output_file.as_deref()) {
                    Ok(reader) => reader,
                    Err(error) => {
                        return RunOutcome::failure(
                            parameter_set,
                            classify_io_error(&error),
                            format!("failed to open simulator output: {error}"),
                        );
                    }
                };
                match TimeSeries::from_csv(reader, &self.config.channels) {
                    Ok(series) => {
                        let options =
                            SummaryOptions::for_parameter_set(self.config.ground_level, &parameter_set);
                        RunOutcome::from_time_series(parameter_set, series, &options)
                    }
                    Err(error) => RunOutcome::failure(
                        parameter_set,
                        FailureKind::Simulator,
                        format!(
                            "unparseable simulator output: {error}; stderr: {}",
                            workspace.stderr_excerpt()
                        ),
                    ),
                }
            }
        }
    }
}

impl RunExecutor for SubprocessExecutor {
    fn execute(&self, parameter_set: ParameterSet) -> RunOutcome {
        let sweep_index = parameter_set.sweep_index();
        let workspace = match RunWorkspace::create(&self.config.workspace_root, sweep_index) {
            Ok(workspace) => workspace,
            Err(error) => {
                return RunOutcome::failure(
                    parameter_set,
                    classify_io_error(&error),
                    format!(
                        "failed to create workspace under {}: {error}",
                        self.config.workspace_root.display()
                    ),
                );
            }
        };
        debug!(sweep_index, workspace = %workspace.path().display(), "run workspace ready");

        let outcome = self.run_in(&workspace, parameter_set);

        match workspace.close() {
            Ok(()) => outcome,
            Err(error) => {
                warn!(sweep_index, %error, "failed to remove run workspace");
                match outcome {
                    RunOutcome::Success { parameter_set, .. } => RunOutcome::failure(
                        parameter_set,
                        classify_io_error(&error),
                        format!("failed to remove workspace: {error}"),
                    ),
                    failure => failure,
                }
            }
        }
    }
}
