//! Parallel batch execution using rayon.
//!
//! Every parameter set goes through a [`RunExecutor`] on a bounded worker
//! pool. One outcome comes back per set, whatever happens to the individual
//! runs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use flight_sweep_core::ParameterSet;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{Result, SweepError};
use crate::executor::{FailureKind, RunExecutor, RunOutcome};

/// Cloneable flag that stops a batch from dispatching further runs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Number of workers used when none is configured.
pub fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

/// Runs a batch of parameter sets with at most `max_workers` in flight.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    max_workers: usize,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(default_max_workers())
    }
}

impl BatchScheduler {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every parameter set and return the outcomes sorted by sweep index.
    ///
    /// Sets that were never started because of cancellation come back as
    /// [`FailureKind::Cancelled`]. A [`FailureKind::ResourceExhausted`] run
    /// stops further dispatch and fails the whole batch once in-flight runs
    /// have drained.
    pub fn run_batch<E: RunExecutor>(
        &self,
        parameter_sets: Vec<ParameterSet>,
        executor: &E,
    ) -> Result<Vec<RunOutcome>> {
        if parameter_sets.is_empty() {
            return Err(SweepError::EmptyBatch);
        }

        let total = parameter_sets.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|idx| format!("flight-sweep-{idx}"))
            .build()
            .map_err(|error| SweepError::WorkerPool(error.to_string()))?;

        let pb = self.show_progress.then(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar
        });

        info!(runs = total, workers = self.max_workers, "starting batch");
        let started = Instant::now();
        let aborted = AtomicBool::new(false);

        let mut outcomes: Vec<RunOutcome> = pool.install(|| {
            parameter_sets
                .into_par_iter()
                .map(|parameter_set| {
                    let outcome = self.dispatch(parameter_set, executor, &aborted);
                    if let Some(progress_bar) = &pb {
                        progress_bar.inc(1);
                    }
                    outcome
                })
                .collect()
        });
        outcomes.sort_by_key(RunOutcome::sweep_index);

        if let Some(progress_bar) = &pb {
            progress_bar.finish_with_message("Completed");
        }

        let cancelled = outcomes
            .iter()
            .filter(|outcome| outcome.failure_kind() == Some(FailureKind::Cancelled))
            .count();
        if cancelled > 0 {
            warn!(cancelled, "batch stopped before every run was dispatched");
        }

        let failures = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        info!(
            runs = total,
            failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );

        if let Some(RunOutcome::Failure {
            parameter_set,
            diagnostic,
            ..
        }) = outcomes
            .iter()
            .find(|outcome| outcome.failure_kind() == Some(FailureKind::ResourceExhausted))
        {
            return Err(SweepError::ResourceExhausted {
                sweep_index: parameter_set.sweep_index(),
                message: diagnostic.clone(),
            });
        }

        Ok(outcomes)
    }

    fn dispatch<E: RunExecutor>(
        &self,
        parameter_set: ParameterSet,
        executor: &E,
        aborted: &AtomicBool,
    ) -> RunOutcome {
        let sweep_index = parameter_set.sweep_index();
        if self.cancel.is_cancelled() || aborted.load(Ordering::SeqCst) {
            return RunOutcome::failure(
                parameter_set,
                FailureKind::Cancelled,
                "batch cancelled before this run started",
            );
        }

        let fallback = parameter_set.clone();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(parameter_set))) {
            Ok(outcome) => outcome,
            Err(payload) => RunOutcome::failure(
                fallback,
                FailureKind::Simulator,
                format!("executor panicked: {}", panic_message(payload.as_ref())),
            ),
        };

        if let RunOutcome::Failure { kind, diagnostic, .. } = &outcome {
            warn!(sweep_index, kind = kind.as_str(), %diagnostic, "run failed");
            if *kind == FailureKind::ResourceExhausted && !aborted.swap(true, Ordering::SeqCst) {
                warn!(sweep_index, "resources exhausted, no further runs will start");
            }
        }
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
