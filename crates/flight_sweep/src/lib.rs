//! Parallel execution and analysis of parametric flight-simulation sweeps.
//!
//! A batch goes through four stages:
//!
//! 1. [`expand`] a [`ScenarioDescription`] into parameter sets,
//! 2. run them on a bounded worker pool with [`BatchScheduler`], each through
//!    a [`RunExecutor`] such as [`SubprocessExecutor`],
//! 3. [`aggregate`] the outcomes into groups and a global summary,
//! 4. write the results with the [`export`] functions.
//!
//! # Quick Start
//!
//! ```no_run
//! use flight_sweep::presets::wind_dispersion_scenario;
//! use flight_sweep::{aggregate, expand, AggregateOptions, BatchScheduler, SimulatorConfig, SubprocessExecutor};
//!
//! let scenario = wind_dispersion_scenario();
//! let sets = expand(&scenario)?;
//!
//! let executor = SubprocessExecutor::new(
//!     SimulatorConfig::new("run_jsbsim.sh").with_args(["{params}", "{workspace}"]),
//! );
//! let outcomes = BatchScheduler::default().run_batch(sets, &executor)?;
//!
//! let aggregation = aggregate(outcomes, &AggregateOptions::for_scenario(&scenario))?;
//! flight_sweep::export::export_summary_csv(&aggregation, scenario.output_dir.join("summary.csv"))?;
//! # Ok::<(), flight_sweep::SweepError>(())
//! ```
//!
//! # Architecture
//!
//! - [`executor`]: one run in an isolated workspace, classified into an outcome
//! - [`runner`]: bounded parallel execution using rayon
//! - [`time_series`]: parsing of simulator CSV output
//! - [`metrics`]: per-run summary metrics and extrema
//! - [`aggregate`]: grouping, failure ledgers and the global summary
//! - [`geo`]: geodesy and landing zones
//! - [`wind`]: power-law wind tables for the simulator
//! - [`export`]: CSV, JSON and Parquet writers

pub mod aggregate;
pub mod error;
pub mod executor;
pub mod export;
pub mod geo;
pub mod metrics;
pub mod runner;
pub mod time_series;
pub mod wind;

pub use flight_sweep_core::{expand, presets, ParameterSet, ParameterValue, ScenarioDescription, SweepAxis};

pub use aggregate::{aggregate, pivot_mean, AggregateOptions, Aggregation, GroupKey, RunSummaryRecord};
pub use error::{ExportError, Result, SweepError};
pub use executor::{FailureKind, RunExecutor, RunOutcome, SimulatorConfig, SubprocessExecutor};
pub use geo::LandingZone;
pub use metrics::{extrema_table, extrema_table_in_zone, summarize, SummaryMetrics, SummaryOptions};
pub use runner::{BatchScheduler, CancellationToken};
pub use time_series::{ChannelMap, TimeSeries};
