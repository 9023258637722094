//! Example: landing dispersion over ground wind speed and direction.
//!
//! This example demonstrates how to:
//! 1. Select a pre-defined scenario (or load one from JSON)
//! 2. Run the simulator for every combination in parallel
//! 3. Group the landing points by wind speed
//! 4. Export summaries, a landing-margin pivot and map geometry
//!
//! Usage:
//!
//! ```text
//! cargo run --example wind_dispersion -- <simulator> [scenario.json]
//! ```
//!
//! The simulator is called as `<simulator> <parameters.json> <workspace>` and
//! must print its flight record as CSV on stdout. Set `RUST_LOG=debug` for
//! per-run logging.

use flight_sweep::export::{
    export_failure_ledger_csv, export_geo_json, export_group_csvs, export_pivot_csv,
    export_summary_csv, export_to_json, export_to_parquet,
};
use flight_sweep::presets::wind_dispersion_scenario;
use flight_sweep::wind::{GROUND_WIND_DIRECTION, GROUND_WIND_SPEED};
use flight_sweep::{
    aggregate, expand, pivot_mean, AggregateOptions, BatchScheduler, LandingZone,
    ScenarioDescription, SimulatorConfig, SubprocessExecutor,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .init();

    let mut args = std::env::args().skip(1);
    let program = args
        .next()
        .ok_or("usage: wind_dispersion <simulator> [scenario.json]")?;
    let scenario = match args.next() {
        Some(path) => ScenarioDescription::from_path(path)?,
        None => wind_dispersion_scenario(),
    };

    let parameter_sets = expand(&scenario)?;
    println!("Generated {} parameter combinations", parameter_sets.len());

    let executor = SubprocessExecutor::new(
        SimulatorConfig::new(program).with_args(["{params}", "{workspace}"]),
    );
    let outcomes = BatchScheduler::default()
        .with_progress(true)
        .run_batch(parameter_sets, &executor)?;

    let options =
        AggregateOptions::for_scenario(&scenario).with_landing_zone(LandingZone::noshiro_sea());
    let aggregation = aggregate(outcomes, &options)?;

    println!("\n=== Batch Summary ===");
    let global = &aggregation.global;
    println!("Runs: {} ({} succeeded, {} failed)", global.total, global.successes, global.failures);
    for (kind, count) in &global.failures_by_kind {
        println!("  {}: {}", kind.as_str(), count);
    }
    if let Some(extremum) = global.max_altitude {
        println!("Max altitude: {:.1} m (run {})", extremum.value, extremum.sweep_index);
    }
    if let Some(extremum) = global.farthest_landing {
        println!("Farthest landing: {:.1} m (run {})", extremum.value, extremum.sweep_index);
    }

    println!("\n=== Groups ===");
    for group in &aggregation.groups {
        let inside = group
            .rows
            .iter()
            .filter(|row| row.landing_margin_m.is_some_and(|margin| margin > 0.0))
            .count();
        println!(
            "{}: {} landed, {} failed, {} inside {}",
            group.key.label(),
            group.successes,
            group.failures,
            inside,
            options.landing_zone.as_ref().map_or("zone", |zone| zone.name()),
        );
    }

    println!("\nExporting results...");
    let output_dir = &scenario.output_dir;
    export_summary_csv(&aggregation, output_dir.join("summary.csv"))?;
    export_group_csvs(&aggregation, output_dir)?;
    export_failure_ledger_csv(&aggregation, output_dir.join("failures.csv"))?;
    export_to_json(&aggregation, output_dir.join("summary.json"))?;
    export_geo_json(&aggregation, output_dir.join("landing.geo.json"))?;
    export_to_parquet(&aggregation, output_dir.join("summary.parquet"))?;

    let margins = pivot_mean(
        aggregation.records(),
        GROUND_WIND_SPEED,
        GROUND_WIND_DIRECTION,
        |record| record.landing_margin_m,
    );
    if !margins.rows.is_empty() {
        export_pivot_csv(&margins, output_dir.join("landing_margin.csv"))?;
    }
    println!("Exported to {}", output_dir.display());

    Ok(())
}
