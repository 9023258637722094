//! Full pipeline against a shell stand-in for the flight simulator.
#![cfg(unix)]

use std::time::Duration;

use flight_sweep::export::{export_geo_json, export_group_csvs, export_summary_csv, export_to_parquet};
use flight_sweep::{
    aggregate, expand, AggregateOptions, BatchScheduler, FailureKind, LandingZone,
    ScenarioDescription, SimulatorConfig, SubprocessExecutor, SweepError,
};

const SIMULATOR: &str = r#"
i="$FLIGHT_SWEEP_INDEX"
test -f wind_table.csv || { echo "missing wind table" >&2; exit 4; }
if [ "$i" = 3 ]; then echo "integrator diverged" >&2; exit 1; fi
printf 'Time,Latitude,Longitude,Altitude,V_north,V_east,V_down,Dynamic Pressure\n'
printf '0,40.24,139.99,0,0,0,0,0\n'
printf '5,40.24,139.99,%s,0,0,-20,900\n' "$((100 + i))"
printf '10,40.245,139.98,-1,0,0,5,50\n'
"#;

fn wind_scenario(output_dir: &std::path::Path) -> ScenarioDescription {
    ScenarioDescription::new()
        .with_base("mass", 4.5)
        .sweep("ground_wind_speed", vec![2.0, 4.0])
        .sweep("ground_wind_direction", vec![0.0, 90.0])
        .group_by(["ground_wind_speed"])
        .output_dir(output_dir)
}

fn executor(workspace_root: &std::path::Path) -> SubprocessExecutor {
    SubprocessExecutor::new(
        SimulatorConfig::new("sh")
            .with_args(["-c", SIMULATOR])
            .with_workspace_root(workspace_root)
            .with_timeout(Duration::from_secs(20)),
    )
}

#[test]
fn wind_example_end_to_end() {
    let workspaces = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let scenario = wind_scenario(output.path());

    let sets = expand(&scenario).unwrap();
    assert_eq!(sets.len(), 4);

    let outcomes = BatchScheduler::new(2)
        .run_batch(sets, &executor(workspaces.path()))
        .unwrap();
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 3);
    assert_eq!(outcomes[3].failure_kind(), Some(FailureKind::Simulator));
    assert!(outcomes[3].diagnostic().unwrap().contains("integrator diverged"));
    assert_eq!(std::fs::read_dir(workspaces.path()).unwrap().count(), 0);

    let metrics = outcomes[2].metrics().unwrap();
    assert_eq!(metrics.max_altitude, 102.0);
    assert_eq!(metrics.max_dynamic_pressure, Some(900.0));

    let options = AggregateOptions::for_scenario(&scenario).with_landing_zone(LandingZone::noshiro_sea());
    let aggregation = aggregate(outcomes, &options).unwrap();
    assert_eq!(aggregation.groups.len(), 2);
    assert_eq!(aggregation.groups[0].successes, 2);
    assert_eq!(aggregation.groups[1].successes, 1);
    assert_eq!(aggregation.groups[1].failures, 1);
    assert_eq!(aggregation.global.failures_by_kind.get(&FailureKind::Simulator), Some(&1));
    assert_eq!(aggregation.global.max_altitude.unwrap().sweep_index, 2);

    export_summary_csv(&aggregation, scenario.output_dir.join("summary.csv")).unwrap();
    export_geo_json(&aggregation, scenario.output_dir.join("landing.geo.json")).unwrap();
    export_to_parquet(&aggregation, scenario.output_dir.join("summary.parquet")).unwrap();
    let group_files = export_group_csvs(&aggregation, &scenario.output_dir).unwrap();
    assert_eq!(group_files.len(), 2);
    assert!(scenario.output_dir.join("summary.csv").is_file());
}

#[test]
fn timeouts_are_recorded_per_run() {
    let workspaces = tempfile::tempdir().unwrap();
    let scenario = ScenarioDescription::new().sweep("mass", vec![1.0, 2.0]);
    let executor = SubprocessExecutor::new(
        SimulatorConfig::new("sh")
            .with_args(["-c", "sleep 5"])
            .with_workspace_root(workspaces.path())
            .with_timeout(Duration::from_millis(100)),
    );

    let outcomes = BatchScheduler::new(2)
        .run_batch(expand(&scenario).unwrap(), &executor)
        .unwrap();
    assert!(outcomes
        .iter()
        .all(|o| o.failure_kind() == Some(FailureKind::Timeout)));
    assert_eq!(std::fs::read_dir(workspaces.path()).unwrap().count(), 0);
}

#[test]
fn invalid_scenario_never_reaches_the_scheduler() {
    let scenario = ScenarioDescription::new()
        .sweep("ground_wind_speed", vec![1.0])
        .group_by(["ground_wind_direction"]);
    let error: SweepError = expand(&scenario).unwrap_err().into();
    assert!(matches!(error, SweepError::Configuration(_)));
}
