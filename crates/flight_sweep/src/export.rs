//! Writers for aggregated sweep results.
//!
//! Every writer creates missing parent directories and refuses to write an
//! empty result set with [`ExportError::Empty`].

use std::path::{Path, PathBuf};

use crate::aggregate::{Aggregation, PivotTable};
use crate::error::ExportError;
use crate::metrics::ExtremaPoint;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/parquet.rs"]
mod parquet;
#[path = "export/writer_utils.rs"]
mod writer_utils;

/// Directory, relative to the output directory, holding per-group CSVs.
pub const GROUPS_DIR: &str = "groups";

/// Export one row per run to CSV.
///
/// Columns are sweep index, group, fingerprint, one column per axis, the
/// outcome and every summary metric.
///
/// # Arguments
///
/// * `aggregation` - Aggregated batch whose records are written in sweep order
/// * `path` - Path to output CSV file
///
/// # Errors
///
/// Returns [`ExportError::Empty`] for an aggregation without records, and an
/// error if file creation or CSV writing fails.
pub fn export_summary_csv(aggregation: &Aggregation, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let records = writer_utils::labelled_records(aggregation);
    writer_utils::ensure_not_empty(&records)?;
    let axis_names = writer_utils::axis_names(records.iter().map(|(_, record)| *record));
    let file = writer_utils::create_output_file(path)?;
    csv::export_records_csv_impl(&records, &axis_names, file)
}

/// Write one summary CSV per group under `output_dir/groups/`.
///
/// Files are named after the group's position and label, e.g.
/// `000_ground_wind_speed_0.csv`.
///
/// # Arguments
///
/// * `aggregation` - Aggregated batch to split by group
/// * `output_dir` - Directory that receives the `groups/` subdirectory
///
/// # Returns
///
/// The written paths, in group order.
///
/// # Errors
///
/// Returns [`ExportError::Empty`] when there are no groups, and an error if
/// directory creation or CSV writing fails.
pub fn export_group_csvs(
    aggregation: &Aggregation,
    output_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, ExportError> {
    writer_utils::ensure_not_empty(&aggregation.groups)?;
    let dir = output_dir.as_ref().join(GROUPS_DIR);

    let mut written = Vec::with_capacity(aggregation.groups.len());
    for (idx, group) in aggregation.groups.iter().enumerate() {
        let label = group.key.label();
        let records: Vec<_> = group.rows.iter().map(|row| (label.clone(), row)).collect();
        let axis_names = writer_utils::axis_names(group.rows.iter());

        let path = dir.join(format!("{idx:03}_{}.csv", writer_utils::sanitize_label(&label)));
        let file = writer_utils::create_output_file(&path)?;
        csv::export_records_csv_impl(&records, &axis_names, file)?;
        written.push(path);
    }
    Ok(written)
}

/// Export every failed run with its kind and diagnostic.
///
/// A batch without failures still gets a header row.
///
/// # Arguments
///
/// * `aggregation` - Aggregated batch whose failure ledgers are written
/// * `path` - Path to output CSV file
///
/// # Errors
///
/// Returns [`ExportError::Empty`] for an aggregation without records, and an
/// error if file creation or CSV writing fails.
pub fn export_failure_ledger_csv(
    aggregation: &Aggregation,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let records = writer_utils::labelled_records(aggregation);
    writer_utils::ensure_not_empty(&records)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_failure_ledger_impl(&records, file)
}

/// Export a two-axis pivot, one row per `row_axis` value.
///
/// Cells without samples are left empty.
///
/// # Errors
///
/// Returns [`ExportError::Empty`] for a pivot without rows, and an error if
/// file creation or CSV writing fails.
pub fn export_pivot_csv(pivot: &PivotTable, path: impl AsRef<Path>) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(&pivot.rows)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_pivot_impl(pivot, file)
}

/// Export the extrema table of a single run.
///
/// # Arguments
///
/// * `points` - Output of [`crate::metrics::extrema_table`] or
///   [`crate::metrics::extrema_table_in_zone`]
/// * `path` - Path to output CSV file
///
/// # Errors
///
/// Returns [`ExportError::Empty`] for an empty table, and an error if file
/// creation or CSV writing fails.
pub fn export_extrema_csv(points: &[ExtremaPoint], path: impl AsRef<Path>) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(points)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_extrema_impl(points, file)
}

/// Export the global summary and every group to JSON.
///
/// Each group carries its rows, counts and failure ledger.
///
/// # Arguments
///
/// * `aggregation` - Aggregated batch to serialize
/// * `path` - Path to output JSON file
///
/// # Errors
///
/// Returns an error if file creation or JSON serialization fails.
pub fn export_to_json(aggregation: &Aggregation, path: impl AsRef<Path>) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(&aggregation.groups)?;
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(aggregation, file)
}

/// Export landing points, flight tracks and dispersion boundaries per group,
/// plus the landing zone when one was configured.
///
/// # Errors
///
/// Returns an error if file creation or JSON serialization fails.
pub fn export_geo_json(aggregation: &Aggregation, path: impl AsRef<Path>) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(&aggregation.groups)?;
    let file = writer_utils::create_output_file(path)?;
    json::export_geo_json_impl(&aggregation.geo_export(), file)
}

/// Export the per-run records to Parquet.
///
/// Creates a Parquet file with one column per axis and per metric. Axis
/// values are stored as strings.
///
/// # Arguments
///
/// * `aggregation` - Aggregated batch whose records are written in sweep order
/// * `path` - Path to output Parquet file
///
/// # Errors
///
/// Returns an error if file creation or Parquet writing fails.
pub fn export_to_parquet(aggregation: &Aggregation, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let records = writer_utils::labelled_records(aggregation);
    writer_utils::ensure_not_empty(&records)?;
    let axis_names = writer_utils::axis_names(records.iter().map(|(_, record)| *record));
    let file = writer_utils::create_output_file(path)?;
    parquet::export_to_parquet_impl(&records, &axis_names, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, pivot_mean, AggregateOptions};
    use crate::executor::{FailureKind, RunOutcome};
    use crate::geo::LandingZone;
    use crate::metrics::{extrema_table_in_zone, SummaryOptions};
    use crate::time_series::{Sample, TimeSeries};
    use flight_sweep_core::{expand, ScenarioDescription};
    use tempfile::tempdir;

    fn series() -> TimeSeries {
        TimeSeries::from_samples(&[
            Sample { time: 0.0, latitude: 40.24, longitude: 139.99, altitude: 0.0, velocity: [0.0; 3] },
            Sample { time: 4.0, latitude: 40.24, longitude: 139.99, altitude: 300.0, velocity: [1.0, 1.0, -40.0] },
            Sample { time: 9.0, latitude: 40.235, longitude: 139.985, altitude: -2.0, velocity: [0.0, 0.0, 15.0] },
        ])
    }

    fn aggregation() -> Aggregation {
        let scenario = ScenarioDescription::new()
            .sweep("ground_wind_speed", vec![1.0, 2.0])
            .sweep("ground_wind_direction", vec![0.0, 180.0])
            .group_by(["ground_wind_speed"]);
        let outcomes = expand(&scenario)
            .unwrap()
            .into_iter()
            .map(|set| match set.sweep_index() {
                3 => RunOutcome::failure(set, FailureKind::Simulator, "exit status 2"),
                _ => RunOutcome::from_time_series(set, series(), &SummaryOptions::default()),
            })
            .collect();
        aggregate(outcomes, &AggregateOptions::for_scenario(&scenario)).unwrap()
    }

    #[test]
    fn test_export_summary_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.csv");
        export_summary_csv(&aggregation(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("sweep_index,group,fingerprint,ground_wind_speed,ground_wind_direction,success"));
        assert!(header.contains("landing_range_m"));
        assert_eq!(lines.count(), 4);
        assert!(contents.contains("exit status 2"));
    }

    #[test]
    fn test_export_group_csvs() {
        let dir = tempdir().unwrap();
        let paths = export_group_csvs(&aggregation(), dir.path()).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("groups/000_ground_wind_speed_1.csv"));
        for path in &paths {
            let contents = std::fs::read_to_string(path).unwrap();
            assert_eq!(contents.lines().count(), 3);
        }
    }

    #[test]
    fn test_export_failure_ledger_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failures.csv");
        export_failure_ledger_csv(&aggregation(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("3,ground_wind_speed=2,simulator,exit status 2"));
    }

    #[test]
    fn test_export_pivot_csv() {
        let aggregation = aggregation();
        let pivot = pivot_mean(
            aggregation.records(),
            "ground_wind_speed",
            "ground_wind_direction",
            |record| record.metrics.as_ref().map(|m| m.max_altitude),
        );
        let dir = tempdir().unwrap();
        let path = dir.path().join("pivot.csv");
        export_pivot_csv(&pivot, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "ground_wind_speed\\ground_wind_direction,0,180");
        assert_eq!(lines[1], "1,300,300");
        assert_eq!(lines[2], "2,300,");
    }

    #[test]
    fn test_export_extrema_csv() {
        let points = extrema_table_in_zone(&series(), &SummaryOptions::default(), &LandingZone::noshiro_sea());
        let dir = tempdir().unwrap();
        let path = dir.path().join("extrema.csv");
        export_extrema_csv(&points, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().next().unwrap().ends_with(",range_m,landing_margin_m"));
        assert!(contents.contains("max_altitude,300,4"));
        assert!(!contents.lines().nth(1).unwrap().ends_with(','));
        assert_eq!(contents.lines().count(), points.len() + 1);
    }

    #[test]
    fn test_export_json_documents() {
        let aggregation = aggregation();
        let dir = tempdir().unwrap();

        let summary_path = dir.path().join("summary.json");
        export_to_json(&aggregation, &summary_path).unwrap();
        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(summary["global"]["total"], 4);
        assert_eq!(summary["global"]["failures_by_kind"]["simulator"], 1);
        assert_eq!(summary["groups"][1]["failures"], 1);

        let geo_path = dir.path().join("geo.json");
        export_geo_json(&aggregation, &geo_path).unwrap();
        let geo: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&geo_path).unwrap()).unwrap();
        assert_eq!(geo["groups"][0]["color"], serde_json::json!([248, 112, 128]));
        assert_eq!(geo["groups"][0]["landing_points"].as_array().unwrap().len(), 2);
        assert_eq!(geo["groups"][0]["tracks"][0].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_export_to_parquet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.parquet");
        export_to_parquet(&aggregation(), &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_empty_pivot_is_rejected() {
        let pivot = pivot_mean(std::iter::empty(), "a", "b", |_| None);
        let dir = tempdir().unwrap();
        let error = export_pivot_csv(&pivot, dir.path().join("pivot.csv")).unwrap_err();
        assert!(matches!(error, ExportError::Empty));
    }
}
