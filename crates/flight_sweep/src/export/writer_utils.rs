use std::fs::{self, File};
use std::path::Path;

use crate::aggregate::{Aggregation, RunSummaryRecord};
use crate::error::ExportError;
use crate::metrics::SummaryMetrics;

pub(crate) const METRIC_COLUMNS: [&str; 14] = [
    "max_altitude",
    "apogee_time",
    "max_speed",
    "max_speed_time",
    "landing_time",
    "flight_duration",
    "landing_latitude",
    "landing_longitude",
    "landing_north_m",
    "landing_east_m",
    "landing_range_m",
    "max_dynamic_pressure",
    "max_thrust",
    "launch_clear_speed",
];

/// Metric values in [`METRIC_COLUMNS`] order; all `None` for failed runs.
pub(crate) fn metric_values(metrics: Option<&SummaryMetrics>) -> [Option<f64>; 14] {
    let Some(m) = metrics else {
        return [None; 14];
    };
    [
        Some(m.max_altitude),
        Some(m.apogee_time),
        Some(m.max_speed),
        Some(m.max_speed_time),
        Some(m.landing_time),
        Some(m.flight_duration),
        Some(m.landing_latitude),
        Some(m.landing_longitude),
        Some(m.landing_north_m),
        Some(m.landing_east_m),
        Some(m.landing_range_m),
        m.max_dynamic_pressure,
        m.max_thrust,
        m.launch_clear_speed,
    ]
}

/// Records paired with their group label, in sweep-index order.
pub(crate) fn labelled_records(aggregation: &Aggregation) -> Vec<(String, &RunSummaryRecord)> {
    let mut records: Vec<(String, &RunSummaryRecord)> = aggregation
        .groups
        .iter()
        .flat_map(|group| {
            let label = group.key.label();
            group.rows.iter().map(move |row| (label.clone(), row))
        })
        .collect();
    records.sort_by_key(|(_, record)| record.sweep_index);
    records
}

/// Axis names in declaration order, taken from the first record.
pub(crate) fn axis_names<'a>(records: impl IntoIterator<Item = &'a RunSummaryRecord>) -> Vec<String> {
    records
        .into_iter()
        .next()
        .map(|record| {
            record
                .axis_tag
                .entries()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn ensure_not_empty<T>(items: &[T]) -> Result<(), ExportError> {
    if items.is_empty() {
        return Err(ExportError::Empty);
    }

    Ok(())
}

pub(crate) fn create_output_file(path: impl AsRef<Path>) -> Result<File, ExportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// File-name-safe form of a group label.
pub(crate) fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

pub(crate) fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
