use std::fs::File;

use crate::aggregate::{PivotTable, RunSummaryRecord};
use crate::error::ExportError;
use crate::metrics::ExtremaPoint;

use super::writer_utils::{format_optional, metric_values, METRIC_COLUMNS};

pub(crate) fn export_records_csv_impl(
    records: &[(String, &RunSummaryRecord)],
    axis_names: &[String],
    file: File,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);

    let mut header: Vec<&str> = vec!["sweep_index", "group", "fingerprint"];
    header.extend(axis_names.iter().map(String::as_str));
    header.extend(["success", "error_kind"]);
    header.extend(METRIC_COLUMNS);
    header.extend(["landing_margin_m", "diagnostic"]);
    wtr.write_record(&header)?;

    for (group, record) in records {
        let mut row = vec![
            record.sweep_index.to_string(),
            group.clone(),
            record.fingerprint.clone(),
        ];
        row.extend(axis_names.iter().map(|axis| {
            record
                .axis_tag
                .get(axis)
                .map(ToString::to_string)
                .unwrap_or_default()
        }));
        row.push(record.success.to_string());
        row.push(
            record
                .error_kind
                .map(|kind| kind.as_str().to_string())
                .unwrap_or_default(),
        );
        row.extend(metric_values(record.metrics.as_ref()).into_iter().map(format_optional));
        row.push(format_optional(record.landing_margin_m));
        row.push(record.diagnostic.clone().unwrap_or_default());
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_failure_ledger_impl(
    records: &[(String, &RunSummaryRecord)],
    file: File,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(["sweep_index", "group", "kind", "diagnostic"])?;

    for (group, record) in records {
        let Some(kind) = record.error_kind else {
            continue;
        };
        wtr.write_record([
            record.sweep_index.to_string().as_str(),
            group.as_str(),
            kind.as_str(),
            record.diagnostic.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_pivot_impl(pivot: &PivotTable, file: File) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);

    let mut header = vec![format!("{}\\{}", pivot.row_axis, pivot.column_axis)];
    header.extend(pivot.columns.iter().map(ToString::to_string));
    wtr.write_record(&header)?;

    for (row_value, cells) in pivot.rows.iter().zip(&pivot.cells) {
        let mut row = vec![row_value.to_string()];
        row.extend(cells.iter().copied().map(format_optional));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_extrema_impl(points: &[ExtremaPoint], file: File) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record([
        "kind",
        "value",
        "time",
        "altitude",
        "speed",
        "latitude",
        "longitude",
        "north_m",
        "east_m",
        "range_m",
        "landing_margin_m",
    ])?;

    for point in points {
        wtr.write_record([
            point.kind.as_str().to_string(),
            point.value.to_string(),
            point.time.to_string(),
            point.altitude.to_string(),
            point.speed.to_string(),
            point.latitude.to_string(),
            point.longitude.to_string(),
            point.offset.north_m.to_string(),
            point.offset.east_m.to_string(),
            point.offset.range_m.to_string(),
            format_optional(point.landing_margin_m),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
