use std::fs::File;

use serde::Serialize;

use crate::aggregate::{Aggregation, FailureEntry, GeoExport, GlobalSummary, GroupKey, RunSummaryRecord};
use crate::error::ExportError;

#[derive(Serialize)]
struct SummaryDocument<'a> {
    group_by: &'a [String],
    global: &'a GlobalSummary,
    groups: Vec<GroupDocument<'a>>,
}

#[derive(Serialize)]
struct GroupDocument<'a> {
    group_key: &'a GroupKey,
    label: String,
    successes: usize,
    failures: usize,
    rows: &'a [RunSummaryRecord],
    failure_ledger: &'a [FailureEntry],
}

pub(crate) fn export_to_json_impl(aggregation: &Aggregation, file: File) -> Result<(), ExportError> {
    let document = SummaryDocument {
        group_by: &aggregation.group_by,
        global: &aggregation.global,
        groups: aggregation
            .groups
            .iter()
            .map(|group| GroupDocument {
                group_key: &group.key,
                label: group.key.label(),
                successes: group.successes,
                failures: group.failures,
                rows: &group.rows,
                failure_ledger: &group.failure_ledger,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(file, &document)?;
    Ok(())
}

pub(crate) fn export_geo_json_impl(geo: &GeoExport, file: File) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(file, geo)?;
    Ok(())
}
