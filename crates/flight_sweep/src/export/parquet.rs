use std::fs::File;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::aggregate::RunSummaryRecord;
use crate::error::ExportError;

use super::writer_utils::{metric_values, METRIC_COLUMNS};

pub(crate) fn export_to_parquet_impl(
    records: &[(String, &RunSummaryRecord)],
    axis_names: &[String],
    file: File,
) -> Result<(), ExportError> {
    let batch = build_record_batch(records, axis_names)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

fn build_record_batch(
    records: &[(String, &RunSummaryRecord)],
    axis_names: &[String],
) -> Result<RecordBatch, arrow::error::ArrowError> {
    let schema = Arc::new(parquet_schema(axis_names));
    let arrays = build_arrays(records, axis_names);

    RecordBatch::try_new(schema, arrays)
}

/// Axis values are stored as text since one axis may mix value types.
fn parquet_schema(axis_names: &[String]) -> Schema {
    let mut fields = vec![
        Field::new("sweep_index", DataType::UInt64, false),
        Field::new("group", DataType::Utf8, false),
        Field::new("fingerprint", DataType::Utf8, false),
    ];
    fields.extend(
        axis_names
            .iter()
            .map(|axis| Field::new(axis.as_str(), DataType::Utf8, true)),
    );
    fields.push(Field::new("success", DataType::Boolean, false));
    fields.push(Field::new("error_kind", DataType::Utf8, true));
    fields.extend(
        METRIC_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, true)),
    );
    fields.push(Field::new("landing_margin_m", DataType::Float64, true));
    Schema::new(fields)
}

fn build_arrays(records: &[(String, &RunSummaryRecord)], axis_names: &[String]) -> Vec<ArrayRef> {
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(
            records
                .iter()
                .map(|(_, r)| r.sweep_index as u64)
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records
                .iter()
                .map(|(group, _)| group.as_str())
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records
                .iter()
                .map(|(_, r)| r.fingerprint.as_str())
                .collect::<Vec<_>>(),
        )),
    ];

    for axis in axis_names {
        arrays.push(Arc::new(StringArray::from(
            records
                .iter()
                .map(|(_, r)| r.axis_tag.get(axis).map(ToString::to_string))
                .collect::<Vec<Option<String>>>(),
        )));
    }

    arrays.push(Arc::new(BooleanArray::from(
        records.iter().map(|(_, r)| r.success).collect::<Vec<_>>(),
    )));
    arrays.push(Arc::new(StringArray::from(
        records
            .iter()
            .map(|(_, r)| r.error_kind.map(|kind| kind.as_str()))
            .collect::<Vec<Option<&str>>>(),
    )));

    let metrics: Vec<[Option<f64>; 14]> = records
        .iter()
        .map(|(_, r)| metric_values(r.metrics.as_ref()))
        .collect();
    for column in 0..METRIC_COLUMNS.len() {
        arrays.push(Arc::new(Float64Array::from(
            metrics.iter().map(|row| row[column]).collect::<Vec<_>>(),
        )));
    }

    arrays.push(Arc::new(Float64Array::from(
        records
            .iter()
            .map(|(_, r)| r.landing_margin_m)
            .collect::<Vec<_>>(),
    )));
    arrays
}
