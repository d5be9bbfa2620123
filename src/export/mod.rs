// src/export/mod.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{fs, fs::File, path::Path, sync::Arc};
use tracing::info;

use crate::normalize::TypedRecord;

/// Arrow schema of the exported destination rows.
pub fn typed_record_schema() -> Schema {
    Schema::new(vec![
        Field::new("workstation_id", DataType::Int64, false),
        Field::new("diameter_mm", DataType::Float64, true),
        Field::new("wall_thickness_mm", DataType::Float64, true),
        Field::new("volume_liters", DataType::Float64, true),
        Field::new("thread_spec", DataType::Utf8, true),
        Field::new("cycle_time_seconds", DataType::Float64, true),
        Field::new("planned_cycle_time_seconds", DataType::Float64, true),
    ])
}

fn float_column(records: &[TypedRecord], f: impl Fn(&TypedRecord) -> Option<f64>) -> ArrayRef {
    Arc::new(records.iter().map(f).collect::<Float64Array>())
}

/// Build one RecordBatch holding `records`.
pub fn to_record_batch(records: &[TypedRecord]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.workstation_id),
        )) as ArrayRef,
        float_column(records, |r| r.diameter_mm),
        float_column(records, |r| r.wall_thickness_mm),
        float_column(records, |r| r.volume_liters),
        Arc::new(
            records
                .iter()
                .map(|r| r.thread_spec.as_deref())
                .collect::<StringArray>(),
        ) as ArrayRef,
        float_column(records, |r| r.cycle_time_seconds),
        float_column(records, |r| r.planned_cycle_time_seconds),
    ];
    RecordBatch::try_new(Arc::new(typed_record_schema()), columns)
        .context("building typed record batch")
}

/// Write `records` to a single Snappy-compressed Parquet file at `path`.
/// Written to a `.tmp` sibling first and renamed once closed. Returns the file size.
pub fn write_typed_parquet<P: AsRef<Path>>(records: &[TypedRecord], path: P) -> Result<u64> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {:?}", parent))?;
    }
    let temp_path = path.with_extension("tmp");

    let batch = to_record_batch(records)?;
    let file = File::create(&temp_path)
        .with_context(|| format!("creating parquet file {:?}", &temp_path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer for export")?;
    writer.write(&batch).context("writing export batch")?;
    writer.close().context("closing export writer")?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("renaming {:?} to {:?}", &temp_path, path))?;
    let bytes = fs::metadata(path)?.len();
    info!(path = %path.display(), rows = records.len(), bytes, "parquet export written");
    Ok(bytes)
}
