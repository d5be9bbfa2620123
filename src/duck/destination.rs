use anyhow::{Context, Result};
use duckdb::{params, Connection};

use super::validate_identifier;
use crate::normalize::TypedRecord;

/// Create the typed destination table if it is not there yet.
pub fn create_destination_table(conn: &Connection, table: &str) -> Result<()> {
    validate_identifier(table)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {}(
            workstation_id BIGINT NOT NULL,
            diameter_mm DOUBLE,
            wall_thickness_mm DOUBLE,
            volume_liters DOUBLE,
            thread_spec VARCHAR,
            cycle_time_seconds DOUBLE,
            planned_cycle_time_seconds DOUBLE
        );",
        table
    ))
    .with_context(|| format!("creating destination table {}", table))?;
    Ok(())
}

/// Delete rows previously imported for `workstation_id`. Returns rows deleted.
pub fn replace_workstation_rows(conn: &Connection, table: &str, workstation_id: i64) -> Result<usize> {
    validate_identifier(table)?;
    let n = conn
        .execute(
            &format!("DELETE FROM {} WHERE workstation_id = ?;", table),
            params![workstation_id],
        )
        .with_context(|| format!("clearing workstation {} from {}", workstation_id, table))?;
    Ok(n)
}

/// Append typed rows. Returns rows inserted.
///
/// Runs on whatever transaction `conn` is in; pass a `Transaction` to make the
/// insert atomic with a preceding `replace_workstation_rows`.
pub fn insert_typed_records(conn: &Connection, table: &str, records: &[TypedRecord]) -> Result<usize> {
    validate_identifier(table)?;
    let mut appender = conn
        .appender(table)
        .with_context(|| format!("opening appender on {}", table))?;
    for r in records {
        appender.append_row(params![
            r.workstation_id,
            r.diameter_mm,
            r.wall_thickness_mm,
            r.volume_liters,
            r.thread_spec,
            r.cycle_time_seconds,
            r.planned_cycle_time_seconds,
        ])?;
    }
    appender
        .flush()
        .with_context(|| format!("flushing rows into {}", table))?;
    Ok(records.len())
}
