// src/duck/import_log.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};

/// Table holding one row per completed import.
pub const IMPORT_LOG_TABLE: &str = "import_log";

/// A completed import, keyed by file name + size + workstation.
#[derive(Debug, Clone)]
pub struct ImportLogEntry {
    pub file_name: String,
    pub size_bytes: u64,
    pub workstation_id: i64,
    pub rows_admitted: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub fn create_import_log(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {}(
            file_name VARCHAR NOT NULL,
            size_bytes BIGINT NOT NULL,
            workstation_id BIGINT NOT NULL,
            rows_admitted BIGINT NOT NULL,
            started_at TIMESTAMP NOT NULL,
            finished_at TIMESTAMP NOT NULL
        );",
        IMPORT_LOG_TABLE
    ))
    .context("creating import log table")?;
    Ok(())
}

pub fn record_import(conn: &Connection, entry: &ImportLogEntry) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} VALUES (?, ?, ?, ?, make_timestamp(?), make_timestamp(?));",
            IMPORT_LOG_TABLE
        ),
        params![
            entry.file_name,
            entry.size_bytes as i64,
            entry.workstation_id,
            entry.rows_admitted as i64,
            entry.started_at.timestamp_micros(),
            entry.finished_at.timestamp_micros(),
        ],
    )
    .with_context(|| format!("recording import of {}", entry.file_name))?;
    Ok(())
}

/// Whether this exact file was already imported for `workstation_id`.
pub fn already_imported(
    conn: &Connection,
    file_name: &str,
    size_bytes: u64,
    workstation_id: i64,
) -> Result<bool> {
    let n: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE file_name = ? AND size_bytes = ? AND workstation_id = ?;",
                IMPORT_LOG_TABLE
            ),
            params![file_name, size_bytes as i64, workstation_id],
            |r| r.get(0),
        )
        .context("querying import log")?;
    Ok(n > 0)
}
