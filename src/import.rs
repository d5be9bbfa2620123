// src/import.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use duckdb::Connection;
use serde::Serialize;
use std::{path::PathBuf, time::Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::ImportConfig;
use crate::duck::{self, ImportLogEntry};
use crate::export;
use crate::normalize::{normalize_all, TypedRecord};
use crate::source;

/// Outcome of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: PathBuf,
    pub file_name: String,
    pub encoding: String,
    pub workstation_id: i64,
    /// Data rows parsed from the file (header rows excluded).
    pub rows_read: u64,
    /// Rows left in the staging table after cleanup.
    pub rows_staged: u64,
    pub rows_admitted: u64,
    pub rows_rejected: u64,
    /// Destination rows removed first (`replace_existing`).
    pub rows_replaced: u64,
    /// True when the import log already had this file and `force` was off.
    pub skipped: bool,
    pub parquet_out: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing import report")
    }
}

/// Open the configured database (in memory when none is set).
pub fn open_database(cfg: &ImportConfig) -> Result<Connection> {
    match &cfg.database {
        Some(path) => duck::open_disk_db(path),
        None => duck::open_mem_db(),
    }
}

/// Run one import against a fresh connection from `cfg`.
pub fn run_import(cfg: &ImportConfig) -> Result<ImportReport> {
    let mut conn = open_database(cfg)?;
    run_import_with(&mut conn, cfg)
}

/// Read → stage → clean → normalize → store, on an existing connection.
#[instrument(level = "info", skip(conn, cfg), fields(source = %cfg.source.display(), workstation = cfg.workstation_id))]
pub fn run_import_with(conn: &mut Connection, cfg: &ImportConfig) -> Result<ImportReport> {
    let started_at = Utc::now();
    let start = Instant::now();

    // ─── 1) read + decode + split ────────────────────────────────────
    let src = source::read_source(&cfg.source, cfg.encoding)?;
    let rows = source::parse_rows(&src.text, cfg.skip_rows)
        .with_context(|| format!("splitting rows of {}", src.file_name))?;
    info!(file = %src.file_name, rows = rows.len(), "rows parsed");

    let mut report = ImportReport {
        source: cfg.source.clone(),
        file_name: src.file_name.clone(),
        encoding: cfg.encoding.name().to_string(),
        workstation_id: cfg.workstation_id,
        rows_read: rows.len() as u64,
        rows_staged: 0,
        rows_admitted: 0,
        rows_rejected: 0,
        rows_replaced: 0,
        skipped: false,
        parquet_out: None,
        started_at,
        finished_at: started_at,
    };

    // ─── 2) skip files the log already has ──────────────────────────
    duck::create_import_log(conn)?;
    if !cfg.force
        && duck::already_imported(conn, &src.file_name, src.size_bytes, cfg.workstation_id)?
    {
        warn!(file = %src.file_name, "already imported for this workstation; skipping (use force to re-import)");
        report.skipped = true;
        report.finished_at = Utc::now();
        return Ok(report);
    }

    // ─── 3) stage + clean ───────────────────────────────────────────
    duck::create_staging_table(conn, &cfg.staging_table)?;
    duck::insert_staged_rows(conn, &cfg.staging_table, &rows)?;
    let removed = duck::clean_staging_table(conn, &cfg.staging_table)?;
    let staged = duck::load_staged_records(conn, &cfg.staging_table)?;
    report.rows_staged = staged.len() as u64;
    debug!(removed, staged = staged.len(), "staging complete");

    // ─── 4) normalize ───────────────────────────────────────────────
    let typed: Vec<TypedRecord> =
        normalize_all(&staged, cfg.workstation_id, cfg.default_oee_ratio).collect();
    report.rows_admitted = typed.len() as u64;
    report.rows_rejected = report.rows_staged - report.rows_admitted;
    info!(
        admitted = report.rows_admitted,
        rejected = report.rows_rejected,
        "rows normalized"
    );

    // ─── 5) destination + import log, one transaction ───────────────
    // a failed insert must not leave the workstation's previous rows deleted
    duck::create_destination_table(conn, &cfg.destination_table)?;
    let tx = conn
        .transaction()
        .context("starting destination transaction")?;
    if cfg.replace_existing {
        report.rows_replaced =
            duck::replace_workstation_rows(&tx, &cfg.destination_table, cfg.workstation_id)? as u64;
        info!(replaced = report.rows_replaced, "previous rows of workstation removed");
    }
    duck::insert_typed_records(&tx, &cfg.destination_table, &typed)?;

    report.finished_at = Utc::now();
    duck::record_import(
        &tx,
        &ImportLogEntry {
            file_name: src.file_name,
            size_bytes: src.size_bytes,
            workstation_id: cfg.workstation_id,
            rows_admitted: report.rows_admitted,
            started_at: report.started_at,
            finished_at: report.finished_at,
        },
    )?;
    tx.commit().context("committing destination rows")?;

    // ─── 6) optional parquet export ─────────────────────────────────
    if let Some(out) = &cfg.parquet_out {
        export::write_typed_parquet(&typed, out)?;
        report.parquet_out = Some(out.clone());
    }

    info!(elapsed = ?start.elapsed(), "import complete");
    Ok(report)
}
