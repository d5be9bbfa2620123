use anyhow::{bail, Context, Result};
use duckdb::Connection;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

pub mod destination;
pub mod import_log;
pub mod staging;

pub use destination::{create_destination_table, insert_typed_records, replace_workstation_rows};
pub use import_log::{
    already_imported, create_import_log, record_import, ImportLogEntry, IMPORT_LOG_TABLE,
};
pub use staging::{
    clean_staging_table, create_staging_table, insert_staged_rows, load_staged_records,
};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Table names are spliced into SQL, so only plain identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        bail!("{:?} is not a plain SQL identifier", name);
    }
    Ok(())
}

/// Open a DuckDB database on disk at `path`, creating the file if it doesn't exist.
pub fn open_disk_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    let conn = Connection::open(path)
        .with_context(|| format!("opening DuckDB database {:?}", path))?;
    Ok(conn)
}

/// Open a DuckDB in‐memory database
pub fn open_mem_db() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("opening in-memory DuckDB")?;
    Ok(conn)
}

/// Row count of `table`.
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    validate_identifier(table)?;
    let n: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {};", table), [], |r| r.get(0))
        .with_context(|| format!("counting rows of {}", table))?;
    Ok(n as u64)
}
