// src/duck/staging.rs

use anyhow::{Context, Result};
use duckdb::{params, Connection};
use tracing::debug;

use super::validate_identifier;
use crate::normalize::RawRecord;
use crate::source::StagedRow;

/// Untyped text columns of the staging table, in file order.
pub const STAGING_COLUMNS: [&str; 8] = [
    "col1",
    "capacity",
    "diameter",
    "thickness",
    "heat_treat_cycle_seconds",
    "oee",
    "notes",
    "extra",
];

/// (Re)create the staging table: a line number plus eight VARCHAR columns.
pub fn create_staging_table(conn: &Connection, table: &str) -> Result<()> {
    validate_identifier(table)?;
    let cols = STAGING_COLUMNS
        .iter()
        .map(|c| format!("{} VARCHAR", c))
        .collect::<Vec<_>>()
        .join(",\n            ");
    let sql = format!(
        "DROP TABLE IF EXISTS {t};
        CREATE TABLE {t}(
            line_no BIGINT NOT NULL,
            {cols}
        );",
        t = table,
        cols = cols
    );
    conn.execute_batch(&sql)
        .with_context(|| format!("creating staging table {}", table))?;
    Ok(())
}

/// Append raw rows via the DuckDB appender. Returns rows appended.
pub fn insert_staged_rows(conn: &Connection, table: &str, rows: &[StagedRow]) -> Result<usize> {
    validate_identifier(table)?;
    let mut appender = conn
        .appender(table)
        .with_context(|| format!("opening appender on {}", table))?;
    for row in rows {
        let r = &row.record;
        appender.append_row(params![
            row.line_no as i64,
            r.col1,
            r.capacity,
            r.diameter,
            r.thickness,
            r.heat_treat_cycle_seconds,
            r.oee,
            r.notes,
            r.extra,
        ])?;
    }
    appender.flush()?;
    Ok(rows.len())
}

/// SQL for `column` with surrounding whitespace removed, then one pair of outer
/// quotes and the whitespace inside them.
fn cleaned_column(column: &str) -> String {
    let strip_ws = |expr: &str| format!(r"regexp_replace({}, '^\s+|\s+$', '', 'g')", expr);
    strip_ws(&format!(
        r#"regexp_replace({}, '^"(.*)"$', '\1')"#,
        strip_ws(column)
    ))
}

/// Trim every text column, strip one pair of surrounding quotes, turn empty
/// strings into NULL and delete rows left with no value at all. Returns the
/// number of deleted rows.
pub fn clean_staging_table(conn: &Connection, table: &str) -> Result<usize> {
    validate_identifier(table)?;
    let sets = STAGING_COLUMNS
        .iter()
        .map(|c| format!("{} = NULLIF({}, '')", c, cleaned_column(c)))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute(&format!("UPDATE {} SET {};", table, sets), [])
        .with_context(|| format!("trimming staging table {}", table))?;

    let all_null = STAGING_COLUMNS
        .iter()
        .map(|c| format!("{} IS NULL", c))
        .collect::<Vec<_>>()
        .join(" AND ");
    let deleted = conn
        .execute(&format!("DELETE FROM {} WHERE {};", table, all_null), [])
        .with_context(|| format!("deleting blank rows from {}", table))?;
    debug!(table, deleted, "staging table cleaned");
    Ok(deleted)
}

/// Read the cleaned rows back in file order.
pub fn load_staged_records(conn: &Connection, table: &str) -> Result<Vec<RawRecord>> {
    validate_identifier(table)?;
    let sql = format!(
        "SELECT {} FROM {} ORDER BY line_no;",
        STAGING_COLUMNS.join(", "),
        table
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("reading staging table {}", table))?;
    let rows = stmt.query_map([], |row| {
        let mut fields: Vec<Option<String>> = Vec::with_capacity(STAGING_COLUMNS.len());
        for i in 0..STAGING_COLUMNS.len() {
            fields.push(row.get::<_, Option<String>>(i)?);
        }
        Ok(RawRecord::from_fields(fields))
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duck::{count_rows, open_mem_db};

    fn staged(line_no: u64, fields: &[&str]) -> StagedRow {
        StagedRow {
            line_no,
            record: RawRecord::from_fields(fields.iter().map(|s| Some(*s))),
        }
    }

    #[test]
    fn stage_clean_and_load() -> Result<()> {
        let conn = open_mem_db()?;
        create_staging_table(&conn, "stage")?;

        let rows = vec![
            staged(5, &["B", " 60 ", "", "", "", "", "", ""]),
            staged(2, &["A", "50", "\"140-141\"", "", "", "", "  M30x2 ", ""]),
            staged(3, &["", "  ", "\t", "", "", "", "", ""]),
            staged(4, &["\"\"", "", ""]),
        ];
        assert_eq!(insert_staged_rows(&conn, "stage", &rows)?, 4);
        assert_eq!(count_rows(&conn, "stage")?, 4);

        let deleted = clean_staging_table(&conn, "stage")?;
        assert_eq!(deleted, 2);

        let records = load_staged_records(&conn, "stage")?;
        // ordered by line number
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].col1.as_deref(), Some("A"));
        assert_eq!(records[0].diameter.as_deref(), Some("140-141"));
        assert_eq!(records[0].notes.as_deref(), Some("M30x2"));
        assert_eq!(records[0].thickness, None);
        assert_eq!(records[1].capacity.as_deref(), Some("60"));
        Ok(())
    }

    #[test]
    fn quote_only_rows_are_deleted() -> Result<()> {
        let conn = open_mem_db()?;
        create_staging_table(&conn, "stage")?;
        let rows = vec![
            staged(2, &["\"\"", " \" \" ", "", "", "", "", "", ""]),
            staged(3, &["\"", "", "", "", "", "", "\"\"M8\"\"", ""]),
        ];
        insert_staged_rows(&conn, "stage", &rows)?;

        assert_eq!(clean_staging_table(&conn, "stage")?, 1);
        let records = load_staged_records(&conn, "stage")?;
        assert_eq!(records.len(), 1);
        // a lone quote is data, and only the outer pair is stripped
        assert_eq!(records[0].col1.as_deref(), Some("\""));
        assert_eq!(records[0].notes.as_deref(), Some("\"M8\""));
        Ok(())
    }

    #[test]
    fn recreate_drops_previous_rows() -> Result<()> {
        let conn = open_mem_db()?;
        create_staging_table(&conn, "stage")?;
        insert_staged_rows(&conn, "stage", &[staged(2, &["A", "1"])])?;
        create_staging_table(&conn, "stage")?;
        assert_eq!(count_rows(&conn, "stage")?, 0);
        Ok(())
    }
}
