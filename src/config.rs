// src/config.rs

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::duck::{validate_identifier, IMPORT_LOG_TABLE};
use crate::normalize::DEFAULT_OEE_RATIO;
use crate::source::SourceEncoding;

pub const DEFAULT_SKIP_ROWS: usize = 1;
pub const DEFAULT_STAGING_TABLE: &str = "staging_raw";
pub const DEFAULT_DESTINATION_TABLE: &str = "workstation_specs";

/// Settings as they appear in a YAML file or on the command line; every field optional.
///
/// ```yaml
/// source: exports/line3.csv
/// encoding: windows-1250
/// workstation_id: 3
/// default_oee_ratio: 0.85
/// database: plant.duckdb
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub source: Option<PathBuf>,
    pub encoding: Option<String>,
    pub workstation_id: Option<i64>,
    pub default_oee_ratio: Option<f64>,
    pub skip_rows: Option<usize>,
    pub database: Option<PathBuf>,
    pub staging_table: Option<String>,
    pub destination_table: Option<String>,
    pub parquet_out: Option<PathBuf>,
    pub replace_existing: Option<bool>,
    pub force: Option<bool>,
}

impl PartialConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("parsing import config YAML")
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("in config file {:?}", path))
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: PartialConfig) -> Self {
        Self {
            source: overrides.source.or(self.source),
            encoding: overrides.encoding.or(self.encoding),
            workstation_id: overrides.workstation_id.or(self.workstation_id),
            default_oee_ratio: overrides.default_oee_ratio.or(self.default_oee_ratio),
            skip_rows: overrides.skip_rows.or(self.skip_rows),
            database: overrides.database.or(self.database),
            staging_table: overrides.staging_table.or(self.staging_table),
            destination_table: overrides.destination_table.or(self.destination_table),
            parquet_out: overrides.parquet_out.or(self.parquet_out),
            replace_existing: overrides.replace_existing.or(self.replace_existing),
            force: overrides.force.or(self.force),
        }
    }

    /// Fill defaults and validate.
    pub fn resolve(self) -> Result<ImportConfig> {
        let source = self.source.ok_or_else(|| anyhow!("`source` is required"))?;
        let encoding_label = self.encoding.ok_or_else(|| {
            anyhow!("`encoding` is required (e.g. utf-8 or windows-1250); it is not guessed")
        })?;
        let encoding = SourceEncoding::from_label(&encoding_label)?;
        let workstation_id = self
            .workstation_id
            .ok_or_else(|| anyhow!("`workstation_id` is required"))?;

        let default_oee_ratio = self.default_oee_ratio.unwrap_or(DEFAULT_OEE_RATIO);
        if !default_oee_ratio.is_finite() || default_oee_ratio <= 0.0 || default_oee_ratio > 1.0 {
            bail!(
                "`default_oee_ratio` must be in (0, 1], got {}",
                default_oee_ratio
            );
        }

        let staging_table = self
            .staging_table
            .unwrap_or_else(|| DEFAULT_STAGING_TABLE.to_string());
        let destination_table = self
            .destination_table
            .unwrap_or_else(|| DEFAULT_DESTINATION_TABLE.to_string());
        validate_identifier(&staging_table).context("`staging_table`")?;
        validate_identifier(&destination_table).context("`destination_table`")?;
        if staging_table.eq_ignore_ascii_case(&destination_table) {
            bail!("`staging_table` and `destination_table` must differ");
        }
        for t in [&staging_table, &destination_table] {
            if t.eq_ignore_ascii_case(IMPORT_LOG_TABLE) {
                bail!("table name {:?} is reserved for the import log", t);
            }
        }

        Ok(ImportConfig {
            source,
            encoding,
            workstation_id,
            default_oee_ratio,
            skip_rows: self.skip_rows.unwrap_or(DEFAULT_SKIP_ROWS),
            database: self.database,
            staging_table,
            destination_table,
            parquet_out: self.parquet_out,
            replace_existing: self.replace_existing.unwrap_or(false),
            force: self.force.unwrap_or(false),
        })
    }
}

/// Validated settings for one import run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub source: PathBuf,
    pub encoding: SourceEncoding,
    pub workstation_id: i64,
    pub default_oee_ratio: f64,
    /// Leading records to drop (header lines).
    pub skip_rows: usize,
    /// DuckDB file; `None` runs against an in-memory database.
    pub database: Option<PathBuf>,
    pub staging_table: String,
    pub destination_table: String,
    pub parquet_out: Option<PathBuf>,
    /// Delete this workstation's rows from the destination before inserting.
    pub replace_existing: bool,
    /// Import even if the import log already has this file.
    pub force: bool,
}
