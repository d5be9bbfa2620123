// src/source/mod.rs
pub mod decode;

pub use decode::SourceEncoding;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::{
    fs::{self, File},
    io::{Cursor, Read},
    path::Path,
};
use tracing::{debug, info, instrument};
use zip::ZipArchive;

use crate::normalize::{RawRecord, RAW_FIELD_COUNT};

/// Field delimiter of the export.
pub const DELIMITER: u8 = b';';

/// A decoded export file.
#[derive(Debug)]
pub struct SourceText {
    /// File name (for a zipped export, the archive name).
    pub file_name: String,
    /// Size of the file on disk, in bytes.
    pub size_bytes: u64,
    pub text: String,
}

/// One data row, as split from the file, with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRow {
    pub line_no: u64,
    pub record: RawRecord,
}

/// Read `path` (a `.csv`, or a `.zip` holding exactly one `.csv`) and decode it.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_source<P: AsRef<Path>>(path: P, encoding: SourceEncoding) -> Result<SourceText> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let size_bytes = fs::metadata(path)
        .with_context(|| format!("Failed to stat source file: {:?}", path))?
        .len();

    let bytes = if file_name.to_lowercase().ends_with(".zip") {
        read_single_csv_from_zip(path)?
    } else {
        fs::read(path).with_context(|| format!("Failed to read source file: {:?}", path))?
    };

    let text = encoding.decode(&bytes, &file_name);
    info!(file = %file_name, size_bytes, encoding = %encoding, "source decoded");

    Ok(SourceText {
        file_name,
        size_bytes,
        text,
    })
}

/// Buffer the only `.csv` entry of a ZIP archive.
fn read_single_csv_from_zip(zip_path: &Path) -> Result<Vec<u8>> {
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;

    let mut found: Option<(String, Vec<u8>)> = None;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{} in {:?}", i, zip_path))?;
        let name = entry.name().to_string();
        if !entry.is_file() || !name.to_lowercase().ends_with(".csv") {
            debug!(entry = %name, "skipping non-CSV entry");
            continue;
        }
        if let Some((first, _)) = &found {
            bail!(
                "ZIP archive {:?} holds more than one CSV ({} and {})",
                zip_path,
                first,
                name
            );
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("Failed to read {} into memory", name))?;
        found = Some((name, buf));
    }

    match found {
        Some((name, buf)) => {
            debug!(entry = %name, bytes = buf.len(), "using CSV entry");
            Ok(buf)
        }
        None => bail!("ZIP archive {:?} contains no CSV entry", zip_path),
    }
}

/// Split decoded text into rows on `;`, skipping the first `skip_rows` records.
///
/// Fields are kept as written (the staging table holds raw text); ragged rows
/// leave their missing trailing fields as `None`. Empty lines never produce a row.
/// Quotes are not special: a stray `"` stays in its field instead of joining the
/// following lines, and surrounding quotes are stripped during staging cleanup.
pub fn parse_rows(text: &str, skip_rows: usize) -> Result<Vec<StagedRow>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(Cursor::new(text.as_bytes()));

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        if idx < skip_rows {
            continue;
        }
        if record.len() > RAW_FIELD_COUNT {
            debug!(record = idx, fields = record.len(), "ignoring trailing fields");
        }
        let line_no = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 1);
        rows.push(StagedRow {
            line_no,
            record: RawRecord::from_fields(record.iter().map(Some)),
        });
    }
    Ok(rows)
}
