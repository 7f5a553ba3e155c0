//! Raw CSV tables and declared schema mapping.
//!
//! Every loader declares, per column role, the exact list of header names it
//! accepts ([`ColumnRole`]). Headers are normalized before comparison
//! (BOM stripped, lowercased, punctuation collapsed to `_`), so `"Price ($)"`
//! and `price` are the same column. A role that matches nothing is a typed
//! [`SourceError::SchemaMismatch`], never a silent guess.
//!
//! Files are read as bytes and decoded per cell, so a stray Latin-1 byte
//! costs one cell (with a replacement character) rather than a row or a source.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, StringRecord};
use tracing::warn;

use crate::error::SourceError;

/// One semantic column a loader needs, with the header names it accepts in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRole {
    pub role: &'static str,
    pub aliases: Vec<String>,
}

impl ColumnRole {
    pub fn new(role: &'static str, aliases: &[&str]) -> Self {
        Self {
            role,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Replace the declared aliases when `custom` is non-empty.
    pub fn with_override(mut self, custom: &[String]) -> Self {
        if !custom.is_empty() {
            self.aliases = custom.to_vec();
        }
        self
    }
}

/// A CSV file read fully into memory with its normalized headers.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source_name: String,
    pub path: PathBuf,
    pub headers: Vec<String>,
    normalized: Vec<String>,
    pub rows: Vec<StringRecord>,
    /// Records the CSV reader itself rejected.
    pub rejected_rows: usize,
    /// Cells that were not valid UTF-8 and were decoded lossily.
    pub lossy_cells: usize,
}

/// Read a delimited file. `skip_rows` preamble lines are discarded before the header line.
pub fn read_table(
    source_name: &str,
    path: &Path,
    delimiter: u8,
    skip_rows: usize,
) -> Result<RawTable, SourceError> {
    if !path.exists() {
        return Err(SourceError::MissingSource {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
        });
    }

    let read_err = |message: String| SourceError::Read {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| read_err(e.to_string()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(file);

    let mut records = reader.byte_records();
    let mut lossy_cells = 0usize;
    let mut headers = None;
    let mut skipped = 0usize;
    for result in records.by_ref() {
        let record = result.map_err(|e| read_err(e.to_string()))?;
        if skipped < skip_rows {
            skipped += 1;
            continue;
        }
        headers = Some(decode_record(&record, &mut lossy_cells));
        break;
    }
    let headers: Vec<String> = headers
        .ok_or_else(|| read_err("file has no header line".to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut rejected_rows = 0usize;
    for result in records {
        match result {
            Ok(r) => rows.push(decode_record(&r, &mut lossy_cells)),
            Err(e) => {
                rejected_rows += 1;
                warn!(source = source_name, file = %path.display(), "rejected row: {e}");
            }
        }
    }
    if lossy_cells > 0 {
        warn!(
            source = source_name,
            file = %path.display(),
            lossy_cells,
            "decoded non-UTF-8 cells with replacement characters"
        );
    }

    Ok(RawTable {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        normalized: headers.iter().map(|h| normalize_header_name(h)).collect(),
        headers,
        rows,
        rejected_rows,
        lossy_cells,
    })
}

fn decode_record(record: &ByteRecord, lossy_cells: &mut usize) -> StringRecord {
    record
        .iter()
        .map(|field| match std::str::from_utf8(field) {
            Ok(s) => s.to_string(),
            Err(_) => {
                *lossy_cells += 1;
                String::from_utf8_lossy(field).into_owned()
            }
        })
        .collect()
}

impl RawTable {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Index of the first header matching the role's aliases, in alias priority order.
    pub fn find(&self, role: &ColumnRole) -> Option<usize> {
        role.aliases.iter().find_map(|alias| {
            let alias = normalize_header_name(alias);
            self.normalized.iter().position(|h| *h == alias)
        })
    }

    /// Like [`RawTable::find`], but a miss is a schema mismatch for this source.
    pub fn resolve(&self, role: &ColumnRole) -> Result<usize, SourceError> {
        self.find(role).ok_or_else(|| SourceError::SchemaMismatch {
            source_name: self.source_name.clone(),
            role: role.role,
            accepted: role.aliases.join(", "),
        })
    }

    pub fn normalized_header(&self, idx: usize) -> Option<&str> {
        self.normalized.get(idx).map(String::as_str)
    }
}

/// Trimmed, non-empty cell value.
pub fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

pub fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}').to_lowercase();

    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}
