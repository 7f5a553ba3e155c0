//! Wide per-country risk-index files.
//!
//! Each file holds one indicator: an identifier (date-like) column followed by
//! one column per country. The loader melts it to long form
//! `(date, country) -> value`. Merging the five indicators into
//! [`RiskRecord`](crate::domain::RiskRecord)s is the unifier's job.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::data::{LoadStats, Loaded};
use crate::domain::{DateStrategy, RiskIndicator};
use crate::error::SourceError;
use crate::io::parse::{parse_decimal, parse_timestamp_date};
use crate::io::table::{ColumnRole, cell, read_table};

/// One indicator in long form. Missing cells are absent keys.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorTable {
    pub indicator: RiskIndicator,
    pub cells: BTreeMap<(NaiveDate, String), f64>,
}

fn date_role() -> ColumnRole {
    ColumnRole::new("date", &["date", "fecha", "period", "time"])
}

pub fn load_indicator(
    source_name: &str,
    path: &Path,
    indicator: RiskIndicator,
    delimiter: char,
) -> Result<Loaded<IndicatorTable>, SourceError> {
    let delimiter = u8::try_from(delimiter).map_err(|_| SourceError::Read {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        message: format!("delimiter {delimiter:?} is not a single-byte character"),
    })?;
    let table = read_table(source_name, path, delimiter, 0)?;

    // The identifier column is the declared date column when present, else the first column.
    let id_col = table.find(&date_role()).unwrap_or(0);

    // Every other column is a country, except stray repeated date columns.
    let countries: Vec<(usize, String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| *idx != id_col && !name.trim().is_empty())
        .filter(|(idx, _)| {
            !table
                .normalized_header(*idx)
                .is_some_and(|h| h.starts_with("date"))
        })
        .map(|(idx, name)| (idx, name.trim().to_string()))
        .collect();

    if countries.is_empty() {
        return Err(SourceError::SchemaMismatch {
            source_name: source_name.to_string(),
            role: "country",
            accepted: "any non-date column".to_string(),
        });
    }

    let mut stats = LoadStats::for_table(&table);
    let mut cells = BTreeMap::new();

    for record in &table.rows {
        stats.rows_read += 1;
        let Some(date) = cell(record, id_col).and_then(parse_timestamp_date) else {
            stats.unparsable_cells += 1;
            continue;
        };
        stats.record_date(DateStrategy::ExplicitColumn);

        let mut used = false;
        for (idx, country) in &countries {
            let Some(raw) = cell(record, *idx) else { continue };
            match parse_decimal(raw) {
                Some(v) => {
                    // Duplicate (date, country) keeps the last row.
                    cells.insert((date, country.clone()), v);
                    used = true;
                }
                None => stats.unparsable_cells += 1,
            }
        }
        if used {
            stats.rows_used += 1;
        }
    }

    if cells.is_empty() {
        return Err(SourceError::Empty {
            source_name: source_name.to_string(),
        });
    }

    Ok(Loaded {
        value: IndicatorTable { indicator, cells },
        stats,
    })
}
