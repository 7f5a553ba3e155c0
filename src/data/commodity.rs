//! Commodity price files (e.g. Brent / WTI daily spot).
//!
//! The files carry a short preamble before the header line; after it, the
//! first two columns are `(date, price)` whatever their header text says.

use std::path::Path;

use crate::data::{LoadStats, Loaded};
use crate::domain::{DateStrategy, MarketSeries};
use crate::error::SourceError;
use crate::io::parse::{parse_date, parse_price};
use crate::io::table::{cell, read_table};

pub fn load_commodity(
    column: &str,
    path: &Path,
    skip_rows: usize,
) -> Result<Loaded<MarketSeries>, SourceError> {
    let table = read_table(column, path, b',', skip_rows)?;
    if table.column_count() < 2 {
        return Err(SourceError::SchemaMismatch {
            source_name: column.to_string(),
            role: "price",
            accepted: "second column".to_string(),
        });
    }

    let mut stats = LoadStats::for_table(&table);
    let mut series = MarketSeries::new(column);

    for record in &table.rows {
        stats.rows_read += 1;
        let (Some(raw_date), Some(raw_price)) = (cell(record, 0), cell(record, 1)) else {
            // Blank trailer lines are common in spreadsheet exports.
            continue;
        };
        let Some(date) = parse_date(raw_date) else {
            stats.unparsable_cells += 1;
            continue;
        };
        let Some(price) = parse_price(raw_price) else {
            stats.unparsable_cells += 1;
            continue;
        };
        series.insert(date, price);
        stats.record_date(DateStrategy::ExplicitColumn);
        stats.rows_used += 1;
    }

    if series.is_empty() {
        return Err(SourceError::Empty {
            source_name: column.to_string(),
        });
    }
    Ok(Loaded {
        value: series,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    #[test]
    fn preamble_is_skipped_and_columns_taken_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wti.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            "Back to Contents,Data 1: Cushing OK WTI\nSourcekey,RWTC\nDate,Cushing OK WTI Spot Price FOB (Dollars per Barrel)\n\
             01/02/2025,73.1\n2025-01-03,74.0\n2025-01-03,74.5\n2025-01-06,n/a\n,\n"
        )
        .unwrap();
        drop(f);

        let loaded = load_commodity("wti_price_usd", &path, 2).unwrap();
        let s = &loaded.value;
        assert_eq!(s.name, "wti_price_usd");
        assert_eq!(s.len(), 2);
        assert_eq!(s.get(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()), Some(73.1));
        // Duplicate date keeps the last observation.
        assert_eq!(s.get(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()), Some(74.5));
        assert_eq!(loaded.stats.unparsable_cells, 1);
    }
}
