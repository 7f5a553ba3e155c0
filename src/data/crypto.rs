//! Cryptocurrency price exports (timestamp + price).
//!
//! Timestamps may be timezone-aware; they are normalized to UTC and truncated
//! to the calendar date. Several observations on one date keep the last one.

use std::path::Path;

use crate::config::AliasOverrides;
use crate::data::{LoadStats, Loaded};
use crate::domain::{DateStrategy, MarketSeries};
use crate::error::SourceError;
use crate::io::parse::{parse_price, parse_timestamp_date};
use crate::io::table::{ColumnRole, cell, read_table};

pub fn timestamp_role() -> ColumnRole {
    ColumnRole::new(
        "timestamp",
        &["snapped_at", "timestamp", "date", "datetime", "time"],
    )
}

pub fn price_role() -> ColumnRole {
    ColumnRole::new("price", &["price", "close", "price_usd", "amount"])
}

pub fn load_crypto(
    column: &str,
    path: &Path,
    aliases: Option<&AliasOverrides>,
) -> Result<Loaded<MarketSeries>, SourceError> {
    let table = read_table(column, path, b',', 0)?;

    let (ts_role, px_role) = match aliases {
        Some(a) => (
            timestamp_role().with_override(&a.date),
            price_role().with_override(&a.price),
        ),
        None => (timestamp_role(), price_role()),
    };
    let ts_col = table.resolve(&ts_role)?;
    let px_col = table.resolve(&px_role)?;

    let mut stats = LoadStats::for_table(&table);
    let mut series = MarketSeries::new(column);

    for record in &table.rows {
        stats.rows_read += 1;
        let Some(date) = cell(record, ts_col).and_then(parse_timestamp_date) else {
            stats.unparsable_cells += 1;
            continue;
        };
        let Some(price) = cell(record, px_col).and_then(parse_price) else {
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
