//! Schema unification.
//!
//! Two artifacts come out of here and they are never flattened into one:
//!
//! - the market table ([`UnifiedDataset`]): one row per date, outer join of
//!   every market series, absent values stay missing
//! - the per-country risk table: one [`RiskRecord`] per `(date, country)`,
//!   outer join of the five indicator tables, tagged with its categories

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::data::{IndicatorTable, SourceBatch};
use crate::domain::{Column, ColumnKind, MarketSeries, RiskRecord, TimePoint, UnifiedDataset, tags_for};

/// Output of the unifier.
#[derive(Debug, Clone, Default)]
pub struct Unified {
    pub market: UnifiedDataset,
    pub risk: Vec<RiskRecord>,
}

impl Unified {
    /// Whether any date-bearing data survived loading.
    pub fn has_data(&self) -> bool {
        !self.market.is_empty() || !self.risk.is_empty()
    }
}

pub fn unify(batch: &SourceBatch, clip_risk_to_market: bool) -> Unified {
    let market = unify_market(&batch.market);
    let mut risk = merge_risk(&batch.risk);

    if clip_risk_to_market {
        if let Some(range) = market.date_range() {
            let before = risk.len();
            risk = clip_risk(risk, range);
            if risk.len() < before {
                debug!(dropped = before - risk.len(), "clipped risk records to market range");
            }
        }
    }

    info!(
        market_rows = market.row_count(),
        market_columns = market.columns.len(),
        risk_records = risk.len(),
        "unified sources"
    );
    Unified { market, risk }
}

/// Outer join on date. Column order follows input order; a repeated column
/// name keeps the first series and drops the later one.
pub fn unify_market(series: &[MarketSeries]) -> UnifiedDataset {
    let mut seen = BTreeSet::new();
    let mut kept: Vec<&MarketSeries> = Vec::with_capacity(series.len());
    for s in series {
        if seen.insert(s.name.as_str()) {
            kept.push(s);
        } else {
            warn!(column = %s.name, "duplicate market column, keeping the first source");
        }
    }

    let dates: Vec<TimePoint> = kept
        .iter()
        .flat_map(|s| s.points.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns = kept
        .into_iter()
        .map(|s| Column {
            name: s.name.clone(),
            kind: ColumnKind::Base,
            values: dates.iter().map(|d| s.get(*d)).collect(),
        })
        .collect();

    UnifiedDataset {
        dates,
        columns,
        interpolated: Vec::new(),
    }
}

/// Outer join of the indicator tables on `(date, country)`, sorted by date then country.
pub fn merge_risk(tables: &[IndicatorTable]) -> Vec<RiskRecord> {
    let mut merged: BTreeMap<(TimePoint, &str), RiskRecord> = BTreeMap::new();
    for table in tables {
        for ((date, country), value) in &table.cells {
            merged
                .entry((*date, country.as_str()))
                .or_insert_with(|| RiskRecord::new(*date, country.clone()))
                .values[table.indicator.index()] = Some(*value);
        }
    }

    let mut tags = BTreeMap::new();
    merged
        .into_values()
        .filter(|r| !r.is_empty())
        .map(|mut r| {
            r.tags = tags
                .entry(r.country.clone())
                .or_insert_with(|| tags_for(&r.country))
                .clone();
            r
        })
        .collect()
}

/// Keep records whose date lies inside `[start, end]`.
pub fn clip_risk(records: Vec<RiskRecord>, (start, end): (TimePoint, TimePoint)) -> Vec<RiskRecord> {
    records
        .into_iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect()
}
