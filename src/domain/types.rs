//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - produced by the loaders and the unifier
//! - consumed by the analysis stages without copying whole tables around
//! - exported to CSV with stable column names

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Calendar day keying every series (no time-of-day, no timezone).
pub type TimePoint = NaiveDate;

/// The five per-country risk indicators.
///
/// The column names returned by [`RiskIndicator::column`] are consumed by
/// downstream reporting; renaming them is a breaking change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskIndicator {
    GeopoliticalRisk,
    Conflicts,
    BilateralTensions,
    TradePolicyUncertainty,
    EconomicPolicyUncertainty,
}

impl RiskIndicator {
    pub const ALL: [RiskIndicator; 5] = [
        RiskIndicator::GeopoliticalRisk,
        RiskIndicator::Conflicts,
        RiskIndicator::BilateralTensions,
        RiskIndicator::TradePolicyUncertainty,
        RiskIndicator::EconomicPolicyUncertainty,
    ];

    pub fn column(self) -> &'static str {
        match self {
            RiskIndicator::GeopoliticalRisk => "geopolitical_risk",
            RiskIndicator::Conflicts => "conflicts",
            RiskIndicator::BilateralTensions => "bilateral_tensions",
            RiskIndicator::TradePolicyUncertainty => "trade_policy_uncertainty",
            RiskIndicator::EconomicPolicyUncertainty => "economic_policy_uncertainty",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RiskIndicator::GeopoliticalRisk => "Geopolitical Risk",
            RiskIndicator::Conflicts => "Conflicts",
            RiskIndicator::BilateralTensions => "Bilateral Tensions",
            RiskIndicator::TradePolicyUncertainty => "Trade Policy Uncertainty",
            RiskIndicator::EconomicPolicyUncertainty => "Economic Policy Uncertainty",
        }
    }

    /// Conflict indicators get the higher ALERT threshold in the early-warning rules.
    pub fn is_conflict(self) -> bool {
        matches!(self, RiskIndicator::Conflicts)
    }

    /// Position of this indicator inside [`RiskRecord::values`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Static strategic classification of a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTag {
    GeopoliticalCore,
    ActiveConflict,
    EnergyMarket,
    TechSupplyChain,
    StrategicMinerals,
    FinancialSystemic,
    MaritimeChoke,
}

impl CategoryTag {
    pub const ALL: [CategoryTag; 7] = [
        CategoryTag::GeopoliticalCore,
        CategoryTag::ActiveConflict,
        CategoryTag::EnergyMarket,
        CategoryTag::TechSupplyChain,
        CategoryTag::StrategicMinerals,
        CategoryTag::FinancialSystemic,
        CategoryTag::MaritimeChoke,
    ];

    /// Boolean flag column in the per-country risk table.
    pub fn column(self) -> &'static str {
        match self {
            CategoryTag::GeopoliticalCore => "is_geopolitical_core",
            CategoryTag::ActiveConflict => "is_active_conflict",
            CategoryTag::EnergyMarket => "is_energy_market",
            CategoryTag::TechSupplyChain => "is_tech_supply_chain",
            CategoryTag::StrategicMinerals => "is_strategic_minerals",
            CategoryTag::FinancialSystemic => "is_financial_systemic",
            CategoryTag::MaritimeChoke => "is_maritime_choke",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CategoryTag::GeopoliticalCore => "Geopolitical Core Powers",
            CategoryTag::ActiveConflict => "Active Conflict Zones",
            CategoryTag::EnergyMarket => "Energy Markets (OPEC+)",
            CategoryTag::TechSupplyChain => "Tech Supply Chain",
            CategoryTag::StrategicMinerals => "Strategic Minerals",
            CategoryTag::FinancialSystemic => "Financial Centers",
            CategoryTag::MaritimeChoke => "Maritime Choke Points",
        }
    }
}

/// One country on one date with all five indicators (each possibly missing).
///
/// Created by the risk loader, tagged once by the unifier, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRecord {
    pub date: TimePoint,
    pub country: String,
    /// Indexed by [`RiskIndicator::index`].
    pub values: [Option<f64>; 5],
    pub tags: BTreeSet<CategoryTag>,
}

impl RiskRecord {
    pub fn new(date: TimePoint, country: impl Into<String>) -> Self {
        Self {
            date,
            country: country.into(),
            values: [None; 5],
            tags: BTreeSet::new(),
        }
    }

    pub fn value(&self, indicator: RiskIndicator) -> Option<f64> {
        self.values[indicator.index()]
    }

    pub fn has_tag(&self, tag: CategoryTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// A named numeric column keyed by date. Absent dates are missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSeries {
    pub name: String,
    pub points: BTreeMap<TimePoint, f64>,
}

impl MarketSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: BTreeMap::new(),
        }
    }

    /// Insert an observation; a later observation on the same date replaces the earlier one.
    pub fn insert(&mut self, date: TimePoint, value: f64) {
        if value.is_finite() {
            self.points.insert(date, value);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, date: TimePoint) -> Option<f64> {
        self.points.get(&date).copied()
    }
}

/// How a column of the unified dataset came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Loaded from a source.
    Base,
    /// `*_volatility_{w}d`, derived from a base column.
    Volatility,
    /// `*_returns`, derived from a base column.
    Returns,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// One entry per dataset date.
    pub values: Vec<Option<f64>>,
}

/// Date-indexed table of every market series plus derived columns.
///
/// Invariants: exactly one row per date, dates strictly ascending, every
/// column has `dates.len()` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedDataset {
    pub dates: Vec<TimePoint>,
    pub columns: Vec<Column>,
    /// `(column, filled cells)` for every column altered by interpolation.
    pub interpolated: Vec<(String, usize)>,
}

impl UnifiedDataset {
    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn base_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind == ColumnKind::Base)
    }

    /// The non-missing values of a column as a date-keyed series.
    pub fn series(&self, name: &str) -> Option<MarketSeries> {
        let column = self.column(name)?;
        let mut series = MarketSeries::new(name);
        for (date, value) in self.dates.iter().zip(&column.values) {
            if let Some(v) = value {
                series.insert(*date, *v);
            }
        }
        Some(series)
    }

    pub fn date_range(&self) -> Option<(TimePoint, TimePoint)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }
}

/// Correlation of one risk indicator with one market variable at one lag.
///
/// `correlation` is NaN when fewer than two overlapping pairs exist or either
/// side has zero variance over the overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub risk_indicator: RiskIndicator,
    pub market_variable: String,
    pub lag_days: i64,
    pub correlation: f64,
    pub n_pairs: usize,
}

impl CorrelationResult {
    pub fn is_defined(&self) -> bool {
        self.correlation.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioLabel {
    Base,
    Bull,
    Bear,
    Stress,
}

impl ScenarioLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioLabel::Base => "base",
            ScenarioLabel::Bull => "bull",
            ScenarioLabel::Bear => "bear",
            ScenarioLabel::Stress => "stress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastScenario {
    pub label: ScenarioLabel,
    pub projected_value: f64,
}

/// A fixed, qualitative what-if description. Configuration data, never computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressScenario {
    pub name: &'static str,
    pub description: &'static str,
    pub probability: &'static str,
    pub geopolitical_risk_increase: f64,
    pub conflicts_increase: f64,
    pub btc_impact: &'static str,
    pub oil_impact: &'static str,
    pub gpu_impact: &'static str,
    pub mineral_impact: Option<&'static str>,
    pub timeline: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Alert,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Alert => "ALERT",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningSignal {
    pub severity: Severity,
    pub indicator: String,
    pub observed_value: f64,
    pub detail: String,
    pub recommended_action: String,
}

/// Which best-effort strategy produced a snapshot's date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStrategy {
    /// A date column inside the table.
    ExplicitColumn,
    /// A `YYYY-MM-DD` pattern in the source file name.
    IdentifierPattern,
    /// The file's last-modified timestamp. Depends on the filesystem, not the data.
    FileModified,
}

impl DateStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            DateStrategy::ExplicitColumn => "explicit_column",
            DateStrategy::IdentifierPattern => "identifier_pattern",
            DateStrategy::FileModified => "file_modified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
    }

    #[test]
    fn indicator_index_matches_all_order() {
        for (i, ind) in RiskIndicator::ALL.iter().enumerate() {
            assert_eq!(ind.index(), i);
        }
    }

    #[test]
    fn market_series_keeps_last_observation_per_date() {
        let mut s = MarketSeries::new("x");
        s.insert(d(1), 1.0);
        s.insert(d(1), 2.0);
        s.insert(d(2), f64::NAN);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(d(1)), Some(2.0));
    }

    #[test]
    fn dataset_series_skips_missing_cells() {
        let ds = UnifiedDataset {
            dates: vec![d(1), d(2), d(3)],
            columns: vec![Column {
                name: "p".to_string(),
                kind: ColumnKind::Base,
                values: vec![Some(1.0), None, Some(3.0)],
            }],
            interpolated: Vec::new(),
        };
        let s = ds.series("p").unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.get(d(3)), Some(3.0));
        assert_eq!(ds.date_range(), Some((d(1), d(3))));
    }
}
