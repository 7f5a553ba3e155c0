//! Export every output table to CSV.
//!
//! Column names are a stable contract for downstream reporting. Missing values
//! are empty cells; undefined statistics are written `NaN`. Floats use the
//! shortest round-trip representation so repeated runs are byte-identical.

use std::path::Path;

use crate::analysis::volatility::volatility_column;
use crate::analysis::{CategorySummary, CurrentRiskLevel, Forecast, MineralProducer};
use crate::config::VolatilityConfig;
use crate::data::SourceReport;
use crate::domain::{
    CategoryTag, CorrelationResult, RiskIndicator, RiskRecord, StressScenario, UnifiedDataset,
    WarningSignal,
};
use crate::error::AppError;

pub const UNIFIED_FILE: &str = "unified_timeseries.csv";
pub const RISK_FILE: &str = "geopolitical_normalized.csv";
pub const CORRELATION_FILE: &str = "correlation_matrix.csv";
pub const FORECAST_FILE: &str = "forecast.csv";
pub const STRESS_FILE: &str = "stress_scenarios.csv";
pub const WARNING_FILE: &str = "early_warning_signals.csv";
pub const CATEGORY_FILE: &str = "category_summary_stats.csv";
pub const MINERAL_FILE: &str = "mineral_producer_risk.csv";
pub const SOURCE_REPORT_FILE: &str = "source_report.csv";
pub const INTERPOLATION_FILE: &str = "interpolation_notes.csv";

/// `NaN` for undefined values, shortest round-trip text otherwise.
pub fn fmt_f64(v: f64) -> String {
    if v.is_nan() { "NaN".to_string() } else { format!("{v}") }
}

/// Missing values are empty cells.
pub fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_f64).unwrap_or_default()
}

fn write_table(path: &Path, header: &[&str], rows: impl IntoIterator<Item = Vec<String>>) -> Result<(), AppError> {
    let err = |e: csv::Error| AppError::new(4, format!("Failed to write '{}': {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    writer.write_record(header).map_err(err)?;
    for row in rows {
        writer.write_record(&row).map_err(err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush '{}': {e}", path.display())))
}

/// `date` followed by every column of the dataset, in dataset order.
pub fn write_unified(path: &Path, dataset: &UnifiedDataset) -> Result<(), AppError> {
    let mut header = vec!["date"];
    header.extend(dataset.columns.iter().map(|c| c.name.as_str()));

    let rows = dataset.dates.iter().enumerate().map(|(i, date)| {
        let mut row = Vec::with_capacity(dataset.columns.len() + 1);
        row.push(date.to_string());
        row.extend(dataset.columns.iter().map(|c| fmt_opt(c.values[i])));
        row
    });
    write_table(path, &header, rows)
}

/// Per-country risk table: indicators then `0`/`1` category flags.
pub fn write_risk_table(path: &Path, records: &[RiskRecord]) -> Result<(), AppError> {
    let mut header = vec!["date", "country"];
    header.extend(RiskIndicator::ALL.iter().map(|i| i.column()));
    header.extend(CategoryTag::ALL.iter().map(|t| t.column()));

    let rows = records.iter().map(|r| {
        let mut row = vec![r.date.to_string(), r.country.clone()];
        row.extend(r.values.iter().map(|v| fmt_opt(*v)));
        row.extend(
            CategoryTag::ALL
                .iter()
                .map(|t| if r.has_tag(*t) { "1" } else { "0" }.to_string()),
        );
        row
    });
    write_table(path, &header, rows)
}

pub fn write_correlations(path: &Path, results: &[CorrelationResult]) -> Result<(), AppError> {
    let header = ["risk_indicator", "market_variable", "lag_days", "correlation", "n_pairs"];
    let rows = results.iter().map(|r| {
        vec![
            r.risk_indicator.column().to_string(),
            r.market_variable.clone(),
            r.lag_days.to_string(),
            fmt_f64(r.correlation),
            r.n_pairs.to_string(),
        ]
    });
    write_table(path, &header, rows)
}

/// The forecast record as `field,value` pairs. Absent parts are simply omitted.
pub fn write_forecast(
    path: &Path,
    forecast: Option<&Forecast>,
    current: Option<&CurrentRiskLevel>,
) -> Result<(), AppError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut push = |field: &str, value: String| rows.push(vec![field.to_string(), value]);

    if let Some(f) = forecast {
        push("target", f.target.clone());
        push("as_of", f.as_of.to_string());
        push("forecast_date", f.forecast_date.to_string());
        push("current_value", fmt_f64(f.current_value));
        push("risk_level", fmt_f64(f.risk_level));
        push("recent_volatility", fmt_f64(f.recent_volatility));
        push("k_risk", fmt_f64(f.k_risk));
        for s in &f.scenarios {
            push(s.label.as_str(), fmt_f64(s.projected_value));
        }
    }
    if let Some(c) = current {
        push("risk_date", c.date.to_string());
        push("avg_geopolitical_risk", fmt_f64(c.avg_geopolitical_risk));
        push("avg_conflicts", fmt_f64(c.avg_conflicts));
        push("high_risk_countries", c.high_risk_countries.to_string());
        push("active_conflicts", c.active_conflicts.to_string());
    }
    write_table(path, &["field", "value"], rows)
}

pub fn write_stress_scenarios(path: &Path, scenarios: &[StressScenario]) -> Result<(), AppError> {
    let header = [
        "name",
        "description",
        "probability",
        "geopolitical_risk_increase",
        "conflicts_increase",
        "btc_impact",
        "oil_impact",
        "gpu_impact",
        "timeline",
        "mineral_impact",
    ];
    let rows = scenarios.iter().map(|s| {
        vec![
            s.name.to_string(),
            s.description.to_string(),
            s.probability.to_string(),
            fmt_f64(s.geopolitical_risk_increase),
            fmt_f64(s.conflicts_increase),
            s.btc_impact.to_string(),
            s.oil_impact.to_string(),
            s.gpu_impact.to_string(),
            s.timeline.to_string(),
            s.mineral_impact.unwrap_or_default().to_string(),
        ]
    });
    write_table(path, &header, rows)
}

pub fn write_warnings(path: &Path, signals: &[WarningSignal]) -> Result<(), AppError> {
    let header = ["severity", "indicator", "observed_value", "detail", "recommended_action"];
    let rows = signals.iter().map(|s| {
        vec![
            s.severity.as_str().to_string(),
            s.indicator.clone(),
            fmt_f64(s.observed_value),
            s.detail.clone(),
            s.recommended_action.clone(),
        ]
    });
    write_table(path, &header, rows)
}

pub fn write_category_summary(path: &Path, summary: &[CategorySummary]) -> Result<(), AppError> {
    let header = [
        "category",
        "countries",
        "geopolitical_risk_mean",
        "geopolitical_risk_std",
        "geopolitical_risk_max",
        "conflicts_mean",
        "conflicts_std",
        "conflicts_max",
    ];
    let rows = summary.iter().map(|s| {
        vec![
            s.category.display_name().to_string(),
            s.countries.to_string(),
            fmt_f64(s.geopolitical_risk.mean),
            fmt_f64(s.geopolitical_risk.std),
            fmt_f64(s.geopolitical_risk.max),
            fmt_f64(s.conflicts.mean),
            fmt_f64(s.conflicts.std),
            fmt_f64(s.conflicts.max),
        ]
    });
    write_table(path, &header, rows)
}

pub fn write_mineral_producers(path: &Path, producers: &[MineralProducer]) -> Result<(), AppError> {
    let header = ["country", "geopolitical_risk", "conflicts", "risk_level"];
    let rows = producers.iter().map(|p| {
        vec![
            p.country.clone(),
            fmt_f64(p.geopolitical_risk),
            fmt_f64(p.conflicts),
            p.level.as_str().to_string(),
        ]
    });
    write_table(path, &header, rows)
}

pub fn write_source_report(path: &Path, reports: &[SourceReport]) -> Result<(), AppError> {
    let header = [
        "source",
        "path",
        "status",
        "detail",
        "columns",
        "files",
        "rows_read",
        "rows_used",
        "unparsable_cells",
        "rejected_rows",
        "lossy_cells",
        "date_strategies",
    ];
    let rows = reports.iter().map(|r| {
        vec![
            r.source_name.clone(),
            r.path.display().to_string(),
            r.status().to_string(),
            r.error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            r.columns.join(";"),
            r.stats.files.to_string(),
            r.stats.rows_read.to_string(),
            r.stats.rows_used.to_string(),
            r.stats.unparsable_cells.to_string(),
            r.stats.rejected_rows.to_string(),
            r.stats.lossy_cells.to_string(),
            r.stats.strategy_summary(),
        ]
    });
    write_table(path, &header, rows)
}

/// One row per base column whose gaps were filled before deriving volatility.
///
/// Base values in the unified table are never filled; only the named
/// volatility column saw the filled cells.
pub fn write_interpolation_notes(
    path: &Path,
    dataset: &UnifiedDataset,
    volatility: &VolatilityConfig,
) -> Result<(), AppError> {
    let header = ["column", "filled_cells", "mode", "derived_column"];
    let mode = format!("{:?}", volatility.interpolation).to_lowercase();
    let rows = dataset.interpolated.iter().map(|(name, filled)| {
        vec![
            name.clone(),
            filled.to_string(),
            mode.clone(),
            volatility_column(name, volatility.window),
        ]
    });
    write_table(path, &header, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnKind};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn float_formatting_is_round_trip_and_marks_undefined() {
        assert_eq!(fmt_f64(0.1), "0.1");
        assert_eq!(fmt_f64(75.0), "75");
        assert_eq!(fmt_f64(f64::NAN), "NaN");
        assert_eq!(fmt_opt(None), "");
    }

    #[test]
    fn unified_table_leaves_missing_cells_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(UNIFIED_FILE);
        let ds = UnifiedDataset {
            dates: vec![d(1), d(2)],
            columns: vec![
                Column {
                    name: "brent_price_usd".to_string(),
                    kind: ColumnKind::Base,
                    values: vec![Some(75.5), None],
                },
                Column {
                    name: "btc_price_usd".to_string(),
                    kind: ColumnKind::Base,
                    values: vec![None, Some(94000.25)],
                },
            ],
            interpolated: Vec::new(),
        };
        write_unified(&path, &ds).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "date,brent_price_usd,btc_price_usd\n2025-01-01,75.5,\n2025-01-02,,94000.25\n"
        );
    }

    #[test]
    fn correlation_table_writes_nan_for_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CORRELATION_FILE);
        let results = vec![CorrelationResult {
            risk_indicator: RiskIndicator::Conflicts,
            market_variable: "btc_price_usd".to_string(),
            lag_days: 7,
            correlation: f64::NAN,
            n_pairs: 1,
        }];
        write_correlations(&path, &results).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "risk_indicator,market_variable,lag_days,correlation,n_pairs\nconflicts,btc_price_usd,7,NaN,1\n"
        );
    }

    #[test]
    fn risk_table_has_flag_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RISK_FILE);
        let mut r = RiskRecord::new(d(1), "Chile");
        r.values[RiskIndicator::GeopoliticalRisk.index()] = Some(0.25);
        r.tags = crate::domain::tags_for("Chile");
        write_risk_table(&path, &[r]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("date,country,geopolitical_risk,conflicts"));
        assert!(header.ends_with("is_maritime_choke"));
        assert_eq!(lines.next().unwrap(), "2025-01-01,Chile,0.25,,,,,0,0,0,0,1,0,0");
    }

    #[test]
    fn unwritable_path_is_exit_code_4() {
        let err = write_warnings(Path::new("/nonexistent/dir/w.csv"), &[]).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
