//! Lag-correlation sweep.
//!
//! Lags are calendar days. At lag `L` the market value observed on date `d` is
//! paired with the risk value observed on `d - L`: risk leads, the market
//! series is never moved. A pair contributes only when both sides are present.

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::{info, warn};

use crate::config::LagConfig;
use crate::domain::{CorrelationResult, MarketSeries, RiskIndicator, RiskRecord, UnifiedDataset};
use crate::math::{mean, pearson};

/// Collapse per-country records to one value per date: the plain mean over
/// the countries reporting the indicator that day.
pub fn aggregate_daily(records: &[RiskRecord], indicator: RiskIndicator) -> MarketSeries {
    let mut by_date: BTreeMap<_, Vec<f64>> = BTreeMap::new();
    for r in records {
        if let Some(v) = r.value(indicator) {
            by_date.entry(r.date).or_default().push(v);
        }
    }

    let mut series = MarketSeries::new(indicator.column());
    for (date, values) in by_date {
        series.insert(date, mean(&values));
    }
    series
}

/// Overlapping `(risk, market)` pairs at `lag_days`, in market date order.
pub fn lagged_pairs(risk: &MarketSeries, market: &MarketSeries, lag_days: i64) -> (Vec<f64>, Vec<f64>) {
    let lag = Duration::days(lag_days);
    market
        .points
        .iter()
        .filter_map(|(date, m)| {
            let source = date.checked_sub_signed(lag)?;
            risk.get(source).map(|r| (r, *m))
        })
        .unzip()
}

pub fn correlate(
    indicator: RiskIndicator,
    risk: &MarketSeries,
    market: &MarketSeries,
    lag_days: i64,
) -> CorrelationResult {
    let (x, y) = lagged_pairs(risk, market, lag_days);
    CorrelationResult {
        risk_indicator: indicator,
        market_variable: market.name.clone(),
        lag_days,
        correlation: pearson(&x, &y),
        n_pairs: x.len(),
    }
}

/// One result per `(indicator, market variable, lag)`, defined or not.
///
/// Indicators without any data and requested market variables missing from
/// the dataset are skipped with a warning; everything else is dense.
pub fn correlation_table(
    records: &[RiskRecord],
    dataset: &UnifiedDataset,
    config: &LagConfig,
) -> Vec<CorrelationResult> {
    let lags = config.lags();

    let risk: Vec<(RiskIndicator, MarketSeries)> = config
        .risk_indicators
        .iter()
        .filter_map(|&indicator| {
            let series = aggregate_daily(records, indicator);
            if series.is_empty() {
                warn!(indicator = indicator.column(), "no risk data, skipping in lag sweep");
                return None;
            }
            Some((indicator, series))
        })
        .collect();

    let market: Vec<MarketSeries> = if config.market_variables.is_empty() {
        dataset
            .base_columns()
            .filter_map(|c| dataset.series(&c.name))
            .collect()
    } else {
        config
            .market_variables
            .iter()
            .filter_map(|name| {
                let series = dataset.series(name);
                if series.is_none() {
                    warn!(market_variable = %name, "requested market variable not in dataset");
                }
                series
            })
            .collect()
    };

    let mut out = Vec::with_capacity(risk.len() * market.len() * lags.len());
    for (indicator, risk_series) in &risk {
        for market_series in &market {
            for &lag in &lags {
                out.push(correlate(*indicator, risk_series, market_series, lag));
            }
        }
    }

    let defined = out.iter().filter(|r| r.is_defined()).count();
    info!(
        rows = out.len(),
        defined,
        lags = ?lags,
        "lag correlation sweep finished"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnKind};
    use chrono::NaiveDate;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(offset)
    }

    fn series(name: &str, values: &[(i64, f64)]) -> MarketSeries {
        let mut s = MarketSeries::new(name);
        for (offset, v) in values {
            s.insert(d(*offset), *v);
        }
        s
    }

    #[test]
    fn self_correlation_at_lag_zero_is_one() {
        let s = series("x", &[(0, 1.0), (1, 3.0), (2, 2.0), (3, 7.0)]);
        let r = correlate(RiskIndicator::GeopoliticalRisk, &s, &s, 0);
        assert!((r.correlation - 1.0).abs() < 1e-12);
        assert_eq!(r.n_pairs, 4);
    }

    #[test]
    fn four_point_example() {
        let market = series("btc_price_usd", &[(0, 100.0), (1, 102.0), (2, 98.0), (3, 105.0)]);
        let risk = series("geopolitical_risk", &[(0, 1.0), (1, 1.0), (2, 1.0), (3, 2.0)]);

        let r0 = correlate(RiskIndicator::GeopoliticalRisk, &risk, &market, 0);
        let expected = pearson(&[1.0, 1.0, 1.0, 2.0], &[100.0, 102.0, 98.0, 105.0]);
        assert!((r0.correlation - expected).abs() < 1e-12);
        assert!(r0.correlation > 0.0);

        let r7 = correlate(RiskIndicator::GeopoliticalRisk, &risk, &market, 7);
        assert!(r7.correlation.is_nan());
        assert_eq!(r7.n_pairs, 0);
    }

    #[test]
    fn lag_matches_manual_reindexing() {
        // Risk with gaps, market daily.
        let risk_points: Vec<(i64, f64)> = (0..40)
            .filter(|i| i % 5 != 3)
            .map(|i| (i, ((i * 7) % 11) as f64 + 0.5 * i as f64))
            .collect();
        let market_points: Vec<(i64, f64)> = (0..40)
            .map(|i| (i, 100.0 + ((i * 3) % 13) as f64 + i as f64))
            .collect();
        let risk = series("r", &risk_points);
        let market = series("m", &market_points);

        for lag in [0, 7, 14] {
            // Move every risk date forward by `lag`, then inner-join on date.
            let shifted: BTreeMap<NaiveDate, f64> = risk
                .points
                .iter()
                .map(|(date, v)| (*date + Duration::days(lag), *v))
                .collect();
            let (x, y): (Vec<f64>, Vec<f64>) = market
                .points
                .iter()
                .filter_map(|(date, m)| shifted.get(date).map(|r| (*r, *m)))
                .unzip();

            let r = correlate(RiskIndicator::Conflicts, &risk, &market, lag);
            assert_eq!(r.n_pairs, x.len());
            assert!((r.correlation - pearson(&x, &y)).abs() < 1e-12);
        }
    }

    #[test]
    fn risk_leads_market_not_the_reverse() {
        // Market repeats risk one week later.
        let risk = series("r", &[(0, 1.0), (1, 5.0), (2, 2.0), (3, 8.0)]);
        let market = series("m", &[(7, 1.0), (8, 5.0), (9, 2.0), (10, 8.0)]);
        let forward = correlate(RiskIndicator::GeopoliticalRisk, &risk, &market, 7);
        assert!((forward.correlation - 1.0).abs() < 1e-12);

        // Swapping roles gives no overlap at a positive lag.
        let reverse = correlate(RiskIndicator::GeopoliticalRisk, &market, &risk, 7);
        assert_eq!(reverse.n_pairs, 0);
    }

    #[test]
    fn daily_aggregate_is_the_mean_across_countries() {
        let mut a = RiskRecord::new(d(0), "A");
        a.values[RiskIndicator::Conflicts.index()] = Some(1.0);
        let mut b = RiskRecord::new(d(0), "B");
        b.values[RiskIndicator::Conflicts.index()] = Some(4.0);
        let c = RiskRecord::new(d(0), "C");

        let s = aggregate_daily(&[a, b, c], RiskIndicator::Conflicts);
        assert_eq!(s.get(d(0)), Some(2.5));
    }

    #[test]
    fn table_is_dense_over_lags() {
        let mut records = Vec::new();
        for i in 0..10 {
            let mut r = RiskRecord::new(d(i), "A");
            r.values[RiskIndicator::GeopoliticalRisk.index()] = Some(i as f64);
            records.push(r);
        }
        let dataset = UnifiedDataset {
            dates: (0..10).map(d).collect(),
            columns: vec![Column {
                name: "btc_price_usd".to_string(),
                kind: ColumnKind::Base,
                values: (0..10).map(|i| Some(100.0 + (i * i) as f64)).collect(),
            }],
            interpolated: Vec::new(),
        };

        let table = correlation_table(&records, &dataset, &LagConfig::default());
        // Conflicts and bilateral tensions have no data and are skipped.
        assert_eq!(table.len(), 5);
        let lags: Vec<i64> = table.iter().map(|r| r.lag_days).collect();
        assert_eq!(lags, vec![0, 7, 14, 21, 28]);
        assert!(table[0].is_defined());
        assert!(!table[4].is_defined());
    }
}
