//! Rolling volatility and percentage returns.
//!
//! Derived columns are rebuilt from the base columns on every call, so
//! applying them twice gives the same dataset as applying them once.
//! Interpolation only feeds the volatility columns. Returns and base columns
//! see the values the sources reported.

use tracing::info;

use crate::config::{InterpolationMode, VolatilityConfig};
use crate::domain::{Column, ColumnKind, UnifiedDataset};
use crate::math::sample_std;

/// Sample standard deviation of each trailing window, inclusive of the current point.
///
/// The first `window - 1` positions are missing, as is any window containing a gap.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice: Option<Vec<f64>> = values[i + 1 - window..=i].iter().copied().collect();
            slice.map(|w| sample_std(&w)).filter(|v| v.is_finite())
        })
        .collect()
}

/// `(v[t] / v[t-1] - 1) * 100` between adjacent rows.
///
/// Missing at the first observation, after a gap, and after a zero.
pub fn pct_returns(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    out.push(None);
    for pair in values.windows(2) {
        let r = match (pair[0], pair[1]) {
            (Some(prev), Some(cur)) if prev != 0.0 => Some((cur / prev - 1.0) * 100.0),
            _ => None,
        };
        out.push(r);
    }
    out.truncate(values.len());
    out
}

/// Fill gaps according to `mode`. Returns the filled values and how many cells changed.
///
/// Interior gaps are filled linearly by row position. `Extend` additionally
/// carries the first/last valid value outward.
pub fn interpolate(values: &[Option<f64>], mode: InterpolationMode) -> (Vec<Option<f64>>, usize) {
    let mut out = values.to_vec();
    if mode == InterpolationMode::Off {
        return (out, 0);
    }

    let valid: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    let (Some(&first), Some(&last)) = (valid.first(), valid.last()) else {
        return (out, 0);
    };

    let mut filled = 0;
    for pair in valid.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (Some(va), Some(vb)) = (values[a], values[b]) else {
            continue;
        };
        for i in a + 1..b {
            let t = (i - a) as f64 / (b - a) as f64;
            out[i] = Some(va + (vb - va) * t);
            filled += 1;
        }
    }

    if mode == InterpolationMode::Extend {
        for i in 0..first {
            out[i] = values[first];
            filled += 1;
        }
        for i in last + 1..values.len() {
            out[i] = values[last];
            filled += 1;
        }
    }

    (out, filled)
}

/// Prefix for derived columns: `btc_price_usd` -> `btc`, other names unchanged.
pub fn column_stem(name: &str) -> &str {
    name.strip_suffix("_price_usd").unwrap_or(name)
}

pub fn volatility_column(base: &str, window: usize) -> String {
    format!("{}_volatility_{window}d", column_stem(base))
}

pub fn returns_column(base: &str) -> String {
    format!("{}_returns", column_stem(base))
}

/// Replace every derived column with a fresh volatility and returns column per base column.
pub fn apply_derived(dataset: &mut UnifiedDataset, config: &VolatilityConfig) {
    dataset.columns.retain(|c| c.kind == ColumnKind::Base);
    dataset.interpolated.clear();

    let mut derived = Vec::with_capacity(dataset.columns.len() * 2);
    for column in &dataset.columns {
        let (values, filled) = interpolate(&column.values, config.interpolation);
        if filled > 0 {
            info!(
                column = %column.name,
                filled,
                mode = ?config.interpolation,
                "interpolated gaps before deriving volatility"
            );
            dataset.interpolated.push((column.name.clone(), filled));
        }

        derived.push(Column {
            name: volatility_column(&column.name, config.window),
            kind: ColumnKind::Volatility,
            values: rolling_std(&values, config.window),
        });
        derived.push(Column {
            name: returns_column(&column.name),
            kind: ColumnKind::Returns,
            values: pct_returns(&column.values),
        });
    }
    dataset.columns.extend(derived);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn dataset(values: Vec<Option<f64>>) -> UnifiedDataset {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        UnifiedDataset {
            dates: (0..values.len() as i64)
                .map(|i| start + chrono::Duration::days(i))
                .collect(),
            columns: vec![Column {
                name: "btc_price_usd".to_string(),
                kind: ColumnKind::Base,
                values,
            }],
            interpolated: Vec::new(),
        }
    }

    #[test]
    fn rolling_std_is_missing_until_window_fills() {
        let values = some(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        let out = rolling_std(&values, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - sample_std(&[1.0, 2.0, 3.0])).abs() < 1e-12);
        assert!((out[4].unwrap() - sample_std(&[3.0, 4.0, 10.0])).abs() < 1e-12);
    }

    #[test]
    fn rolling_std_needs_a_complete_window() {
        let values = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let out = rolling_std(&values, 3);
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);
        assert!(out[4].is_some());
    }

    #[test]
    fn returns_break_across_gaps() {
        let values = vec![Some(100.0), Some(110.0), None, Some(121.0), Some(133.1)];
        let out = pct_returns(&values);
        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);
        assert!((out[4].unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn interior_interpolation_does_not_extrapolate() {
        let values = vec![None, Some(1.0), None, None, Some(4.0), None];
        let (out, filled) = interpolate(&values, InterpolationMode::Interior);
        assert_eq!(out, vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0), None]);
        assert_eq!(filled, 2);

        let (out, filled) = interpolate(&values, InterpolationMode::Extend);
        assert_eq!(out[0], Some(1.0));
        assert_eq!(out[5], Some(4.0));
        assert_eq!(filled, 4);

        let (out, filled) = interpolate(&values, InterpolationMode::Off);
        assert_eq!(out, values);
        assert_eq!(filled, 0);
    }

    #[test]
    fn derived_columns_are_idempotent() {
        let mut ds = dataset(vec![
            Some(100.0),
            Some(102.0),
            None,
            Some(98.0),
            Some(105.0),
            Some(101.0),
            Some(99.0),
            Some(103.0),
        ]);
        let config = VolatilityConfig::default();
        apply_derived(&mut ds, &config);
        let once = ds.clone();
        apply_derived(&mut ds, &config);
        assert_eq!(ds, once);

        let names: Vec<_> = ds.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["btc_price_usd", "btc_volatility_7d", "btc_returns"]);
        assert_eq!(ds.interpolated, vec![("btc_price_usd".to_string(), 1)]);
        // The base column itself is left as reported.
        assert_eq!(ds.columns[0].values[2], None);
        assert!(ds.columns[1].values[6].is_some());
    }

    #[test]
    fn derived_returns_ignore_interpolated_cells() {
        let mut ds = dataset(vec![Some(100.0), Some(110.0), None, Some(121.0), Some(133.1)]);
        let config = VolatilityConfig {
            window: 2,
            ..VolatilityConfig::default()
        };
        assert_eq!(config.interpolation, InterpolationMode::Interior);
        apply_derived(&mut ds, &config);

        let returns = &ds.columns[2].values;
        assert_eq!(ds.columns[2].name, "btc_returns");
        assert_eq!(returns[0], None);
        assert!((returns[1].unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(returns[2], None);
        assert_eq!(returns[3], None);
        assert!((returns[4].unwrap() - 10.0).abs() < 1e-9);

        // Volatility still sees the filled cell.
        assert!(ds.columns[1].values[2].is_some());
        assert!(ds.columns[1].values[3].is_some());
    }
}
