//! Early-warning rules over the most recent risk records.
//!
//! Trend rules work on the daily cross-country mean of each configured
//! indicator, restricted to the trailing `window_days`. The moving average of
//! the last row is compared with the one `trend_lookback` rows earlier:
//!
//! - conflict indicators rising by more than `alert_rise` -> ALERT
//! - any indicator rising by more than `warning_rise` -> WARNING
//! - any indicator falling by more than `deescalation_fall` -> INFO
//!
//! Independently, every country whose latest geopolitical-risk value exceeds
//! `extreme_risk` gets a CRITICAL signal.

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::info;

use crate::analysis::lag::aggregate_daily;
use crate::config::WarningThresholds;
use crate::domain::{RiskIndicator, RiskRecord, Severity, WarningSignal};
use crate::math::mean;

/// Trailing moving average; missing until `window` values are available.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| (window > 0 && i + 1 >= window).then(|| mean(&values[i + 1 - window..=i])))
        .collect()
}

/// Change of the moving average over the last `lookback` rows, if both ends exist.
pub fn trend(values: &[f64], ma_window: usize, lookback: usize) -> Option<f64> {
    let ma = moving_average(values, ma_window);
    let last = ma.len().checked_sub(1)?;
    let earlier = last.checked_sub(lookback)?;
    Some(ma[last]? - ma[earlier]?)
}

pub fn recommended_action(severity: Severity, indicator: RiskIndicator) -> String {
    match (severity, indicator) {
        (Severity::Critical, _) => "Monitor supply chain exposure".to_string(),
        (Severity::Alert, _) => "Immediate: Long oil futures, Long BTC".to_string(),
        (Severity::Warning, RiskIndicator::GeopoliticalRisk) => {
            "Consider BTC long position (lag 28 days)".to_string()
        }
        (Severity::Warning, other) => format!("Review exposure to rising {}", other.display_name()),
        (Severity::Info, _) => "Consider profit-taking on risk-off positions".to_string(),
    }
}

/// Evaluate every rule. Signals are ordered by severity (most severe first),
/// then by indicator.
pub fn detect(records: &[RiskRecord], thresholds: &WarningThresholds) -> Vec<WarningSignal> {
    let mut signals = Vec::new();
    let Some(latest) = records.iter().map(|r| r.date).max() else {
        return signals;
    };
    let cutoff = latest - Duration::days(thresholds.window_days);
    let recent: Vec<RiskRecord> = records.iter().filter(|r| r.date >= cutoff).cloned().collect();

    for &indicator in &thresholds.indicators {
        let daily: Vec<f64> = aggregate_daily(&recent, indicator).points.into_values().collect();
        let Some(change) = trend(&daily, thresholds.ma_window, thresholds.trend_lookback) else {
            continue;
        };

        let severity = if indicator.is_conflict() && change > thresholds.alert_rise {
            Some((Severity::Alert, "Escalation"))
        } else if change > thresholds.warning_rise {
            Some((Severity::Warning, "Rising"))
        } else if change < -thresholds.deescalation_fall {
            Some((Severity::Info, "De-escalation"))
        } else {
            None
        };
        if let Some((severity, what)) = severity {
            signals.push(WarningSignal {
                severity,
                indicator: indicator.column().to_string(),
                observed_value: change,
                detail: format!(
                    "{} {what}: {change:+.2} over {} observations",
                    indicator.display_name(),
                    thresholds.trend_lookback
                ),
                recommended_action: recommended_action(severity, indicator),
            });
        }
    }

    for (country, value) in latest_by_country(records, RiskIndicator::GeopoliticalRisk) {
        if value > thresholds.extreme_risk {
            signals.push(WarningSignal {
                severity: Severity::Critical,
                indicator: RiskIndicator::GeopoliticalRisk.column().to_string(),
                observed_value: value,
                detail: format!("{country} - Extreme Risk: {value:.2}"),
                recommended_action: recommended_action(
                    Severity::Critical,
                    RiskIndicator::GeopoliticalRisk,
                ),
            });
        }
    }

    signals.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.detail.cmp(&b.detail)));
    if !signals.is_empty() {
        info!(count = signals.len(), "early-warning signals raised");
    }
    signals
}

/// Each country's most recent non-missing value of `indicator`.
fn latest_by_country(records: &[RiskRecord], indicator: RiskIndicator) -> BTreeMap<&str, f64> {
    let mut latest: BTreeMap<&str, (chrono::NaiveDate, f64)> = BTreeMap::new();
    for r in records {
        let Some(v) = r.value(indicator) else { continue };
        let entry = latest.entry(r.country.as_str()).or_insert((r.date, v));
        if r.date >= entry.0 {
            *entry = (r.date, v);
        }
    }
    latest.into_iter().map(|(c, (_, v))| (c, v)).collect()
}
