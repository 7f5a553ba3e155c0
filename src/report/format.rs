//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the analysis code stays clean and testable
//! - output changes are localized

use crate::analysis::{CurrentRiskLevel, Forecast};
use crate::app::pipeline::RunOutput;
use crate::config::EngineConfig;
use crate::domain::{CorrelationResult, StressScenario};
use crate::report::{Rankings, rank_correlations};

/// Format the full run summary: sources, dataset shape, strongest correlations,
/// forecast, current risk level and active warnings.
pub fn format_run_summary(run: &RunOutput, config: &EngineConfig) -> String {
    let mut out = String::new();

    out.push_str("=== georisk - Geopolitical Risk / Market Lag Analysis ===\n");

    let loaded = run.sources.iter().filter(|r| r.is_loaded()).count();
    out.push_str(&format!(
        "Sources: {loaded} loaded, {} dropped\n",
        run.sources.len() - loaded
    ));
    for r in run.sources.iter().filter(|r| !r.is_loaded()) {
        out.push_str(&format!("  (dropped {}) {}\n", r.source_name, r.status()));
    }

    let market = &run.unified.market;
    match market.date_range() {
        Some((start, end)) => out.push_str(&format!(
            "Market table: {} rows x {} columns | {start} .. {end}\n",
            market.row_count(),
            market.columns.len(),
        )),
        None => out.push_str("Market table: empty\n"),
    }
    out.push_str(&format!("Risk table: {} country-days\n", run.unified.risk.len()));
    for (column, filled) in &market.interpolated {
        out.push_str(&format!(
            "  note: {filled} gap(s) in {column} interpolated ({:?}) before volatility\n",
            config.volatility.interpolation
        ));
    }

    let lags = config.lag.lags();
    let mut shown = vec![lags.first().copied().unwrap_or(0)];
    if let Some(&last) = lags.last() {
        if !shown.contains(&last) {
            shown.push(last);
        }
    }
    for lag in shown {
        let rankings = rank_correlations(&run.correlations, lag, 5);
        out.push('\n');
        out.push_str(&format_rankings(&rankings));
    }

    out.push('\n');
    out.push_str(&format_forecast(run.forecast.as_ref(), run.current_risk.as_ref()));

    out.push_str("\nEarly-warning signals:\n");
    if run.warnings.is_empty() {
        out.push_str("  none\n");
    }
    for w in &run.warnings {
        out.push_str(&format!(
            "  [{:<8}] {} -> {}\n",
            w.severity.as_str(),
            w.detail,
            w.recommended_action
        ));
    }

    out
}

/// Strongest positive / negative correlations at one lag.
pub fn format_rankings(rankings: &Rankings) -> String {
    let mut out = String::new();
    out.push_str(&format!("Strongest correlations at lag {}d:\n", rankings.lag_days));
    if rankings.is_empty() {
        out.push_str("  (no defined correlations)\n");
        return out;
    }
    let rows: Vec<CorrelationResult> = rankings
        .positive
        .iter()
        .chain(&rankings.negative)
        .cloned()
        .collect();
    out.push_str(&format_correlations(&rows));
    out
}

/// Correlation rows as an aligned table.
pub fn format_correlations(rows: &[CorrelationResult]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<28} {:<24} {:>5} {:>8} {:>7}",
            "risk_indicator", "market_variable", "lag", "corr", "pairs"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!("{:-<28} {:-<24} {:-<5} {:-<8} {:-<7}\n", "", "", "", "", ""));

    for r in rows {
        let corr = if r.is_defined() {
            format!("{:>8.3}", r.correlation)
        } else {
            format!("{:>8}", "NaN")
        };
        out.push_str(
            format!(
                "{:<28} {:<24} {:>5} {corr} {:>7}",
                truncate(r.risk_indicator.column(), 28),
                truncate(&r.market_variable, 24),
                r.lag_days,
                r.n_pairs,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn format_forecast(forecast: Option<&Forecast>, current: Option<&CurrentRiskLevel>) -> String {
    let mut out = String::new();
    if let Some(c) = current {
        out.push_str(&format!("Current risk level ({}):\n", c.date));
        out.push_str(&format!(
            "  avg geopolitical risk {:.3} | avg conflicts {:.3} | high-risk countries {} | active conflicts {}\n",
            c.avg_geopolitical_risk, c.avg_conflicts, c.high_risk_countries, c.active_conflicts
        ));
    }

    let Some(f) = forecast else {
        out.push_str("Forecast: not available (missing target or risk data)\n");
        return out;
    };
    out.push_str(&format!(
        "Forecast for {} by {} (heuristic, k_risk={} is empirical, not fitted):\n",
        f.target, f.forecast_date, f.k_risk
    ));
    out.push_str(&format!(
        "  current {:.2} on {} | risk level {:.3} | recent volatility {:.2}\n",
        f.current_value, f.as_of, f.risk_level, f.recent_volatility
    ));
    for s in &f.scenarios {
        let change = (s.projected_value / f.current_value - 1.0) * 100.0;
        out.push_str(&format!(
            "  {:<7} {:>14.2} ({change:+.1}%)\n",
            s.label.as_str(),
            s.projected_value
        ));
    }
    out
}

/// The static stress-scenario catalog.
pub fn format_scenarios(scenarios: &[StressScenario]) -> String {
    let mut out = String::new();
    out.push_str("Stress scenarios (qualitative, not computed):\n");
    for s in scenarios {
        out.push_str(&format!("\n{} [{}]\n", s.name, s.probability));
        out.push_str(&format!("  {}\n", s.description));
        out.push_str(&format!(
            "  risk {:+.1} | conflicts {:+.1}\n",
            s.geopolitical_risk_increase, s.conflicts_increase
        ));
        out.push_str(&format!("  BTC: {}\n  Oil: {}\n  GPU: {}\n", s.btc_impact, s.oil_impact, s.gpu_impact));
        if let Some(m) = s.mineral_impact {
            out.push_str(&format!("  Minerals: {m}\n"));
        }
        out.push_str(&format!("  Timeline: {}\n", s.timeline));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::STRESS_SCENARIOS;
    use crate::domain::RiskIndicator;

    #[test]
    fn correlation_table_marks_undefined() {
        let rows = vec![
            CorrelationResult {
                risk_indicator: RiskIndicator::GeopoliticalRisk,
                market_variable: "btc_price_usd".to_string(),
                lag_days: 28,
                correlation: 0.81234,
                n_pairs: 120,
            },
            CorrelationResult {
                risk_indicator: RiskIndicator::Conflicts,
                market_variable: "gpu_high_median".to_string(),
                lag_days: 28,
                correlation: f64::NAN,
                n_pairs: 1,
            },
        ];
        let text = format_correlations(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("0.812"));
        assert!(lines[3].contains("NaN"));
    }

    #[test]
    fn scenario_listing_includes_mineral_impact_when_present() {
        let text = format_scenarios(&STRESS_SCENARIOS);
        assert!(text.contains("Taiwan Strait Crisis [15-20%]"));
        assert_eq!(text.matches("Minerals:").count(), 2);
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("economic_policy_uncertainty", 10), "economic_.");
    }
}
