//! Category-level risk views over the per-country table.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::lag::aggregate_daily;
use crate::config::CategoryConfig;
use crate::domain::{CategoryTag, RiskIndicator, RiskRecord};
use crate::math::{mean, sample_std};

/// Mean / sample std / max of one indicator's daily category means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
}

impl SeriesStats {
    fn of(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            std: sample_std(values),
            max: values.iter().copied().fold(f64::NAN, f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: CategoryTag,
    pub countries: usize,
    pub geopolitical_risk: SeriesStats,
    pub conflicts: SeriesStats,
}

/// One row per category that has at least one tagged country in `records`.
pub fn category_summary(records: &[RiskRecord]) -> Vec<CategorySummary> {
    CategoryTag::ALL
        .iter()
        .filter_map(|&tag| {
            let tagged: Vec<RiskRecord> = records.iter().filter(|r| r.has_tag(tag)).cloned().collect();
            if tagged.is_empty() {
                return None;
            }
            let mut countries: Vec<&str> = tagged.iter().map(|r| r.country.as_str()).collect();
            countries.sort_unstable();
            countries.dedup();

            let daily = |indicator| -> Vec<f64> {
                aggregate_daily(&tagged, indicator).points.into_values().collect()
            };
            Some(CategorySummary {
                category: tag,
                countries: countries.len(),
                geopolitical_risk: SeriesStats::of(&daily(RiskIndicator::GeopoliticalRisk)),
                conflicts: SeriesStats::of(&daily(RiskIndicator::Conflicts)),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn classify(risk: f64, high_risk_level: f64) -> Self {
        if risk > high_risk_level {
            RiskLevel::High
        } else if risk > 0.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MineralProducer {
    pub country: String,
    pub geopolitical_risk: f64,
    pub conflicts: f64,
    pub level: RiskLevel,
}

/// Strategic-mineral producers ranked by mean geopolitical risk, highest first.
pub fn mineral_producers(records: &[RiskRecord], config: &CategoryConfig) -> Vec<MineralProducer> {
    let mut by_country: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for r in records.iter().filter(|r| r.has_tag(CategoryTag::StrategicMinerals)) {
        let entry = by_country.entry(r.country.as_str()).or_default();
        if let Some(v) = r.value(RiskIndicator::GeopoliticalRisk) {
            entry.0.push(v);
        }
        if let Some(v) = r.value(RiskIndicator::Conflicts) {
            entry.1.push(v);
        }
    }

    let mut producers: Vec<MineralProducer> = by_country
        .into_iter()
        .map(|(country, (risk, conflicts))| {
            let geopolitical_risk = mean(&risk);
            MineralProducer {
                country: country.to_string(),
                geopolitical_risk,
                conflicts: mean(&conflicts),
                level: RiskLevel::classify(geopolitical_risk, config.high_risk_level),
            }
        })
        .collect();
    // NaN (no risk values) sorts last; ties keep country order.
    producers.sort_by(|a, b| {
        a.geopolitical_risk
            .is_nan()
            .cmp(&b.geopolitical_risk.is_nan())
            .then(b.geopolitical_risk.total_cmp(&a.geopolitical_risk))
    });
    producers
}

/// Snapshot of the latest risk date across all countries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentRiskLevel {
    pub date: NaiveDate,
    pub avg_geopolitical_risk: f64,
    pub avg_conflicts: f64,
    pub high_risk_countries: usize,
    pub active_conflicts: usize,
}

pub fn current_risk_level(records: &[RiskRecord], config: &CategoryConfig) -> Option<CurrentRiskLevel> {
    let date = records.iter().map(|r| r.date).max()?;
    let latest: Vec<&RiskRecord> = records.iter().filter(|r| r.date == date).collect();

    let values = |indicator: RiskIndicator| -> Vec<f64> {
        latest.iter().filter_map(|r| r.value(indicator)).collect()
    };
    let risk = values(RiskIndicator::GeopoliticalRisk);
    let conflicts = values(RiskIndicator::Conflicts);

    Some(CurrentRiskLevel {
        date,
        avg_geopolitical_risk: mean(&risk),
        avg_conflicts: mean(&conflicts),
        high_risk_countries: risk.iter().filter(|v| **v > config.high_risk_level).count(),
        active_conflicts: conflicts.iter().filter(|v| **v > config.high_risk_level).count(),
    })
}
