//! Bounded forecast scenarios and the static stress-scenario catalog.
//!
//! The projection is a deterministic heuristic, not a fitted model:
//!
//! - `base   = current * (1 + risk * k)`
//! - `bull   = base + vol`
//! - `bear   = base - vol`
//! - `stress = current * (1 + risk * k * stress_multiplier)`
//!
//! `k` is an empirical sensitivity taken from configuration. `vol` is the
//! sample standard deviation of the most recent observations of the target,
//! in the target's own units.

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::analysis::lag::aggregate_daily;
use crate::config::ForecastConfig;
use crate::domain::{ForecastScenario, RiskRecord, ScenarioLabel, StressScenario, UnifiedDataset};
use crate::math::sample_std;

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub target: String,
    /// Date of the latest target observation.
    pub as_of: NaiveDate,
    /// Date of the latest risk observation plus the horizon.
    pub forecast_date: NaiveDate,
    pub current_value: f64,
    pub risk_level: f64,
    /// `NaN` when fewer than two recent observations exist.
    pub recent_volatility: f64,
    pub k_risk: f64,
    pub scenarios: [ForecastScenario; 4],
}

impl Forecast {
    pub fn scenario(&self, label: ScenarioLabel) -> Option<f64> {
        self.scenarios
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.projected_value)
    }
}

pub fn project(
    current: f64,
    risk_level: f64,
    volatility: f64,
    k_risk: f64,
    stress_multiplier: f64,
) -> [ForecastScenario; 4] {
    let base = current * (1.0 + risk_level * k_risk);
    let stress = current * (1.0 + risk_level * k_risk * stress_multiplier);
    [
        ForecastScenario {
            label: ScenarioLabel::Base,
            projected_value: base,
        },
        ForecastScenario {
            label: ScenarioLabel::Bull,
            projected_value: base + volatility,
        },
        ForecastScenario {
            label: ScenarioLabel::Bear,
            projected_value: base - volatility,
        },
        ForecastScenario {
            label: ScenarioLabel::Stress,
            projected_value: stress,
        },
    ]
}

/// Project the configured target from the latest cross-country risk level.
///
/// `None` (with a warning) when the target column or the risk indicator has no data.
pub fn forecast(
    dataset: &UnifiedDataset,
    records: &[RiskRecord],
    config: &ForecastConfig,
) -> Option<Forecast> {
    let Some(target) = dataset.series(&config.target).filter(|s| !s.is_empty()) else {
        warn!(target = %config.target, "forecast target has no data, skipping forecast");
        return None;
    };
    let risk = aggregate_daily(records, config.risk_indicator);
    let Some((&risk_date, &risk_level)) = risk.points.last_key_value() else {
        warn!(
            indicator = config.risk_indicator.column(),
            "no risk data, skipping forecast"
        );
        return None;
    };

    let recent: Vec<f64> = target
        .points
        .values()
        .rev()
        .take(config.lookback)
        .rev()
        .copied()
        .collect();
    let (&as_of, &current_value) = target.points.last_key_value()?;
    let recent_volatility = sample_std(&recent);

    let forecast = Forecast {
        target: config.target.clone(),
        as_of,
        forecast_date: risk_date + Duration::days(config.horizon_days),
        current_value,
        risk_level,
        recent_volatility,
        k_risk: config.k_risk,
        scenarios: project(
            current_value,
            risk_level,
            recent_volatility,
            config.k_risk,
            config.stress_multiplier,
        ),
    };
    info!(
        target = %forecast.target,
        current = forecast.current_value,
        risk_level = forecast.risk_level,
        base = forecast.scenarios[0].projected_value,
        "forecast computed"
    );
    Some(forecast)
}

/// Fixed what-if catalog. Probabilities and impact ranges are qualitative judgement.
pub static STRESS_SCENARIOS: [StressScenario; 5] = [
    StressScenario {
        name: "Taiwan Strait Crisis",
        description: "Major escalation in Taiwan-China tensions",
        probability: "15-20%",
        geopolitical_risk_increase: 2.0,
        conflicts_increase: 1.5,
        btc_impact: "+25% to +40%",
        oil_impact: "+15% to +25%",
        gpu_impact: "+50% to +100% (supply shock)",
        mineral_impact: None,
        timeline: "0-2 weeks immediate, 4-8 weeks full impact",
    },
    StressScenario {
        name: "Middle East Conflict Expansion",
        description: "Regional conflict spreads to major oil producers",
        probability: "10-15%",
        geopolitical_risk_increase: 1.5,
        conflicts_increase: 2.0,
        btc_impact: "+15% to +30%",
        oil_impact: "+30% to +60%",
        gpu_impact: "+5% to +15% (indirect)",
        mineral_impact: None,
        timeline: "Immediate oil spike, 2-4 weeks for cascading effects",
    },
    StressScenario {
        name: "Argentina Economic Collapse",
        description: "Political instability + sovereign default",
        probability: "25-30%",
        geopolitical_risk_increase: 0.5,
        conflicts_increase: 0.3,
        btc_impact: "+5% to +10% (regional capital flight)",
        oil_impact: "Neutral to -5%",
        gpu_impact: "Minimal",
        mineral_impact: Some("Lithium supply disruption: +10-20% battery costs"),
        timeline: "1-3 months",
    },
    StressScenario {
        name: "Global De-escalation",
        description: "Major diplomatic breakthroughs reduce tensions",
        probability: "20-25%",
        geopolitical_risk_increase: -1.0,
        conflicts_increase: -0.8,
        btc_impact: "-10% to -20% (risk-off unwind)",
        oil_impact: "-5% to -15%",
        gpu_impact: "-10% to -20% (demand normalization)",
        mineral_impact: None,
        timeline: "2-6 weeks gradual adjustment",
    },
    StressScenario {
        name: "China Rare Earth Export Restrictions",
        description: "Strategic export controls on critical minerals",
        probability: "30-35%",
        geopolitical_risk_increase: 1.2,
        conflicts_increase: 0.5,
        btc_impact: "+10% to +20%",
        oil_impact: "+5% to +10%",
        gpu_impact: "+30% to +50% (severe supply constraints)",
        mineral_impact: Some("Catastrophic for tech manufacturing"),
        timeline: "4-12 weeks to materialize in consumer prices",
    },
];
