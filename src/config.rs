//! Engine configuration.
//!
//! Every component receives the part of [`EngineConfig`] it needs; there is no
//! global state. Layers, later wins:
//!
//! 1. built-in defaults (`EngineConfig::default()`)
//! 2. an optional TOML file (`--config`)
//! 3. `GEORISK_*` environment variables (`.env` is honoured), nested keys
//!    separated by `__`, e.g. `GEORISK_FORECAST__K_RISK=0.2`
//! 4. CLI flags (applied by `app`)
//!
//! The forecast sensitivity and all warning thresholds are empirical
//! constants carried over as configuration. They have no documented
//! derivation and should not be assumed to generalize to other datasets.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::domain::{DateStrategy, RiskIndicator};
use crate::error::AppError;
use crate::io::parse::DateChain;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sources: SourcesConfig,
    pub volatility: VolatilityConfig,
    pub lag: LagConfig,
    pub forecast: ForecastConfig,
    pub warnings: WarningThresholds,
    pub categories: CategoryConfig,
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            volatility: VolatilityConfig::default(),
            lag: LagConfig::default(),
            forecast: ForecastConfig::default(),
            warnings: WarningThresholds::default(),
            categories: CategoryConfig::default(),
            output_dir: PathBuf::from("results"),
        }
    }
}

/// Where each source lives and how to read it.
///
/// Relative paths are resolved against `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub data_dir: PathBuf,
    /// Field delimiter of the wide per-country risk files.
    pub risk_delimiter: char,
    /// Drop risk rows outside the unified market date range.
    pub clip_risk_to_market_range: bool,
    pub risk: Vec<RiskSourceConfig>,
    pub commodities: Vec<CommoditySourceConfig>,
    pub hardware: Vec<HardwareSourceConfig>,
    pub crypto: Vec<CryptoSourceConfig>,
}

impl SourcesConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let risk = RiskIndicator::ALL
            .iter()
            .map(|&indicator| RiskSourceConfig {
                indicator,
                path: PathBuf::from(format!("bbva/{}_countries.csv", indicator.column())),
            })
            .collect();

        Self {
            data_dir: PathBuf::from("data"),
            risk_delimiter: ';',
            clip_risk_to_market_range: true,
            risk,
            commodities: vec![
                CommoditySourceConfig {
                    column: "brent_price_usd".to_string(),
                    path: PathBuf::from("energy/oil/brent_daily.csv"),
                    skip_rows: 2,
                },
                CommoditySourceConfig {
                    column: "wti_price_usd".to_string(),
                    path: PathBuf::from("energy/oil/wti_daily.csv"),
                    skip_rows: 2,
                },
            ],
            hardware: vec![
                HardwareSourceConfig {
                    kind: HardwareKind::Gpu,
                    path: PathBuf::from("computer/gpu-deals"),
                    aliases: None,
                    date_strategies: Vec::new(),
                },
                HardwareSourceConfig {
                    kind: HardwareKind::Ram,
                    path: PathBuf::from("computer/ram-deals"),
                    aliases: None,
                    date_strategies: Vec::new(),
                },
            ],
            crypto: vec![CryptoSourceConfig {
                column: "btc_price_usd".to_string(),
                path: PathBuf::from("finance/crypto/btc-usd-max.csv"),
                aliases: None,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSourceConfig {
    pub indicator: RiskIndicator,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommoditySourceConfig {
    /// Output column name, e.g. `brent_price_usd`.
    pub column: String,
    pub path: PathBuf,
    /// Header/preamble rows to skip before the data starts.
    #[serde(default)]
    pub skip_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HardwareKind {
    Gpu,
    Ram,
}

/// A hardware listing: a single CSV or a directory of snapshot CSVs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSourceConfig {
    pub kind: HardwareKind,
    pub path: PathBuf,
    #[serde(default)]
    pub aliases: Option<AliasOverrides>,
    /// Order in which listing dates are resolved. Empty means
    /// explicit column, then file-name pattern, then modification time.
    #[serde(default)]
    pub date_strategies: Vec<DateStrategy>,
}

impl HardwareSourceConfig {
    pub fn date_chain(&self) -> DateChain {
        if self.date_strategies.is_empty() {
            DateChain::default()
        } else {
            DateChain::new(self.date_strategies.clone())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoSourceConfig {
    pub column: String,
    pub path: PathBuf,
    #[serde(default)]
    pub aliases: Option<AliasOverrides>,
}

/// Replaces the declared alias list of a column role. Empty lists keep the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasOverrides {
    pub date: Vec<String>,
    pub title: Vec<String>,
    pub price: Vec<String>,
}

/// How gaps in price-like columns are treated before volatility is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Leave gaps as missing.
    Off,
    /// Linear fill of interior gaps only.
    Interior,
    /// Interior linear fill plus constant fill of leading/trailing gaps.
    Extend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Rolling window in observations.
    pub window: usize,
    pub interpolation: InterpolationMode,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            window: 7,
            interpolation: InterpolationMode::Interior,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LagConfig {
    pub step_days: i64,
    pub max_lag_days: i64,
    pub risk_indicators: Vec<RiskIndicator>,
    /// Market columns to correlate against. Empty means every base column.
    pub market_variables: Vec<String>,
}

impl LagConfig {
    /// `0, step, 2*step, ..., max` (inclusive).
    pub fn lags(&self) -> Vec<i64> {
        if self.step_days <= 0 || self.max_lag_days < 0 {
            return vec![0];
        }
        (0..=self.max_lag_days)
            .step_by(self.step_days as usize)
            .collect()
    }
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            step_days: 7,
            max_lag_days: 28,
            risk_indicators: vec![
                RiskIndicator::GeopoliticalRisk,
                RiskIndicator::Conflicts,
                RiskIndicator::BilateralTensions,
            ],
            market_variables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Market column being projected.
    pub target: String,
    /// Indicator whose latest cross-country mean is the risk level.
    pub risk_indicator: RiskIndicator,
    /// Fractional move per unit of risk. Empirical, not fitted.
    pub k_risk: f64,
    /// Multiplier applied to `k_risk` for the stress projection.
    pub stress_multiplier: f64,
    /// Most recent non-missing observations used for the volatility band.
    pub lookback: usize,
    pub horizon_days: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            target: "btc_price_usd".to_string(),
            risk_indicator: RiskIndicator::GeopoliticalRisk,
            k_risk: 0.15,
            stress_multiplier: 2.0,
            lookback: 60,
            horizon_days: 28,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningThresholds {
    /// Trailing calendar days considered for trend rules.
    pub window_days: i64,
    /// Moving-average window in observations.
    pub ma_window: usize,
    /// Observations between the two moving-average values compared.
    pub trend_lookback: usize,
    pub warning_rise: f64,
    /// Rise threshold for conflict indicators (ALERT).
    pub alert_rise: f64,
    pub deescalation_fall: f64,
    /// Per-country level above which a CRITICAL signal fires.
    pub extreme_risk: f64,
    pub indicators: Vec<RiskIndicator>,
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            window_days: 30,
            ma_window: 7,
            trend_lookback: 7,
            warning_rise: 0.3,
            alert_rise: 0.5,
            deescalation_fall: 0.3,
            extreme_risk: 1.0,
            indicators: vec![RiskIndicator::GeopoliticalRisk, RiskIndicator::Conflicts],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Level above which a country counts as high-risk / in active conflict.
    pub high_risk_level: f64,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self { high_risk_level: 0.5 }
    }
}

/// Build the effective configuration from defaults, an optional TOML file and the environment.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, AppError> {
    dotenvy::dotenv().ok();

    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
    if let Some(path) = path {
        if !path.exists() {
            return Err(AppError::new(
                2,
                format!("Config file '{}' does not exist.", path.display()),
            ));
        }
        figment = figment.merge(Toml::file(path));
    }

    let config: EngineConfig = figment
        .merge(Env::prefixed("GEORISK_").split("__"))
        .extract()
        .map_err(|e| AppError::new(2, format!("Invalid configuration: {e}")))?;

    validate(&config)?;
    Ok(config)
}

/// Upper bound for every calendar-day setting (lags, horizons, windows).
pub const MAX_SPAN_DAYS: i64 = 3650;

/// Reject settings that would make a stage meaningless.
pub fn validate(config: &EngineConfig) -> Result<(), AppError> {
    if config.volatility.window < 2 {
        return Err(AppError::new(2, "volatility.window must be >= 2."));
    }
    if config.lag.step_days <= 0 || config.lag.max_lag_days < 0 {
        return Err(AppError::new(
            2,
            "lag.step_days must be > 0 and lag.max_lag_days >= 0.",
        ));
    }
    let spans = [
        ("lag.step_days", config.lag.step_days),
        ("lag.max_lag_days", config.lag.max_lag_days),
        ("forecast.horizon_days", config.forecast.horizon_days),
        ("warnings.window_days", config.warnings.window_days),
    ];
    if let Some((key, value)) = spans
        .iter()
        .find(|(_, v)| !(0..=MAX_SPAN_DAYS).contains(v))
    {
        return Err(AppError::new(
            2,
            format!("{key} = {value} is outside 0..={MAX_SPAN_DAYS} days."),
        ));
    }
    if config.forecast.lookback == 0 || !config.forecast.k_risk.is_finite() {
        return Err(AppError::new(
            2,
            "forecast.lookback must be > 0 and forecast.k_risk finite.",
        ));
    }
    let w = &config.warnings;
    if w.ma_window == 0 || w.trend_lookback == 0 || w.window_days <= 0 {
        return Err(AppError::new(
            2,
            "warnings.ma_window, warnings.trend_lookback and warnings.window_days must be > 0.",
        ));
    }
    let thresholds = [w.warning_rise, w.alert_rise, w.deescalation_fall, w.extreme_risk];
    if thresholds.iter().any(|t| !t.is_finite()) {
        return Err(AppError::new(2, "Warning thresholds must be finite."));
    }
    Ok(())
}
