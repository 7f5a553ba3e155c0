//! Analytics over the unified tables.
//!
//! - derived volatility / returns columns (`volatility`)
//! - risk-leads-market correlation sweep (`lag`)
//! - bounded forecast + stress catalog (`forecast`)
//! - threshold early-warning rules (`warning`)
//! - category summaries (`category`)

pub mod category;
pub mod forecast;
pub mod lag;
pub mod volatility;
pub mod warning;

pub use category::{CategorySummary, CurrentRiskLevel, MineralProducer, RiskLevel};
pub use forecast::{Forecast, STRESS_SCENARIOS};
