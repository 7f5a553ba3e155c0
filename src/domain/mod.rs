//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - risk indicators and country category tags (`RiskIndicator`, `CategoryTag`)
//! - the loader/unifier outputs (`RiskRecord`, `MarketSeries`, `UnifiedDataset`)
//! - analysis outputs (`CorrelationResult`, `ForecastScenario`, `WarningSignal`, ...)

pub mod categories;
pub mod types;

pub use categories::tags_for;
pub use types::*;
