//! Shared pipeline logic used by every subcommand.
//!
//! Loaders -> unifier -> volatility, then {lag sweep, forecast, warnings,
//! category views}. Each stage consumes the previous stage's immutable output.
//! Subcommands only differ in how far they go and what they print.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::analysis::{self, CategorySummary, CurrentRiskLevel, Forecast, MineralProducer};
use crate::config::{EngineConfig, VolatilityConfig};
use crate::data::{SourceReport, load_all};
use crate::domain::{CorrelationResult, WarningSignal};
use crate::error::AppError;
use crate::io::export;
use crate::unify::{Unified, unify};

/// Loaded and unified tables, with derived columns applied.
#[derive(Debug, Clone)]
pub struct UnifyOutput {
    pub sources: Vec<SourceReport>,
    pub unified: Unified,
}

/// All computed outputs of a single `georisk run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub sources: Vec<SourceReport>,
    pub unified: Unified,
    pub correlations: Vec<CorrelationResult>,
    pub forecast: Option<Forecast>,
    pub current_risk: Option<CurrentRiskLevel>,
    pub warnings: Vec<WarningSignal>,
    pub categories: Vec<CategorySummary>,
    pub minerals: Vec<MineralProducer>,
}

/// Load every source, unify and derive volatility/returns.
///
/// Fails (exit code 3) only when no source produced any date-bearing data.
pub fn run_unify(config: &EngineConfig) -> Result<UnifyOutput, AppError> {
    let batch = load_all(&config.sources);
    let loaded = batch.reports.iter().filter(|r| r.is_loaded()).count();
    info!(loaded, configured = batch.reports.len(), "sources loaded");

    let mut unified = unify(&batch, config.sources.clip_risk_to_market_range);
    if !unified.has_data() {
        error!("no usable date-bearing data in any source");
        return Err(AppError::new(
            3,
            format!(
                "No usable date-bearing data found in any of the {} configured sources under '{}'.",
                batch.reports.len(),
                config.sources.data_dir.display()
            ),
        ));
    }

    analysis::volatility::apply_derived(&mut unified.market, &config.volatility);

    Ok(UnifyOutput {
        sources: batch.reports,
        unified,
    })
}

/// Run every analysis stage over already-unified tables.
pub fn run_analysis(config: &EngineConfig, input: UnifyOutput) -> RunOutput {
    let UnifyOutput { sources, unified } = input;
    let risk = &unified.risk;

    let correlations = analysis::lag::correlation_table(risk, &unified.market, &config.lag);
    let forecast = analysis::forecast::forecast(&unified.market, risk, &config.forecast);
    let current_risk = analysis::category::current_risk_level(risk, &config.categories);
    let warnings = analysis::warning::detect(risk, &config.warnings);
    let categories = analysis::category::category_summary(risk);
    let minerals = analysis::category::mineral_producers(risk, &config.categories);

    RunOutput {
        sources,
        unified,
        correlations,
        forecast,
        current_risk,
        warnings,
        categories,
        minerals,
    }
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_full(config: &EngineConfig) -> Result<RunOutput, AppError> {
    let unified = run_unify(config)?;
    Ok(run_analysis(config, unified))
}

fn prepare_dir(dir: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        AppError::new(
            4,
            format!("Failed to create output directory '{}': {e}", dir.display()),
        )
    })
}

/// Write the unified market table, the per-country risk table, the source
/// report and the interpolation notes.
pub fn write_unify_outputs(
    dir: &Path,
    output: &UnifyOutput,
    volatility: &VolatilityConfig,
) -> Result<Vec<PathBuf>, AppError> {
    prepare_dir(dir)?;
    write_base_tables(dir, &output.unified, &output.sources, volatility)
}

fn write_base_tables(
    dir: &Path,
    unified: &Unified,
    sources: &[SourceReport],
    volatility: &VolatilityConfig,
) -> Result<Vec<PathBuf>, AppError> {
    let unified_path = dir.join(export::UNIFIED_FILE);
    export::write_unified(&unified_path, &unified.market)?;
    let risk_path = dir.join(export::RISK_FILE);
    export::write_risk_table(&risk_path, &unified.risk)?;
    let report_path = dir.join(export::SOURCE_REPORT_FILE);
    export::write_source_report(&report_path, sources)?;
    let notes_path = dir.join(export::INTERPOLATION_FILE);
    export::write_interpolation_notes(&notes_path, &unified.market, volatility)?;
    Ok(vec![unified_path, risk_path, report_path, notes_path])
}

/// Write every output table of a full run.
pub fn write_outputs(
    dir: &Path,
    run: &RunOutput,
    volatility: &VolatilityConfig,
) -> Result<Vec<PathBuf>, AppError> {
    prepare_dir(dir)?;
    let mut written = write_base_tables(dir, &run.unified, &run.sources, volatility)?;

    let path = dir.join(export::CORRELATION_FILE);
    export::write_correlations(&path, &run.correlations)?;
    written.push(path);

    let path = dir.join(export::FORECAST_FILE);
    export::write_forecast(&path, run.forecast.as_ref(), run.current_risk.as_ref())?;
    written.push(path);

    let path = dir.join(export::STRESS_FILE);
    export::write_stress_scenarios(&path, &analysis::STRESS_SCENARIOS)?;
    written.push(path);

    let path = dir.join(export::WARNING_FILE);
    export::write_warnings(&path, &run.warnings)?;
    written.push(path);

    let path = dir.join(export::CATEGORY_FILE);
    export::write_category_summary(&path, &run.categories)?;
    written.push(path);

    let path = dir.join(export::MINERAL_FILE);
    export::write_mineral_producers(&path, &run.minerals)?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "wrote output tables");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    /// A small data directory in the default layout: one risk file, one commodity, one crypto.
    fn fixture(root: &Path) -> EngineConfig {
        let data = root.join("data");
        let mut risk = String::from("Date;Ukraine;Chile\n");
        let mut btc = String::from("snapped_at,price,market_cap,total_volume\n");
        let mut brent = String::from("Back to Home\nSourcekey,RBRTE\nDate,Brent\n");
        for day in 1..=31u32 {
            let r = 0.5 + 0.03 * day as f64;
            risk.push_str(&format!("2025-01-{day:02};{r};{}\n", 0.1 * (day % 3) as f64));
            btc.push_str(&format!(
                "2025-01-{day:02} 00:00:00 UTC,{},1,1\n",
                90000.0 + 150.0 * day as f64 + 40.0 * (day % 4) as f64
            ));
            if day % 7 != 0 {
                brent.push_str(&format!("2025-01-{day:02},{}\n", 75.0 + (day % 5) as f64));
            }
        }
        write(&data.join("bbva/geopolitical_risk_countries.csv"), &risk);
        write(&data.join("finance/crypto/btc-usd-max.csv"), &btc);
        write(&data.join("energy/oil/brent_daily.csv"), &brent);

        let mut config = EngineConfig::default();
        config.sources.data_dir = data;
        config.output_dir = root.join("results");
        config
    }

    #[test]
    fn no_sources_is_fatal_with_exit_code_3() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.sources.data_dir = dir.path().to_path_buf();
        let err = run_unify(&config).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn full_run_degrades_and_writes_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());

        let run = run_full(&config).unwrap();
        assert_eq!(run.unified.market.row_count(), 31);
        assert!(run.unified.market.column("btc_volatility_7d").is_some());
        assert!(run.unified.market.column("wti_price_usd").is_none());
        // Missing sources are reported, not fatal.
        assert!(run.sources.iter().any(|r| r.status() == "missing_source"));

        // Only geopolitical_risk has data: 1 indicator x 2 markets x 5 lags.
        assert_eq!(run.correlations.len(), 10);
        let forecast = run.forecast.as_ref().unwrap();
        assert_eq!(forecast.target, "btc_price_usd");
        // Ukraine ends above the extreme-risk threshold.
        assert!(
            run.warnings
                .iter()
                .any(|w| w.severity == crate::domain::Severity::Critical)
        );

        let written = write_outputs(&config.output_dir, &run, &config.volatility).unwrap();
        assert_eq!(written.len(), 10);
        assert!(written.iter().all(|p| p.exists()));

        // Brent skips every 7th day; those interior gaps are filled for volatility only.
        let notes =
            std::fs::read_to_string(config.output_dir.join(export::INTERPOLATION_FILE)).unwrap();
        assert_eq!(
            notes,
            "column,filled_cells,mode,derived_column\n\
             brent_price_usd,4,interior,brent_volatility_7d\n"
        );
    }

    #[test]
    fn rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());

        let first = run_full(&config).unwrap();
        let out_a = dir.path().join("a");
        let files_a = write_outputs(&out_a, &first, &config.volatility).unwrap();

        let second = run_full(&config).unwrap();
        let out_b = dir.path().join("b");
        let files_b = write_outputs(&out_b, &second, &config.volatility).unwrap();

        for (a, b) in files_a.iter().zip(&files_b) {
            assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap(), "{}", a.display());
        }
    }
}
