//! Source loaders.
//!
//! Each loader reads one external table and normalizes it to a date-keyed
//! shape. A loader failure is a [`SourceError`]; it is logged, recorded in the
//! [`SourceReport`] and the run continues with whatever else loaded.
//!
//! Loaders have no data dependency on each other, so they run in parallel
//! (rayon). Results are collected in declared order to keep runs deterministic.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::SourcesConfig;
use crate::domain::{DateStrategy, MarketSeries};
use crate::error::SourceError;
use crate::io::table::RawTable;

pub mod commodity;
pub mod crypto;
pub mod hardware;
pub mod risk;

pub use risk::IndicatorTable;

/// Row accounting for one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStats {
    pub files: usize,
    pub rows_read: usize,
    pub rows_used: usize,
    /// Cells that were present but could not be parsed (now missing values).
    pub unparsable_cells: usize,
    /// Records the CSV reader rejected outright.
    pub rejected_rows: usize,
    /// Cells decoded with replacement characters.
    pub lossy_cells: usize,
    pub date_strategies: BTreeMap<DateStrategy, usize>,
}

impl LoadStats {
    /// Fresh accounting for one file, carrying the reader's own counts.
    pub fn for_table(table: &RawTable) -> Self {
        Self {
            files: 1,
            rejected_rows: table.rejected_rows,
            lossy_cells: table.lossy_cells,
            ..Self::default()
        }
    }

    pub fn record_date(&mut self, strategy: DateStrategy) {
        *self.date_strategies.entry(strategy).or_default() += 1;
    }

    pub fn absorb(&mut self, other: LoadStats) {
        self.files += other.files;
        self.rows_read += other.rows_read;
        self.rows_used += other.rows_used;
        self.unparsable_cells += other.unparsable_cells;
        self.rejected_rows += other.rejected_rows;
        self.lossy_cells += other.lossy_cells;
        for (strategy, n) in other.date_strategies {
            *self.date_strategies.entry(strategy).or_default() += n;
        }
    }

    /// `explicit_column=12;file_modified=1`
    pub fn strategy_summary(&self) -> String {
        self.date_strategies
            .iter()
            .map(|(s, n)| format!("{}={n}", s.as_str()))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// A successful load: the normalized value plus its row accounting.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub stats: LoadStats,
}

/// Audit record for one configured source.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source_name: String,
    pub path: PathBuf,
    pub error: Option<SourceError>,
    pub columns: Vec<String>,
    pub stats: LoadStats,
}

impl SourceReport {
    pub fn status(&self) -> &'static str {
        match &self.error {
            None => "loaded",
            Some(e) => e.kind(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything the loaders produced for one run.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub risk: Vec<IndicatorTable>,
    pub market: Vec<MarketSeries>,
    pub reports: Vec<SourceReport>,
}

/// Run every configured loader.
pub fn load_all(config: &SourcesConfig) -> SourceBatch {
    let (risk, market) = rayon::join(|| load_risk_family(config), || load_market_family(config));

    let mut batch = SourceBatch::default();
    for (table, report) in risk {
        if let Some(table) = table {
            batch.risk.push(table);
        }
        batch.reports.push(report);
    }
    for (series, report) in market {
        batch.market.extend(series);
        batch.reports.push(report);
    }
    batch
}

fn load_risk_family(config: &SourcesConfig) -> Vec<(Option<IndicatorTable>, SourceReport)> {
    config
        .risk
        .par_iter()
        .map(|source| {
            let path = config.resolve(&source.path);
            let name = source.indicator.column().to_string();
            let result = risk::load_indicator(&name, &path, source.indicator, config.risk_delimiter);
            match result {
                Ok(loaded) => {
                    let report = loaded_report(&name, path, vec![name.clone()], loaded.stats);
                    (Some(loaded.value), report)
                }
                Err(err) => (None, failed_report(&name, path, err)),
            }
        })
        .collect()
}

type MarketLoad = (Vec<MarketSeries>, SourceReport);

fn load_market_family(config: &SourcesConfig) -> Vec<MarketLoad> {
    let commodities = config.commodities.par_iter().map(|source| {
        let path = config.resolve(&source.path);
        let name = source.column.clone();
        finish_market(&name, path.clone(), commodity::load_commodity(&name, &path, source.skip_rows).map(one))
    });

    let hardware = config.hardware.par_iter().map(|source| {
        let path = config.resolve(&source.path);
        let name = format!("{:?}", source.kind).to_lowercase();
        finish_market(
            &name,
            path.clone(),
            hardware::load_hardware(
                &name,
                &path,
                source.kind,
                source.aliases.as_ref(),
                &source.date_chain(),
            ),
        )
    });

    let crypto = config.crypto.par_iter().map(|source| {
        let path = config.resolve(&source.path);
        let name = source.column.clone();
        finish_market(
            &name,
            path.clone(),
            crypto::load_crypto(&name, &path, source.aliases.as_ref()).map(one),
        )
    });

    // `chain` on indexed parallel iterators preserves declared order in `collect`.
    commodities.chain(hardware).chain(crypto).collect()
}

fn one(loaded: Loaded<MarketSeries>) -> Loaded<Vec<MarketSeries>> {
    Loaded {
        value: vec![loaded.value],
        stats: loaded.stats,
    }
}

fn finish_market(
    name: &str,
    path: PathBuf,
    result: Result<Loaded<Vec<MarketSeries>>, SourceError>,
) -> MarketLoad {
    match result {
        Ok(loaded) => {
            let columns = loaded.value.iter().map(|s| s.name.clone()).collect();
            let report = loaded_report(name, path, columns, loaded.stats);
            (loaded.value, report)
        }
        Err(err) => (Vec::new(), failed_report(name, path, err)),
    }
}

fn loaded_report(name: &str, path: PathBuf, columns: Vec<String>, stats: LoadStats) -> SourceReport {
    info!(
        source = name,
        rows_used = stats.rows_used,
        rows_read = stats.rows_read,
        unparsable = stats.unparsable_cells,
        rejected = stats.rejected_rows,
        dates = %stats.strategy_summary(),
        "loaded source"
    );
    SourceReport {
        source_name: name.to_string(),
        path,
        error: None,
        columns,
        stats,
    }
}

fn failed_report(name: &str, path: PathBuf, err: SourceError) -> SourceReport {
    warn!(source = name, status = err.kind(), "dropping source: {err}");
    SourceReport {
        source_name: name.to_string(),
        path,
        error: Some(err),
        columns: Vec::new(),
        stats: LoadStats::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommoditySourceConfig, SourcesConfig};
    use std::io::Write;

    #[test]
    fn missing_sources_degrade_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("brent.csv")).unwrap();
        writeln!(f, "Back to Home").unwrap();
        writeln!(f, "Sourcekey,RBRTE").unwrap();
        writeln!(f, "Date,Brent").unwrap();
        writeln!(f, "2025-01-02,75.5").unwrap();
        writeln!(f, "2025-01-03,76.0").unwrap();
        drop(f);

        let config = SourcesConfig {
            data_dir: dir.path().to_path_buf(),
            commodities: vec![CommoditySourceConfig {
                column: "brent_price_usd".to_string(),
                path: PathBuf::from("brent.csv"),
                skip_rows: 2,
            }],
            ..SourcesConfig::default()
        };

        let batch = load_all(&config);
        assert_eq!(batch.market.len(), 1);
        assert_eq!(batch.market[0].name, "brent_price_usd");
        assert!(batch.risk.is_empty());

        let loaded: Vec<_> = batch.reports.iter().filter(|r| r.is_loaded()).collect();
        assert_eq!(loaded.len(), 1);
        assert!(
            batch
                .reports
                .iter()
                .filter(|r| !r.is_loaded())
                .all(|r| r.status() == "missing_source")
        );
    }
}
