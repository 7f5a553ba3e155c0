//! Hardware listing snapshots (GPU / RAM deals).
//!
//! A source is a single CSV or a directory of snapshot CSVs. Each listing is
//! bucketed from its title (GPU tier, RAM class) and the loader emits one
//! series per bucket holding the median listing price per date.
//!
//! Listing dates come from the [`DateChain`]: an explicit date column when the
//! file has one, else a `YYYY-MM-DD` embedded in the file name, else the
//! file's modification date.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::{AliasOverrides, HardwareKind};
use crate::data::{LoadStats, Loaded};
use crate::domain::MarketSeries;
use crate::error::SourceError;
use crate::io::parse::{DateChain, FileDates, parse_price};
use crate::io::table::{ColumnRole, cell, read_table};
use crate::math::median;

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static RAM_CLASSES: LazyLock<Vec<(RamClass, Regex)>> = LazyLock::new(|| {
    [
        (RamClass::Gb16, r"(?i)16\s?gb"),
        (RamClass::Gb32, r"(?i)32\s?gb"),
        (RamClass::Ddr4, r"(?i)ddr4"),
        (RamClass::Ddr5, r"(?i)ddr5"),
    ]
    .into_iter()
    .map(|(class, pattern)| (class, Regex::new(pattern).expect("valid regex")))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GpuTier {
    High,
    Mid,
    Low,
}

impl GpuTier {
    pub fn column(self) -> &'static str {
        match self {
            GpuTier::High => "gpu_high_median",
            GpuTier::Mid => "gpu_mid_median",
            GpuTier::Low => "gpu_low_median",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RamClass {
    Gb16,
    Gb32,
    Ddr4,
    Ddr5,
}

impl RamClass {
    pub fn column(self) -> &'static str {
        match self {
            RamClass::Gb16 => "ram_16gb_median",
            RamClass::Gb32 => "ram_32gb_median",
            RamClass::Ddr4 => "ram_ddr4_median",
            RamClass::Ddr5 => "ram_ddr5_median",
        }
    }
}

/// Tier from the 2-4 digit numeric tokens of a product title.
///
/// A token containing `80`/`90` is high, `60`/`70` mid, `50` low; higher
/// tiers win when several tokens match. No token means no tier.
pub fn classify_tier(title: &str) -> Option<GpuTier> {
    let tokens: Vec<&str> = NUMERIC_TOKEN
        .find_iter(title)
        .map(|m| m.as_str())
        .filter(|t| (2..=4).contains(&t.len()))
        .collect();

    let any = |needles: &[&str]| tokens.iter().any(|t| needles.iter().any(|n| t.contains(n)));
    if any(&["80", "90"]) {
        Some(GpuTier::High)
    } else if any(&["60", "70"]) {
        Some(GpuTier::Mid)
    } else if any(&["50"]) {
        Some(GpuTier::Low)
    } else {
        None
    }
}

/// Every RAM class a title mentions. Classes overlap: `"32GB DDR5"` is both.
pub fn classify_ram(title: &str) -> Vec<RamClass> {
    RAM_CLASSES
        .iter()
        .filter(|(_, re)| re.is_match(title))
        .map(|(class, _)| *class)
        .collect()
}

fn buckets(kind: HardwareKind, title: &str) -> Vec<&'static str> {
    match kind {
        HardwareKind::Gpu => classify_tier(title).map(GpuTier::column).into_iter().collect(),
        HardwareKind::Ram => classify_ram(title).into_iter().map(RamClass::column).collect(),
    }
}

pub fn price_role() -> ColumnRole {
    ColumnRole::new("price", &["price", "amount", "precio", "price_usd", "sale_price"])
}

pub fn title_role() -> ColumnRole {
    ColumnRole::new("title", &["title", "name", "model", "product"])
}

pub fn date_role() -> ColumnRole {
    ColumnRole::new("date", &["date", "posted", "created", "snapshot_date", "scraped_at"])
}

/// Prices per `(bucket column, date)`, before the median.
type Observations = BTreeMap<(&'static str, NaiveDate), Vec<f64>>;

pub fn load_hardware(
    source_name: &str,
    path: &Path,
    kind: HardwareKind,
    aliases: Option<&AliasOverrides>,
    chain: &DateChain,
) -> Result<Loaded<Vec<MarketSeries>>, SourceError> {
    let files = snapshot_files(source_name, path)?;

    let mut stats = LoadStats::default();
    let mut observations = Observations::new();
    let mut first_error = None;

    for file in &files {
        match load_snapshot(source_name, file, kind, aliases, chain, &mut observations) {
            Ok(file_stats) => stats.absorb(file_stats),
            Err(err) => {
                warn!(source = source_name, file = %file.display(), "skipping snapshot: {err}");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if stats.files == 0 {
        return Err(first_error.unwrap_or_else(|| SourceError::Empty {
            source_name: source_name.to_string(),
        }));
    }

    let mut series: BTreeMap<&'static str, MarketSeries> = BTreeMap::new();
    for ((column, date), prices) in observations {
        if let Some(m) = median(&prices) {
            series
                .entry(column)
                .or_insert_with(|| MarketSeries::new(column))
                .insert(date, m);
        }
    }

    // Stable output order: bucket declaration order, not alphabetical.
    let order: Vec<&'static str> = match kind {
        HardwareKind::Gpu => [GpuTier::High, GpuTier::Mid, GpuTier::Low]
            .map(GpuTier::column)
            .to_vec(),
        HardwareKind::Ram => [RamClass::Gb16, RamClass::Gb32, RamClass::Ddr4, RamClass::Ddr5]
            .map(RamClass::column)
            .to_vec(),
    };
    let value: Vec<MarketSeries> = order
        .into_iter()
        .filter_map(|column| series.remove(column))
        .collect();

    if value.is_empty() {
        return Err(SourceError::Empty {
            source_name: source_name.to_string(),
        });
    }
    Ok(Loaded { value, stats })
}

/// The CSV files making up a source, sorted by name.
fn snapshot_files(source_name: &str, path: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if !path.exists() {
        return Err(SourceError::MissingSource {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
        });
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path).map_err(|e| SourceError::Read {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn load_snapshot(
    source_name: &str,
    file: &Path,
    kind: HardwareKind,
    aliases: Option<&AliasOverrides>,
    chain: &DateChain,
    observations: &mut Observations,
) -> Result<LoadStats, SourceError> {
    let table = read_table(source_name, file, b',', 0)?;

    let (price_role, title_role, date_role) = match aliases {
        Some(a) => (
            price_role().with_override(&a.price),
            title_role().with_override(&a.title),
            date_role().with_override(&a.date),
        ),
        None => (price_role(), title_role(), date_role()),
    };
    let price_col = table.resolve(&price_role)?;
    let title_col = table.find(&title_role).unwrap_or(0);
    let date_col = table.find(&date_role);
    let file_dates = FileDates::for_file(file, date_col.is_some());

    let mut stats = LoadStats::for_table(&table);

    for record in &table.rows {
        stats.rows_read += 1;
        let date_cell = date_col.and_then(|idx| cell(record, idx));
        let Some((date, strategy)) = chain.resolve(&file_dates, date_cell) else {
            stats.unparsable_cells += 1;
            continue;
        };
        let Some(price) = cell(record, price_col).and_then(parse_price) else {
            stats.unparsable_cells += 1;
            continue;
        };
        let title = cell(record, title_col).unwrap_or_default();
        let columns = buckets(kind, title);
        if columns.is_empty() {
            continue;
        }
        for column in columns {
            observations.entry((column, date)).or_default().push(price);
        }
        stats.record_date(strategy);
        stats.rows_used += 1;
    }

    debug!(
        source = source_name,
        file = %file.display(),
        rows_used = stats.rows_used,
        "read hardware snapshot"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DateStrategy;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn tier_from_numeric_token() {
        assert_eq!(classify_tier("RTX 3080 16GB"), Some(GpuTier::High));
        assert_eq!(classify_tier("RTX 3060"), Some(GpuTier::Mid));
        assert_eq!(classify_tier("RX 7900 XT"), Some(GpuTier::High));
        assert_eq!(classify_tier("GTX 1050 Ti"), Some(GpuTier::Low));
        assert_eq!(classify_tier("Generic graphics card"), None);
        // Single digits are not tokens.
        assert_eq!(classify_tier("GPU 8 GB"), None);
    }

    #[test]
    fn ram_classes_overlap() {
        assert_eq!(
            classify_ram("Corsair Vengeance 32 GB DDR5-6000"),
            vec![RamClass::Gb32, RamClass::Ddr5]
        );
        assert_eq!(classify_ram("16GB DDR4 3200"), vec![RamClass::Gb16, RamClass::Ddr4]);
        assert!(classify_ram("SSD 1TB").is_empty());
    }

    #[test]
    fn single_file_with_date_column_gives_tier_medians() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "gpu.csv",
            "title,price,date\n\
             RTX 3080 10GB,$700,2025-01-01\n\
             RTX 4090,\"$1,900\",2025-01-01\n\
             RTX 3080 Ti,$800,2025-01-01\n\
             RTX 3060,$300,2025-01-01\n\
             Mystery card,$50,2025-01-01\n\
             RTX 3060,$320,2025-01-02\n",
        );

        let loaded = load_hardware(
            "gpu",
            &path,
            HardwareKind::Gpu,
            None,
            &DateChain::default(),
        )
        .unwrap();
        let names: Vec<_> = loaded.value.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["gpu_high_median", "gpu_mid_median"]);

        let high = &loaded.value[0];
        assert_eq!(high.get(d(2025, 1, 1)), Some(800.0));
        let mid = &loaded.value[1];
        assert_eq!(mid.get(d(2025, 1, 2)), Some(320.0));
        assert_eq!(loaded.stats.rows_used, 5);
        assert_eq!(
            loaded.stats.date_strategies.get(&DateStrategy::ExplicitColumn),
            Some(&5)
        );
    }

    #[test]
    fn non_utf8_title_keeps_its_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpu.csv");
        std::fs::write(
            &path,
            b"title,price,date\nRTX 3080 10GB,700,2025-01-01\nRTX 3080 Se\xf1or,900,2025-01-01\n",
        )
        .unwrap();

        let loaded = load_hardware(
            "gpu",
            &path,
            HardwareKind::Gpu,
            None,
            &DateChain::default(),
        )
        .unwrap();
        assert_eq!(loaded.stats.rows_read, 2);
        assert_eq!(loaded.stats.rows_used, 2);
        assert_eq!(loaded.stats.lossy_cells, 1);
        assert_eq!(loaded.stats.rejected_rows, 0);
        assert_eq!(loaded.value[0].name, "gpu_high_median");
        assert_eq!(loaded.value[0].get(d(2025, 1, 1)), Some(800.0));
    }

    #[test]
    fn snapshot_directory_dates_rows_from_file_names() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "ram-deals-2025-11-03.csv",
            "product,price\n16GB DDR4 Kit,40\n16GB DDR4 Kit,60\n",
        );
        write(
            dir.path(),
            "ram-deals-2025-11-04.csv",
            "product,price\n32GB DDR5 Kit,120\n",
        );
        write(dir.path(), "notes.txt", "ignored");

        let loaded = load_hardware(
            "ram",
            dir.path(),
            HardwareKind::Ram,
            None,
            &DateChain::default(),
        )
        .unwrap();
        assert_eq!(loaded.stats.files, 2);
        let by_name: BTreeMap<_, _> = loaded.value.iter().map(|s| (s.name.as_str(), s)).collect();
        assert_eq!(by_name["ram_16gb_median"].get(d(2025, 11, 3)), Some(50.0));
        assert_eq!(by_name["ram_ddr5_median"].get(d(2025, 11, 4)), Some(120.0));
        assert_eq!(
            loaded.stats.date_strategies.get(&DateStrategy::IdentifierPattern),
            Some(&3)
        );
    }

    #[test]
    fn configured_strategy_order_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "gpu-deals-2025-03-01.csv",
            "title,price,date\nRTX 3080,700,2025-01-01\n",
        );
        let chain = DateChain::new(vec![
            DateStrategy::IdentifierPattern,
            DateStrategy::ExplicitColumn,
        ]);

        let loaded = load_hardware("gpu", dir.path(), HardwareKind::Gpu, None, &chain).unwrap();
        assert_eq!(loaded.value[0].get(d(2025, 3, 1)), Some(700.0));
        assert_eq!(loaded.value[0].get(d(2025, 1, 1)), None);
        assert_eq!(
            loaded.stats.date_strategies.get(&DateStrategy::IdentifierPattern),
            Some(&1)
        );
    }

    #[test]
    fn bad_snapshot_is_skipped_when_others_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a-2025-01-01.csv", "title,cost\nRTX 3080,1\n");
        write(dir.path(), "b-2025-01-02.csv", "title,price\nRTX 3080,700\n");

        let loaded = load_hardware(
            "gpu",
            dir.path(),
            HardwareKind::Gpu,
            None,
            &DateChain::default(),
        )
        .unwrap();
        assert_eq!(loaded.stats.files, 1);
        assert_eq!(loaded.value[0].len(), 1);
    }

    #[test]
    fn all_snapshots_failing_returns_the_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.csv", "title,cost\nRTX 3080,1\n");
        let err = load_hardware(
            "gpu",
            dir.path(),
            HardwareKind::Gpu,
            None,
            &DateChain::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "schema_mismatch");
    }
}
