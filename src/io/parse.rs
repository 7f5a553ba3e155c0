//! Cell-level parsing: prices, decimals, dates and the date-strategy chain.
//!
//! Nothing here returns an error. An unparsable cell is `None` and callers
//! count it; a bad cell never aborts a load.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::domain::DateStrategy;

static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[$€£¥]|USD|EUR|GBP").expect("valid regex"));
static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.,\-]").expect("valid regex"));
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid regex"));

/// Parse a loosely formatted price such as `"$1,299.99"`, `"899 USD"` or `"€ 450"`.
///
/// Currency symbols/words and every character outside `[0-9.,-]` are removed,
/// commas are treated as thousands separators.
pub fn parse_price(raw: &str) -> Option<f64> {
    let s = CURRENCY.replace_all(raw, "");
    let s = NON_NUMERIC.replace_all(&s, "");
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    finite(s.parse::<f64>().ok()?)
}

/// Parse an index value. Accepts `.` or a lone `,` as the decimal separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || matches!(s.to_ascii_lowercase().as_str(), "." | "na" | "n/a" | "nan" | "null") {
        return None;
    }
    if let Ok(v) = s.parse::<f64>() {
        return finite(v);
    }
    if s.matches(',').count() == 1 && !s.contains('.') {
        return finite(s.replace(',', ".").parse::<f64>().ok()?);
    }
    None
}

/// Parse a calendar date. Timestamps are accepted and truncated to their UTC date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    // ISO first; slash dates are month-first (the convention of the US
    // commodity exports), dashed/dotted day-first dates are European.
    const FMTS: [&str; 7] = [
        "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%b %d, %Y", "%Y%m%d",
    ];
    let s = raw.trim();
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    parse_timestamp_utc(s).map(|dt| dt.date_naive())
}

/// Parse a possibly timezone-aware timestamp and normalize it to a UTC calendar date.
pub fn parse_timestamp_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    parse_timestamp_utc(s)
        .map(|dt| dt.date_naive())
        .or_else(|| parse_date(s))
}

fn parse_timestamp_utc(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S %:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // `2013-04-28 00:00:00 UTC` and naive timestamps are taken as UTC.
    let naive = s
        .strip_suffix(" UTC")
        .or_else(|| s.strip_suffix('Z'))
        .unwrap_or(s);
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

/// First `YYYY-MM-DD` pattern embedded in an identifier such as a file name.
pub fn date_from_identifier(identifier: &str) -> Option<NaiveDate> {
    ISO_DATE
        .captures_iter(identifier)
        .find_map(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
}

/// The file's last-modified time as a UTC calendar date.
pub fn date_from_mtime(path: &Path) -> Option<NaiveDate> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).date_naive())
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Result of trying one date strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Resolved(NaiveDate),
    /// The strategy does not apply here; try the next one.
    NotApplicable,
    /// The strategy applies but its input is unparsable; stop.
    Failed,
}

/// Per-file inputs for the date strategies. File-level dates are computed once.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDates {
    /// Whether the table has an explicit date column.
    pub has_column: bool,
    pub identifier: Option<NaiveDate>,
    pub modified: Option<NaiveDate>,
}

impl FileDates {
    pub fn for_file(path: &Path, has_column: bool) -> Self {
        let identifier = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(date_from_identifier);
        Self {
            has_column,
            identifier,
            modified: date_from_mtime(path),
        }
    }
}

/// Ordered list of date strategies; the first that resolves wins.
///
/// An explicit date column is authoritative when present: an unparsable cell
/// fails the row rather than silently falling back to a file-level date.
#[derive(Debug, Clone)]
pub struct DateChain {
    order: Vec<DateStrategy>,
}

impl Default for DateChain {
    fn default() -> Self {
        Self {
            order: vec![
                DateStrategy::ExplicitColumn,
                DateStrategy::IdentifierPattern,
                DateStrategy::FileModified,
            ],
        }
    }
}

impl DateChain {
    pub fn new(order: Vec<DateStrategy>) -> Self {
        Self { order }
    }

    pub fn attempt(strategy: DateStrategy, file: &FileDates, cell: Option<&str>) -> Attempt {
        match strategy {
            DateStrategy::ExplicitColumn => {
                if !file.has_column {
                    return Attempt::NotApplicable;
                }
                match cell.and_then(parse_timestamp_date) {
                    Some(d) => Attempt::Resolved(d),
                    None => Attempt::Failed,
                }
            }
            DateStrategy::IdentifierPattern => {
                file.identifier.map_or(Attempt::NotApplicable, Attempt::Resolved)
            }
            DateStrategy::FileModified => {
                file.modified.map_or(Attempt::NotApplicable, Attempt::Resolved)
            }
        }
    }

    /// Resolve a row's date, returning the strategy that produced it.
    pub fn resolve(&self, file: &FileDates, cell: Option<&str>) -> Option<(NaiveDate, DateStrategy)> {
        for &strategy in &self.order {
            match Self::attempt(strategy, file, cell) {
                Attempt::Resolved(d) => return Some((d, strategy)),
                Attempt::NotApplicable => continue,
                Attempt::Failed => return None,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn price_strips_currency_and_thousands() {
        assert_eq!(parse_price("$1,299.99"), Some(1299.99));
        assert_eq!(parse_price("899 USD"), Some(899.0));
        assert_eq!(parse_price("€ 450"), Some(450.0));
        assert_eq!(parse_price("Price: 12.5 eur"), Some(12.5));
        assert_eq!(parse_price("call for price"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn decimal_accepts_comma_separator() {
        assert_eq!(parse_decimal("0.75"), Some(0.75));
        assert_eq!(parse_decimal("0,75"), Some(0.75));
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("2025-10-01"), Some(d(2025, 10, 1)));
        assert_eq!(parse_date("10/01/2025"), Some(d(2025, 10, 1)));
        assert_eq!(parse_date("May 20, 1987"), Some(d(1987, 5, 20)));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn timezone_aware_timestamps_normalize_to_utc_date() {
        assert_eq!(parse_timestamp_date("2013-04-28 00:00:00 UTC"), Some(d(2013, 4, 28)));
        assert_eq!(parse_timestamp_date("2025-01-01T23:30:00-02:00"), Some(d(2025, 1, 2)));
        assert_eq!(parse_timestamp_date("2025-01-01 10:00:00+00:00"), Some(d(2025, 1, 1)));
        assert_eq!(parse_timestamp_date("2025-01-01"), Some(d(2025, 1, 1)));
    }

    #[test]
    fn identifier_pattern_extracts_embedded_date() {
        assert_eq!(
            date_from_identifier("gpu-deals-2025-11-03.csv"),
            Some(d(2025, 11, 3))
        );
        assert_eq!(date_from_identifier("current-gpu-deals.csv"), None);
    }

    #[test]
    fn chain_prefers_column_then_identifier_then_mtime() {
        let chain = DateChain::default();
        let file = FileDates {
            has_column: false,
            identifier: Some(d(2025, 11, 3)),
            modified: Some(d(2026, 1, 1)),
        };
        assert_eq!(
            chain.resolve(&file, None),
            Some((d(2025, 11, 3), DateStrategy::IdentifierPattern))
        );

        let file = FileDates { identifier: None, ..file };
        assert_eq!(
            chain.resolve(&file, None),
            Some((d(2026, 1, 1), DateStrategy::FileModified))
        );

        let file = FileDates { has_column: true, ..file };
        assert_eq!(
            chain.resolve(&file, Some("2025-12-24")),
            Some((d(2025, 12, 24), DateStrategy::ExplicitColumn))
        );
        // An unparsable explicit date does not fall through to the file date.
        assert_eq!(chain.resolve(&file, Some("garbage")), None);
    }
}
