//! Reporting utilities: correlation rankings and formatted terminal output.

use crate::domain::CorrelationResult;

pub mod format;

pub use format::{format_correlations, format_run_summary, format_scenarios};

/// Strongest correlations at one lag, split by sign (top-N each side).
#[derive(Debug, Clone, Default)]
pub struct Rankings {
    pub lag_days: i64,
    pub positive: Vec<CorrelationResult>,
    pub negative: Vec<CorrelationResult>,
}

impl Rankings {
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }
}

/// Rank the defined correlations at `lag_days` by strength.
pub fn rank_correlations(results: &[CorrelationResult], lag_days: i64, top_n: usize) -> Rankings {
    let at_lag: Vec<&CorrelationResult> = results
        .iter()
        .filter(|r| r.lag_days == lag_days && r.is_defined())
        .collect();

    let mut positive: Vec<CorrelationResult> = at_lag
        .iter()
        .filter(|r| r.correlation > 0.0)
        .map(|r| (*r).clone())
        .collect();
    positive.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    positive.truncate(top_n);

    let mut negative: Vec<CorrelationResult> = at_lag
        .iter()
        .filter(|r| r.correlation < 0.0)
        .map(|r| (*r).clone())
        .collect();
    negative.sort_by(|a, b| a.correlation.total_cmp(&b.correlation));
    negative.truncate(top_n);

    Rankings {
        lag_days,
        positive,
        negative,
    }
}
