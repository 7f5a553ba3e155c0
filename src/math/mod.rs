//! Mathematical utilities: descriptive statistics and correlation.

pub mod stats;

pub use stats::*;
