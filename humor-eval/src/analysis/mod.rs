//! Accuracy analysis of results files

pub mod comparator;
pub mod metrics;

pub use comparator::{compare, ComparisonReport, ModeAccuracy};
pub use metrics::{safe_divide, AccuracyStats, ResultsAnalysis};
