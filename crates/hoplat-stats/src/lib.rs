//! Per-hop aggregation across runs and summary statistics.

pub mod aggregate;
pub mod summary;

pub use aggregate::{HopAccumulator, RunAggregator};
pub use summary::{hop_statistics, median, summarize};
