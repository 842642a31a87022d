//! Box plot chart of per-hop latency and PNG output.

pub mod chart;
pub mod image_out;

pub use chart::{
    box_summary, chart_dimensions, render_chart, BoxSummary, ChartSettings, MAX_DIMENSION,
    MIN_DIMENSION,
};
pub use image_out::write_png;
