use hoplat_model::HopStatistics;
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use tracing::warn;

const MARGIN: u32 = 40;
const GRID_LINES: u32 = 10;
const HEADROOM: f64 = 1.1;

/// Smallest side that still leaves room for a plot inside the margins.
pub const MIN_DIMENSION: u32 = 2 * MARGIN + 1;
pub const MAX_DIMENSION: u32 = 8192;

const BACKGROUND: [u8; 3] = [255, 255, 255];
const GRID: [u8; 3] = [225, 225, 225];
const AXIS: [u8; 3] = [40, 40, 40];
const WHISKER: [u8; 3] = [70, 70, 70];
const BOX_FILL: [u8; 3] = [76, 114, 176];
const MEDIAN: [u8; 3] = [20, 20, 20];

#[derive(Debug, Clone)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    /// Rasterizer threads; 0 uses rayon's global pool.
    pub threads: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            threads: 0,
        }
    }
}

/// Five-number box over a hop's `[min, avg, max]` triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSummary {
    pub low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub high: f64,
}

/// Box for one hop, or `None` when there is nothing above 0 ms to draw.
pub fn box_summary(stats: &HopStatistics) -> Option<BoxSummary> {
    if stats.max <= 0.0 {
        return None;
    }

    let mut values = [stats.min, stats.mean, stats.max];
    values.sort_by(f64::total_cmp);
    let [low, mid, high] = values;

    Some(BoxSummary {
        low,
        q1: low + (mid - low) * 0.5,
        median: mid,
        q3: mid + (high - mid) * 0.5,
        high,
    })
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
    color: [u8; 3],
}

impl Rect {
    fn covers_row(&self, y: u32) -> bool {
        y >= self.y0 && y < self.y1
    }
}

/// Draws one box plot column per hop, latency growing upwards from 0 ms.
pub fn render_chart(stats: &[HopStatistics], settings: &ChartSettings) -> RgbImage {
    let (width, height) = chart_dimensions(settings);
    let shapes = layout_shapes(stats, width, height);

    let row_len = width as usize;
    let mut pixels = vec![BACKGROUND; row_len * height as usize];
    with_thread_pool(settings.threads, || {
        pixels
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| paint_row(row, y as u32, &shapes));
    });

    let mut image = RgbImage::new(width, height);
    for (idx, pixel) in pixels.into_iter().enumerate() {
        image.put_pixel((idx % row_len) as u32, (idx / row_len) as u32, Rgb(pixel));
    }
    image
}

/// Requested size clamped to `MIN_DIMENSION..=MAX_DIMENSION` on each side.
pub fn chart_dimensions(settings: &ChartSettings) -> (u32, u32) {
    (
        settings.width.clamp(MIN_DIMENSION, MAX_DIMENSION),
        settings.height.clamp(MIN_DIMENSION, MAX_DIMENSION),
    )
}

fn paint_row(row: &mut [[u8; 3]], y: u32, shapes: &[Rect]) {
    for shape in shapes.iter().filter(|shape| shape.covers_row(y)) {
        let end = (shape.x1 as usize).min(row.len());
        for pixel in row.iter_mut().take(end).skip(shape.x0 as usize) {
            *pixel = shape.color;
        }
    }
}

fn layout_shapes(stats: &[HopStatistics], width: u32, height: u32) -> Vec<Rect> {
    let left = MARGIN;
    let right = width - MARGIN;
    let top = MARGIN;
    let bottom = height - MARGIN;

    let peak = stats.iter().map(|hop| hop.max).fold(0.0_f64, f64::max);
    let scale_max = if peak > 0.0 { peak * HEADROOM } else { 1.0 };
    let to_y = |value: f64| -> u32 {
        let frac = (value / scale_max).clamp(0.0, 1.0);
        bottom - (frac * (bottom - top) as f64).round() as u32
    };

    let mut shapes = Vec::new();

    for line in 1..=GRID_LINES {
        let y = to_y(scale_max * line as f64 / GRID_LINES as f64);
        shapes.push(hline(left, right, y, 1, GRID));
    }

    if !stats.is_empty() {
        let column = (right - left) as f64 / stats.len() as f64;
        for (idx, hop) in stats.iter().enumerate() {
            let Some(summary) = box_summary(hop) else {
                continue;
            };

            let center = left + ((idx as f64 + 0.5) * column) as u32;
            let half_box = ((column * 0.3) as u32).max(1);
            let half_cap = (half_box / 2).max(1);
            let box_left = center.saturating_sub(half_box).max(left);
            let box_right = (center + half_box).min(right);

            shapes.push(Rect {
                x0: center.saturating_sub(1),
                x1: center + 1,
                y0: to_y(summary.high),
                y1: to_y(summary.low) + 1,
                color: WHISKER,
            });
            shapes.push(hline(
                center.saturating_sub(half_cap),
                center + half_cap,
                to_y(summary.high),
                2,
                WHISKER,
            ));
            shapes.push(hline(
                center.saturating_sub(half_cap),
                center + half_cap,
                to_y(summary.low),
                2,
                WHISKER,
            ));
            shapes.push(Rect {
                x0: box_left,
                x1: box_right,
                y0: to_y(summary.q3),
                y1: to_y(summary.q1) + 1,
                color: BOX_FILL,
            });
            shapes.push(hline(box_left, box_right, to_y(summary.median), 2, MEDIAN));
        }
    }

    shapes.push(Rect {
        x0: left.saturating_sub(2),
        x1: left,
        y0: top,
        y1: bottom + 2,
        color: AXIS,
    });
    shapes.push(hline(left.saturating_sub(2), right, bottom, 2, AXIS));

    shapes
}

fn hline(x0: u32, x1: u32, y: u32, thickness: u32, color: [u8; 3]) -> Rect {
    Rect {
        x0,
        x1,
        y0: y,
        y1: y + thickness,
        color,
    }
}

fn with_thread_pool<T: Send>(threads: usize, f: impl FnOnce() -> T + Send) -> T {
    if threads == 0 {
        return f();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(f),
        Err(err) => {
            warn!(threads, error = %err, "failed to build chart thread pool, using global pool");
            f()
        }
    }
}
