use crate::aggregate::HopAccumulator;
use hoplat_model::HopStatistics;

/// Reduces every accumulator to its statistics, in ascending hop order.
pub fn summarize(accumulators: &[HopAccumulator]) -> Vec<HopStatistics> {
    let mut stats: Vec<HopStatistics> = accumulators.iter().map(hop_statistics).collect();
    stats.sort_by_key(|hop| hop.hop_index);
    stats
}

/// Statistics over all pooled samples of one hop. A hop with no samples reports `0` for
/// every value.
pub fn hop_statistics(accumulator: &HopAccumulator) -> HopStatistics {
    let samples = &accumulator.rtt_samples;
    let (mean, min, max, median) = if samples.is_empty() {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let sum: f64 = samples.iter().sum();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (
            sum / samples.len() as f64,
            min,
            max,
            median(samples).unwrap_or(0.0),
        )
    };

    HopStatistics {
        hop_index: accumulator.hop_index,
        hosts: accumulator.hosts.clone(),
        mean,
        min,
        max,
        median,
        sample_count: samples.len(),
    }
}

/// Middle value of the samples, or the mean of the two middle values for an even count.
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
