//! Shared data structures for hoplat.

use serde::{Deserialize, Serialize};

/// Most RTT samples kept from a single hop line.
pub const MAX_RTT_SAMPLES: usize = 4;

/// One hop as reported by a single traceroute run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HopProbe {
    /// 1-based index of the hop line within its run. With positional indexing this is the
    /// line's position in the reassembled output, not the hop number printed by traceroute.
    pub hop_index: u32,
    pub hosts: Vec<String>,
    pub rtt_samples: Vec<f64>,
}

/// Summary of every sample pooled for one hop across a session.
///
/// Serializes as `{"hop", "host", "avg", "min", "max", "med"}`. A hop that never answered
/// reports `0` for every statistic, which looks the same as a genuine 0 ms hop on the wire;
/// `sample_count` tells the two apart in memory and is not serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HopStatistics {
    #[serde(rename = "hop")]
    pub hop_index: u32,
    #[serde(rename = "host")]
    pub hosts: Vec<String>,
    #[serde(rename = "avg")]
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "med")]
    pub median: f64,
    #[serde(skip)]
    pub sample_count: usize,
}

impl HopStatistics {
    pub fn has_samples(&self) -> bool {
        self.sample_count > 0
    }
}
