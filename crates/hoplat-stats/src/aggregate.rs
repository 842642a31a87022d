use crate::summary::summarize;
use hoplat_model::{HopProbe, HopStatistics};
use tracing::debug;

/// Everything observed for one hop index over a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HopAccumulator {
    pub hop_index: u32,
    pub hosts: Vec<String>,
    pub rtt_samples: Vec<f64>,
}

impl HopAccumulator {
    pub fn new(hop_index: u32) -> Self {
        Self {
            hop_index,
            ..Self::default()
        }
    }

    fn absorb(&mut self, probe: &HopProbe) {
        self.hosts.extend(probe.hosts.iter().cloned());
        self.rtt_samples.extend_from_slice(&probe.rtt_samples);
    }
}

/// Session-scoped owner of one accumulator per hop index in `1..=max_hops`.
///
/// Every run (live) or replayed file is folded into the same accumulators, so feeding the
/// same data through both paths counts it twice.
#[derive(Debug, Clone)]
pub struct RunAggregator {
    accumulators: Vec<HopAccumulator>,
    runs: u32,
}

impl RunAggregator {
    pub fn new(max_hops: u32) -> Self {
        Self {
            accumulators: (1..=max_hops).map(HopAccumulator::new).collect(),
            runs: 0,
        }
    }

    pub fn max_hops(&self) -> u32 {
        self.accumulators.len() as u32
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn accumulators(&self) -> &[HopAccumulator] {
        &self.accumulators
    }

    pub fn accumulator(&self, hop_index: u32) -> Option<&HopAccumulator> {
        let slot = hop_index.checked_sub(1)? as usize;
        self.accumulators.get(slot)
    }

    /// Appends one run's probes onto the matching accumulators.
    ///
    /// Hops missing from the run are left untouched. Probes indexed 0 or past `max_hops`
    /// have no accumulator and are dropped.
    pub fn fold(&mut self, probes: &[HopProbe]) {
        let max_hops = self.accumulators.len();
        for probe in probes {
            let slot = probe
                .hop_index
                .checked_sub(1)
                .and_then(|slot| self.accumulators.get_mut(slot as usize));
            match slot {
                Some(accumulator) => accumulator.absorb(probe),
                None => debug!(
                    hop = probe.hop_index,
                    max_hops,
                    "dropping probe outside the session's hop range"
                ),
            }
        }
        self.runs += 1;
    }

    pub fn statistics(&self) -> Vec<HopStatistics> {
        summarize(&self.accumulators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(hop_index: u32, hosts: &[&str], rtt: &[f64]) -> HopProbe {
        HopProbe {
            hop_index,
            hosts: hosts.iter().map(|host| host.to_string()).collect(),
            rtt_samples: rtt.to_vec(),
        }
    }

    #[test]
    fn new_aggregator_has_one_empty_slot_per_hop() {
        let aggregator = RunAggregator::new(5);

        let indices: Vec<u32> = aggregator
            .accumulators()
            .iter()
            .map(|acc| acc.hop_index)
            .collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        assert!(aggregator
            .accumulators()
            .iter()
            .all(|acc| acc.hosts.is_empty() && acc.rtt_samples.is_empty()));
        assert_eq!(aggregator.runs(), 0);
    }

    #[test]
    fn fold_concatenates_samples_in_run_order() {
        let mut aggregator = RunAggregator::new(3);
        aggregator.fold(&[probe(3, &["10.0.0.3"], &[1.234, 2.345])]);
        aggregator.fold(&[probe(3, &["10.0.0.3"], &[3.456])]);

        let hop3 = aggregator.accumulator(3).unwrap();
        assert_eq!(hop3.rtt_samples, vec![1.234, 2.345, 3.456]);
        assert_eq!(hop3.hosts, vec!["10.0.0.3", "10.0.0.3"]);
        assert_eq!(aggregator.runs(), 2);
    }

    #[test]
    fn short_run_leaves_remaining_hops_untouched() {
        let mut aggregator = RunAggregator::new(4);
        aggregator.fold(&[probe(1, &["10.0.0.1"], &[1.0]), probe(2, &[], &[])]);

        assert_eq!(aggregator.accumulator(1).unwrap().rtt_samples, vec![1.0]);
        assert!(aggregator.accumulator(3).unwrap().rtt_samples.is_empty());
        assert!(aggregator.accumulator(4).unwrap().hosts.is_empty());
    }

    #[test]
    fn out_of_range_probes_are_dropped() {
        let mut aggregator = RunAggregator::new(2);
        aggregator.fold(&[
            probe(0, &["10.0.0.0"], &[9.0]),
            probe(3, &["10.0.0.3"], &[9.0]),
            probe(2, &["10.0.0.2"], &[2.0]),
        ]);

        assert!(aggregator.accumulator(0).is_none());
        assert!(aggregator.accumulator(3).is_none());
        assert!(aggregator.accumulator(1).unwrap().rtt_samples.is_empty());
        assert_eq!(aggregator.accumulator(2).unwrap().rtt_samples, vec![2.0]);
    }

    #[test]
    fn sessions_do_not_share_state() {
        let mut first = RunAggregator::new(1);
        let second = RunAggregator::new(1);
        first.fold(&[probe(1, &["10.0.0.1"], &[1.0])]);

        assert_eq!(first.accumulator(1).unwrap().rtt_samples.len(), 1);
        assert!(second.accumulator(1).unwrap().rtt_samples.is_empty());
    }
}
