use crate::parser::{parse_live_run, strip_banner, HopIndexing};
use anyhow::{Context, Result};
use hoplat_stats::RunAggregator;
use std::process::Command;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TraceSettings {
    pub max_hops: u32,
    pub runs: u32,
    pub delay_secs: u64,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            max_hops: 30,
            runs: 1,
            delay_secs: 0,
        }
    }
}

pub trait TracerouteRunner {
    fn run(&self, target: &str, settings: &TraceSettings) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTracerouteRunner;

impl TracerouteRunner for SystemTracerouteRunner {
    fn run(&self, target: &str, settings: &TraceSettings) -> Result<String> {
        run_traceroute(target, settings)
    }
}

/// Runs `traceroute -m <max_hops> -n <target>` and returns its stdout. A failing exit
/// status is logged, not returned: whatever hops were printed still count.
pub fn run_traceroute(target: &str, settings: &TraceSettings) -> Result<String> {
    let output = Command::new("traceroute")
        .arg("-m")
        .arg(settings.max_hops.to_string())
        .arg("-n")
        .arg(target)
        .output()
        .with_context(|| format!("failed to spawn traceroute for {target}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            host = target,
            status = %output.status,
            stderr = %stderr.trim(),
            "traceroute exited unsuccessfully"
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Runs `settings.runs` traces back to back and folds each into one session.
///
/// Output is read with [`parse_live_run`], which copes with traceroute's right-aligned and
/// multi-digit hop counters. Each run is parsed and folded before the next starts;
/// `delay_secs` is slept between runs but not after the last one.
pub fn run_session<R>(
    runner: &R,
    target: &str,
    settings: &TraceSettings,
    indexing: HopIndexing,
) -> Result<RunAggregator>
where
    R: TracerouteRunner + ?Sized,
{
    let mut aggregator = RunAggregator::new(settings.max_hops);

    for rep in 0..settings.runs {
        info!(host = target, run = rep + 1, runs = settings.runs, "running traceroute");
        let raw = runner
            .run(target, settings)
            .with_context(|| format!("traceroute run {} of {} failed", rep + 1, settings.runs))?;

        let probes = parse_live_run(&strip_banner(&raw), indexing);
        if probes.is_empty() {
            warn!(host = target, run = rep + 1, "traceroute output had no hop lines");
        } else {
            debug!(host = target, hops = probes.len(), "traceroute complete");
        }
        aggregator.fold(&probes);

        if settings.delay_secs > 0 && rep + 1 < settings.runs {
            sleep(Duration::from_secs(settings.delay_secs));
        }
    }

    Ok(aggregator)
}
