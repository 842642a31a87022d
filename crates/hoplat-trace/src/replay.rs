use crate::parser::{parse_run, parse_target, strip_banner, HopIndexing};
use anyhow::{Context, Result};
use hoplat_model::HopProbe;
use hoplat_stats::RunAggregator;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One saved traceroute output, banner already removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayFile {
    pub path: PathBuf,
    /// Target from the removed banner, when there was one.
    pub target: Option<String>,
    pub text: String,
}

pub fn read_replay_file(path: &Path) -> Result<ReplayFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read replay file {}", path.display()))?;
    let target = raw
        .lines()
        .filter(|line| line.contains("traceroute"))
        .find_map(parse_target);

    Ok(ReplayFile {
        path: path.to_path_buf(),
        target,
        text: strip_banner(&raw),
    })
}

/// Reads every regular file in `dir`, ordered by file name.
pub fn load_replay_dir(dir: &Path) -> Result<Vec<ReplayFile>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list replay directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to list replay directory {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-file replay entry");
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            info!(path = %path.display(), "processing replay file");
            read_replay_file(path)
        })
        .collect()
}

/// Folds every file into one session, one run per file.
///
/// The session is sized to the highest hop index found in any file.
pub fn replay_session(files: &[ReplayFile], indexing: HopIndexing) -> RunAggregator {
    let runs: Vec<Vec<HopProbe>> = files
        .iter()
        .map(|file| {
            let probes = parse_run(&file.text, indexing);
            if probes.is_empty() {
                warn!(path = %file.path.display(), "replay file had no hop lines");
            }
            probes
        })
        .collect();

    let max_hops = runs
        .iter()
        .flatten()
        .map(|probe| probe.hop_index)
        .max()
        .unwrap_or(0);

    let mut aggregator = RunAggregator::new(max_hops);
    for probes in &runs {
        aggregator.fold(probes);
    }
    aggregator
}
