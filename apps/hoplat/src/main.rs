use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use hoplat_model::HopStatistics;
use hoplat_render::{render_chart, write_png, ChartSettings, MAX_DIMENSION, MIN_DIMENSION};
use hoplat_stats::RunAggregator;
use hoplat_trace::{
    load_replay_dir, replay_session, run_session, HopIndexing, SystemTracerouteRunner,
    TraceSettings,
};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "hoplat", version, about = "Per-hop traceroute latency statistics")]
struct Cli {
    /// Log debug details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Trace(TraceArgs),
    Replay(ReplayArgs),
    Chart(ChartArgs),
}

#[derive(Args)]
#[command(
    about = "Run traceroute repeatedly and summarize each hop. Only target networks you own or have permission to test."
)]
struct TraceArgs {
    #[arg(short = 't', long)]
    target: String,

    #[arg(short = 'n', long, default_value_t = 1)]
    runs: u32,

    #[arg(short = 'm', long, default_value_t = 30)]
    max_hops: u32,

    /// Seconds to wait between consecutive runs.
    #[arg(short = 'd', long, default_value_t = 0)]
    delay: u64,

    #[arg(long)]
    labeled_hops: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
#[command(about = "Summarize saved traceroute outputs, one run per file")]
struct ReplayArgs {
    #[arg(long, alias = "test")]
    dir: PathBuf,

    #[arg(long)]
    labeled_hops: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Where to write the JSON statistics [default: output/<timestamp>/hops.json]
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// Where to write the box plot [default: <out dir>/<label>_boxplot.png]
    #[arg(long)]
    chart: Option<PathBuf>,

    #[arg(long)]
    no_chart: bool,
}

#[derive(Args)]
#[command(about = "Render a box plot from a statistics JSON file")]
struct ChartArgs {
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 1200, value_parser = dimension_parser())]
    width: u32,

    #[arg(long, default_value_t = 600, value_parser = dimension_parser())]
    height: u32,

    #[arg(long, default_value_t = 0)]
    threads: usize,
}

fn dimension_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(i64::from(MIN_DIMENSION)..=i64::from(MAX_DIMENSION))
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Trace(args) => run_trace(args),
        Commands::Replay(args) => run_replay(args),
        Commands::Chart(args) => run_chart(args),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn indexing(labeled_hops: bool) -> HopIndexing {
    if labeled_hops {
        HopIndexing::Labeled
    } else {
        HopIndexing::Positional
    }
}

fn run_trace(args: TraceArgs) -> Result<()> {
    let settings = TraceSettings {
        max_hops: args.max_hops,
        runs: args.runs,
        delay_secs: args.delay,
    };

    let aggregator = run_session(
        &SystemTracerouteRunner,
        &args.target,
        &settings,
        indexing(args.labeled_hops),
    )?;

    finish(aggregator, &args.output, &args.target)
}

fn run_replay(args: ReplayArgs) -> Result<()> {
    info!(dir = %args.dir.display(), "processing replay directory");
    let files = load_replay_dir(&args.dir)?;
    if files.is_empty() {
        warn!(dir = %args.dir.display(), "replay directory has no files");
    }

    let aggregator = replay_session(&files, indexing(args.labeled_hops));
    let label = files
        .iter()
        .find_map(|file| file.target.clone())
        .unwrap_or_else(|| "replay".to_string());

    finish(aggregator, &args.output, &label)
}

fn run_chart(args: ChartArgs) -> Result<()> {
    let contents = fs::read_to_string(&args.in_path)
        .with_context(|| format!("failed to read input {}", args.in_path.display()))?;
    let stats: Vec<HopStatistics> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse statistics {}", args.in_path.display()))?;

    let settings = ChartSettings {
        width: args.width,
        height: args.height,
        threads: args.threads,
    };
    write_chart(&args.out, &stats, &settings)
}

fn finish(aggregator: RunAggregator, output: &OutputArgs, label: &str) -> Result<()> {
    let runs = aggregator.runs();
    let stats = aggregator.statistics();

    let out = output.out.clone().unwrap_or_else(default_out_path);
    write_json(&out, &stats)?;
    info!(path = %out.display(), hops = stats.len(), runs, "wrote hop statistics");

    if !output.no_chart {
        let chart = output
            .chart
            .clone()
            .unwrap_or_else(|| default_chart_path(&out, label));
        write_chart(&chart, &stats, &ChartSettings::default())?;
    }

    Ok(())
}

fn write_chart(path: &Path, stats: &[HopStatistics], settings: &ChartSettings) -> Result<()> {
    info!(path = %path.display(), "creating boxplot graph");
    let image = render_chart(stats, settings);
    write_png(path, &image).map_err(|err| anyhow!("failed to write png {}: {err}", path.display()))
}

fn default_out_path() -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    PathBuf::from("output").join(stamp).join("hops.json")
}

fn default_chart_path(out: &Path, label: &str) -> PathBuf {
    let file_name = format!("{}_boxplot.png", label.replace(['/', '\\'], "_"));
    match out.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &json)
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }

    let tmp_path = temp_path(path);
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file {}", tmp_path.display()))?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to write temp file {}", tmp_path.display()))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("failed to replace output {}", path.display()));
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("hops.json");
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    parent.join(format!(".{}.part-{}-{}", file_name, std::process::id(), stamp))
}
