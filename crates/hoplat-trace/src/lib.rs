//! Traceroute collection, parsing and session folding.

pub mod parser;
pub mod replay;
pub mod runner;

pub use parser::{
    extract_hop, extract_hops, hop_label, parse_live_run, parse_run, parse_target,
    reassemble_lines, reassemble_live_lines, strip_banner, HopIndexing,
};
pub use replay::{load_replay_dir, read_replay_file, replay_session, ReplayFile};
pub use runner::{
    run_session, run_traceroute, SystemTracerouteRunner, TraceSettings, TracerouteRunner,
};
