use hoplat_model::{HopProbe, MAX_RTT_SAMPLES};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

// ASCII digits only, so every match also parses as a number.
static HOP_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]\s").unwrap());
static LIVE_HOP_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[0-9]+\s").unwrap());
static DOTTED_QUAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+").unwrap());
static LATENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+\.[0-9]{3}\s").unwrap());
static HOP_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([0-9]+)").unwrap());

/// How a hop line is mapped onto a hop index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HopIndexing {
    /// The line's 1-based position in the reassembled output. Survives a garbled hop number
    /// but shifts every later hop when a line goes missing.
    #[default]
    Positional,
    /// The hop number printed at the start of the line, falling back to the position when
    /// there is none.
    Labeled,
}

/// Drops banner lines, i.e. any line mentioning `traceroute`.
pub fn strip_banner(text: &str) -> String {
    text.lines()
        .filter(|line| !line.contains("traceroute"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Target named in a `traceroute to <host> (<addr>), ...` banner, preferring the address.
pub fn parse_target(line: &str) -> Option<String> {
    if let Some(start) = line.find('(') {
        if let Some(end) = line[start + 1..].find(')') {
            let inside = line[start + 1..start + 1 + end].trim();
            if !inside.is_empty() {
                return Some(inside.to_string());
            }
        }
    }

    let lower = line.to_ascii_lowercase();
    let idx = lower.find("traceroute to ")?;
    let rest = &line[idx + "traceroute to ".len()..];
    let token = rest
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Joins wrapped traceroute output into one logical line per hop.
///
/// Every `ms` unit is blanked first. A line opens a new hop only when it starts with a single
/// digit followed by whitespace; anything else is appended verbatim to the previous hop.
/// Continuations seen before the first hop have nowhere to go and are discarded.
pub fn reassemble_lines(text: &str) -> Vec<String> {
    join_continuations(&text.replace("ms", " "), |line| HOP_START.is_match(line))
}

/// Reassembles output captured straight from `traceroute`, whose hop counter is right-aligned
/// (` 1  ...`) and runs past one digit from hop 10 on.
///
/// Any line whose first token is a number opens a hop, and the alignment padding in front of
/// the counter is dropped so each logical line reads like [`reassemble_lines`] output.
pub fn reassemble_live_lines(text: &str) -> Vec<String> {
    join_continuations(&text.replace("ms", " "), |line| LIVE_HOP_START.is_match(line))
        .into_iter()
        .map(|line| line.trim_start().to_string())
        .collect()
}

fn join_continuations(text: &str, starts_hop: impl Fn(&str) -> bool) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut orphaned = 0usize;

    for line in text.lines() {
        if starts_hop(line) {
            lines.push(line.to_string());
        } else if let Some(current) = lines.last_mut() {
            current.push_str(line);
        } else if !line.trim().is_empty() {
            orphaned += 1;
        }
    }

    if orphaned > 0 {
        warn!(orphaned, "discarded continuation lines before the first hop");
    }

    lines
}

/// Pulls hosts and up to four RTT samples out of one logical hop line.
///
/// Addresses are blanked out before latencies are scanned so their octets never read as
/// samples. A line without matches yields empty lists (a timed-out hop).
pub fn extract_hop(line: &str, position: u32) -> HopProbe {
    let hosts: Vec<String> = DOTTED_QUAD
        .find_iter(line)
        .map(|found| found.as_str().to_string())
        .collect();

    let stripped = DOTTED_QUAD.replace_all(line, " ");
    let rtt_samples: Vec<f64> = LATENCY
        .find_iter(&stripped)
        .filter_map(|found| found.as_str().trim().parse::<f64>().ok())
        .take(MAX_RTT_SAMPLES)
        .collect();

    HopProbe {
        hop_index: position,
        hosts,
        rtt_samples,
    }
}

/// Leading hop number of a line, if any.
pub fn hop_label(line: &str) -> Option<u32> {
    HOP_LABEL
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|label| label.as_str().parse().ok())
}

/// Reassembles one run's output and extracts a probe per hop line.
pub fn parse_run(text: &str, indexing: HopIndexing) -> Vec<HopProbe> {
    extract_hops(&reassemble_lines(text), indexing)
}

/// Like [`parse_run`], for raw `traceroute` stdout; see [`reassemble_live_lines`].
pub fn parse_live_run(text: &str, indexing: HopIndexing) -> Vec<HopProbe> {
    extract_hops(&reassemble_live_lines(text), indexing)
}

/// Extracts a probe from every logical hop line, in order.
pub fn extract_hops(lines: &[String], indexing: HopIndexing) -> Vec<HopProbe> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let position = idx as u32 + 1;
            let hop_index = match indexing {
                HopIndexing::Positional => position,
                HopIndexing::Labeled => hop_label(line)
                    .filter(|label| *label > 0)
                    .unwrap_or(position),
            };
            extract_hop(line, hop_index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_from_header() {
        let line = "traceroute to example.net (1.1.1.1), 30 hops max";
        assert_eq!(parse_target(line), Some("1.1.1.1".to_string()));
        assert_eq!(
            parse_target("traceroute to 9.9.9.9, 30 hops max"),
            Some("9.9.9.9".to_string())
        );
        assert_eq!(parse_target("1  10.0.0.1  1.000 ms"), None);
    }

    #[test]
    fn continuation_lines_join_previous_hop() {
        let text = "1  host line\n  continued text\n2  next hop";
        assert_eq!(
            reassemble_lines(text),
            vec!["1  host line  continued text", "2  next hop"]
        );
    }

    #[test]
    fn units_are_blanked_before_joining() {
        let lines = reassemble_lines("1  10.0.0.1  1.234 ms\n  1.500ms");
        assert_eq!(lines, vec!["1  10.0.0.1  1.234    1.500 "]);
    }

    #[test]
    fn two_digit_hop_numbers_continue_the_previous_hop() {
        let lines = reassemble_lines("9  10.0.0.9  9.000 ms\n10  10.0.0.10  10.000 ms");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("10  10.0.0.10  10.000  "));
    }

    #[test]
    fn leading_continuation_is_discarded() {
        let lines = reassemble_lines("  stray text\n1  10.0.0.1  1.000 ms");
        assert_eq!(lines, vec!["1  10.0.0.1  1.000  "]);
    }

    #[test]
    fn extract_reads_hosts_and_samples() {
        let hop = extract_hop("1  10.0.0.1  1.234 ms  1.456 ms", 1);
        assert_eq!(hop.hop_index, 1);
        assert_eq!(hop.hosts, vec!["10.0.0.1"]);
        assert_eq!(hop.rtt_samples, vec![1.234, 1.456]);
    }

    #[test]
    fn address_octets_are_not_samples() {
        let hop = extract_hop("3  100.100.100.100 ", 3);
        assert_eq!(hop.hosts, vec!["100.100.100.100"]);
        assert!(hop.rtt_samples.is_empty());
    }

    #[test]
    fn samples_are_capped_at_four() {
        let hop = extract_hop(
            "4  10.0.0.4  1.000   2.000   3.000   4.000   5.000   6.000  ",
            4,
        );
        assert_eq!(hop.rtt_samples, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn samples_need_three_decimals_and_trailing_space() {
        let hop = extract_hop("5  1.23   4.5678   9.999", 5);
        assert!(hop.rtt_samples.is_empty());
    }

    #[test]
    fn timed_out_hop_is_empty() {
        let hop = extract_hop("6  * * *", 6);
        assert!(hop.hosts.is_empty());
        assert!(hop.rtt_samples.is_empty());
    }

    #[test]
    fn labeled_indexing_reads_the_hop_number() {
        let text = "1  10.0.0.1  1.000 ms\n3  10.0.0.3  3.000 ms";
        let positional = parse_run(text, HopIndexing::Positional);
        let labeled = parse_run(text, HopIndexing::Labeled);

        assert_eq!(positional[1].hop_index, 2);
        assert_eq!(labeled[1].hop_index, 3);
        assert_eq!(positional[1].rtt_samples, labeled[1].rtt_samples);
    }

    #[test]
    fn labeled_indexing_falls_back_to_position_for_zero() {
        let probes = parse_run("0  10.0.0.1  1.000 ms", HopIndexing::Labeled);
        assert_eq!(probes[0].hop_index, 1);
    }

    #[test]
    fn live_lines_accept_aligned_and_wide_counters() {
        let text = " 9  10.0.0.9  9.000 ms\n10  10.0.0.10  10.000 ms\n    10.0.0.11  10.500 ms";
        let lines = reassemble_live_lines(text);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("9  10.0.0.9"));
        assert!(lines[1].starts_with("10  10.0.0.10"));
        assert!(lines[1].contains("10.0.0.11"));
    }

    #[test]
    fn live_lines_keep_wrapped_addresses_as_continuations() {
        let lines = reassemble_live_lines(" 2  10.0.0.1  5.412 ms\n    10.0.0.5  6.020 ms");
        assert_eq!(lines.len(), 1);

        let hop = extract_hop(&lines[0], 2);
        assert_eq!(hop.hosts, vec!["10.0.0.1", "10.0.0.5"]);
        assert_eq!(hop.rtt_samples, vec![5.412, 6.020]);
    }

    #[test]
    fn non_ascii_digits_never_match() {
        // Arabic-Indic "10.0.0.1" and "3.123".
        let line = "1  \u{661}\u{660}.\u{660}.\u{660}.\u{661}  \u{663}.\u{661}\u{662}\u{663}   1.000 ";
        let hop = extract_hop(line, 1);
        assert!(hop.hosts.is_empty());
        assert_eq!(hop.rtt_samples, vec![1.0]);
        assert!(reassemble_lines("\u{661}  10.0.0.1  1.000 ms").is_empty());
    }

    #[test]
    fn strip_banner_drops_header_lines() {
        let text = "traceroute to 1.1.1.1 (1.1.1.1), 30 hops max\n1  10.0.0.1  1.000 ms";
        assert_eq!(strip_banner(text), "1  10.0.0.1  1.000 ms");
    }
}
