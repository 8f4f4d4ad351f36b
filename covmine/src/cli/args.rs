//! CLI argument definitions

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::analysis::{
    GroupingThresholds, DEFAULT_GAP_RATIO_DIVISOR, DEFAULT_MAX_GAP, DEFAULT_UNCONDITIONAL_GAP,
};
use crate::config::{KindFilter, MinerConfig};
use crate::coverage::DEFAULT_COLLECTOR_CAPACITY;
use crate::replay::AccessKind;

#[derive(Parser, Debug)]
#[command(
    name = "covmine",
    about = "Mine memory-access coverage from a recorded multi-threaded trace",
    after_help = "\
EXAMPLES:
    covmine trace.json                          Exec coverage on all cores
    covmine trace.json --export cov.json        Save the coverage report
    covmine trace.json --kinds read,write -w 2  Data coverage on two workers"
)]
pub struct Args {
    /// Recorded trace to replay (JSON)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Replay worker threads (default: available cores)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Export the coverage report to FILE
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Merge on the control thread instead of a background thread
    #[arg(long)]
    pub sync: bool,

    /// Access kinds to record: exec, read, write (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub kinds: Vec<AccessKind>,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Ranges buffered per worker before compacting
    #[arg(long, default_value_t = DEFAULT_COLLECTOR_CAPACITY)]
    pub capacity: usize,

    /// Gaps below this many bytes are always grouped
    #[arg(long, default_value_t = DEFAULT_UNCONDITIONAL_GAP)]
    pub unconditional_gap: u64,

    /// Gaps of this many bytes or more are never grouped
    #[arg(long, default_value_t = DEFAULT_MAX_GAP)]
    pub max_gap: u64,

    /// Grouped gaps may total at most 1/N of a group's span
    #[arg(long, default_value_t = DEFAULT_GAP_RATIO_DIVISOR)]
    pub gap_ratio: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Miner configuration selected by these arguments
    #[must_use]
    pub fn miner_config(&self) -> MinerConfig {
        MinerConfig {
            collector_capacity: self.capacity,
            offload: !self.sync,
            kinds: KindFilter::from_kinds(&self.kinds),
            deadline: (self.duration > 0).then(|| Duration::from_secs(self.duration)),
            thresholds: GroupingThresholds {
                unconditional_gap: self.unconditional_gap,
                max_gap: self.max_gap,
                gap_ratio_divisor: self.gap_ratio,
            },
        }
    }

    /// Replay pool size, falling back to the number of available cores
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covmine_common::{ACCESS_EXECUTE, ACCESS_READ, ACCESS_WRITE};

    #[test]
    fn test_defaults_match_miner_defaults() {
        let args = Args::try_parse_from(["covmine", "trace.json"]).unwrap();

        assert_eq!(args.miner_config(), MinerConfig::default());
        assert!(args.worker_count() >= 1);
        assert!(args.export.is_none());
    }

    #[test]
    fn test_kinds_and_thresholds() {
        let args = Args::try_parse_from([
            "covmine",
            "trace.json",
            "--kinds",
            "read,write",
            "--sync",
            "--duration",
            "5",
            "--max-gap",
            "128",
            "-w",
            "3",
        ])
        .unwrap();
        let config = args.miner_config();

        assert!(!config.kinds.allows(ACCESS_EXECUTE));
        assert!(config.kinds.allows(ACCESS_READ));
        assert!(config.kinds.allows(ACCESS_WRITE));
        assert!(!config.offload);
        assert_eq!(config.deadline, Some(Duration::from_secs(5)));
        assert_eq!(config.thresholds.max_gap, 128);
        assert_eq!(args.worker_count(), 3);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Args::try_parse_from(["covmine", "trace.json", "--kinds", "jump"]).is_err());
    }

    #[test]
    fn test_trace_is_required() {
        assert!(Args::try_parse_from(["covmine"]).is_err());
    }
}
