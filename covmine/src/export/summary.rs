use crate::analysis::RangeGroup;
use crate::export::{CoverageReport, MiningStats};
use crate::replay::ReplaySummary;

/// Print the one-line outcome of a run
pub fn print_summary(replay: &ReplaySummary, stats: &MiningStats) {
    let reason = if replay.stopped { "deadline reached" } else { "trace complete" };
    eprintln!(
        "\n{reason}: {} segments, {} accesses ({} filtered), {} ranges, {} bytes covered, {} groups",
        replay.segments_replayed,
        stats.accesses_recorded,
        stats.accesses_filtered,
        stats.range_count,
        stats.covered_bytes,
        stats.group_count,
    );
    eprintln!(
        "merge: {} passes, {} segments, {} backpressure waits, {} compactions",
        stats.merge_passes, stats.segments_merged, stats.backpressure_waits, stats.compactions,
    );
}

fn format_group(group: &RangeGroup) -> String {
    let mut line = format!(
        "0x{:016x}-0x{:016x} {:>10} bytes",
        group.range.min,
        group.range.max,
        group.covered_bytes()
    );
    if group.gap_count > 0 {
        line.push_str(&format!(" ({} gaps, {} bytes)", group.gap_count, group.gap_bytes));
    }
    line
}

/// Print every proximity group of `report`
pub fn print_groups(report: &CoverageReport) {
    for group in &report.groups {
        println!("{}", format_group(group));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covmine_common::AddressRange;

    #[test]
    fn test_format_group_without_gaps() {
        let group =
            RangeGroup { range: AddressRange::new(0x10, 0x20), gap_count: 0, gap_bytes: 0 };
        assert_eq!(format_group(&group), "0x0000000000000010-0x0000000000000020         16 bytes");
    }

    #[test]
    fn test_format_group_reports_bridged_gaps() {
        let group =
            RangeGroup { range: AddressRange::new(0, 100), gap_count: 2, gap_bytes: 30 };
        assert!(format_group(&group).ends_with("70 bytes (2 gaps, 30 bytes)"));
    }
}
