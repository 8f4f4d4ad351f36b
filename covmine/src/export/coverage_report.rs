//! JSON coverage report
//!
//! ```json
//! {
//!   "ranges": [ { "min": 4096, "max": 4160 } ],
//!   "groups": [ { "min": 4096, "max": 4160, "gap_count": 0, "gap_bytes": 0 } ],
//!   "stats":  { "covered_bytes": 64, "range_count": 1, ... }
//! }
//! ```
//!
//! `ranges` is the exact coverage: sorted, disjoint, half-open. `groups` is
//! the lossy proximity view of the same coverage.

use std::io::Write;

use covmine_common::AddressRange;
use log::info;
use serde::Serialize;

use crate::analysis::RangeGroup;
use crate::domain::ExportError;

/// Counters collected over one mining run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MiningStats {
    /// Bytes in the exact coverage
    pub covered_bytes: u64,
    /// Disjoint ranges in the exact coverage
    pub range_count: usize,
    /// Proximity groups
    pub group_count: usize,
    /// Non-empty segments handed to the queue
    pub segments_finalized: u64,
    /// Segments merged into the global coverage
    pub segments_merged: u64,
    /// Merge passes run (including the final flush)
    pub merge_passes: u64,
    /// Progress signals that waited on a background merge
    pub backpressure_waits: u64,
    /// In-place collector compactions
    pub compactions: u64,
    /// Accesses recorded after kind filtering
    pub accesses_recorded: u64,
    /// Accesses dropped by the kind filter
    pub accesses_filtered: u64,
    /// The run hit its deadline before the trace ended
    pub stopped_early: bool,
}

/// Result of a mining run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CoverageReport {
    pub ranges: Vec<AddressRange>,
    pub groups: Vec<RangeGroup>,
    pub stats: MiningStats,
}

impl CoverageReport {
    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!(
            "Exported coverage report: {} ranges, {} groups",
            self.ranges.len(),
            self.groups.len()
        );
        Ok(())
    }
}
