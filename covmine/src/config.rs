//! Miner configuration
//!
//! Built from CLI arguments (see [`crate::cli::Args`]) or constructed directly
//! by library users. Every field has a working default.

use std::time::Duration;

use covmine_common::kind_mask;

use crate::analysis::GroupingThresholds;
use crate::coverage::DEFAULT_COLLECTOR_CAPACITY;
use crate::replay::AccessKind;

/// Set of access kinds the miner records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindFilter(u8);

impl KindFilter {
    /// Record every kind
    pub const ALL: KindFilter = KindFilter(0b111);

    /// Build a filter from a list of kinds. An empty list means all kinds.
    #[must_use]
    pub fn from_kinds(kinds: &[AccessKind]) -> Self {
        if kinds.is_empty() {
            return Self::ALL;
        }
        KindFilter(kinds.iter().fold(0, |mask, kind| mask | kind_mask(kind.as_raw())))
    }

    /// Returns true if accesses of raw `kind` should be recorded
    #[inline]
    #[must_use]
    pub fn allows(self, kind: u32) -> bool {
        self.0 & kind_mask(kind) != 0
    }
}

impl Default for KindFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// Configuration for a [`CoverageMiner`](crate::replay::CoverageMiner)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerConfig {
    /// Ranges each worker buffers before compacting in place
    pub collector_capacity: usize,
    /// Run merge passes on a background thread
    pub offload: bool,
    /// Access kinds to record
    pub kinds: KindFilter,
    /// Stop the replay after this long (`None` = unlimited)
    pub deadline: Option<Duration>,
    /// Proximity grouping thresholds for the report
    pub thresholds: GroupingThresholds,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            collector_capacity: DEFAULT_COLLECTOR_CAPACITY,
            offload: true,
            kinds: KindFilter::ALL,
            deadline: None,
            thresholds: GroupingThresholds::default(),
        }
    }
}
