//! Proximity grouping of coverage for display.
//!
//! Exact coverage of a real program is thousands of small ranges separated by
//! a few bytes of padding or untouched branches. This module collapses nearby
//! ranges into groups a human can read, recording how much gap was swallowed.
//!
//! It is a lossy, display-only transform: the exact coverage is never touched.
//!
//! # Rule
//!
//! Walking left to right with a current group, the next range is absorbed if
//!
//! ```text
//! gap < unconditional_gap
//!   || (gap < max_gap && group.gap_bytes + gap <= new_total / gap_ratio_divisor)
//! ```
//!
//! where `gap = next.min - group.max` and `new_total = next.max - group.min`.
//! Otherwise the group is closed and the next range starts a new one.

use covmine_common::AddressRange;
use serde::Serialize;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Gaps below this many bytes are always bridged.
pub const DEFAULT_UNCONDITIONAL_GAP: u64 = 64;

/// Gaps of this many bytes or more are never bridged.
pub const DEFAULT_MAX_GAP: u64 = 4096;

/// Bridged gaps may total at most `1 / divisor` of the group's span.
pub const DEFAULT_GAP_RATIO_DIVISOR: u64 = 4;

// =============================================================================
// TYPES
// =============================================================================

/// Tunable thresholds for [`group_ranges`].
///
/// The defaults are heuristics; none of them affect correctness of the exact
/// coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingThresholds {
    pub unconditional_gap: u64,
    pub max_gap: u64,
    /// Zero is treated as one (every gap below `max_gap` may be bridged)
    pub gap_ratio_divisor: u64,
}

impl Default for GroupingThresholds {
    fn default() -> Self {
        Self {
            unconditional_gap: DEFAULT_UNCONDITIONAL_GAP,
            max_gap: DEFAULT_MAX_GAP,
            gap_ratio_divisor: DEFAULT_GAP_RATIO_DIVISOR,
        }
    }
}

/// A display group of nearby coverage ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeGroup {
    /// Span from the first range's `min` to the last range's `max`
    #[serde(flatten)]
    pub range: AddressRange,

    /// Number of non-empty gaps bridged inside the group
    pub gap_count: u64,

    /// Total bytes of bridged gaps (not actually covered)
    pub gap_bytes: u64,
}

impl RangeGroup {
    fn start(range: AddressRange) -> Self {
        Self { range, gap_count: 0, gap_bytes: 0 }
    }

    /// Bytes inside the group that were actually covered
    #[must_use]
    pub fn covered_bytes(&self) -> u64 {
        self.range.len() - self.gap_bytes
    }
}

// =============================================================================
// GROUPING
// =============================================================================

/// Group a sorted, disjoint range list into display groups.
///
/// # Arguments
/// * `ranges` - Exact coverage, sorted ascending and disjoint
/// * `thresholds` - Gap tolerance parameters
///
/// # Returns
/// Groups in ascending address order; empty input yields no groups.
#[must_use]
pub fn group_ranges(ranges: &[AddressRange], thresholds: &GroupingThresholds) -> Vec<RangeGroup> {
    let divisor = thresholds.gap_ratio_divisor.max(1);
    let mut groups = Vec::new();

    let mut iter = ranges.iter().copied();
    let Some(first) = iter.next() else {
        return groups;
    };
    let mut current = RangeGroup::start(first);

    for next in iter {
        let gap = next.min.saturating_sub(current.range.max);
        let new_total = next.max - current.range.min;

        let absorb = gap < thresholds.unconditional_gap
            || (gap < thresholds.max_gap && current.gap_bytes + gap <= new_total / divisor);

        if absorb {
            current.range.max = current.range.max.max(next.max);
            current.gap_bytes += gap;
            if gap > 0 {
                current.gap_count += 1;
            }
        } else {
            groups.push(current);
            current = RangeGroup::start(next);
        }
    }
    groups.push(current);

    groups
}
