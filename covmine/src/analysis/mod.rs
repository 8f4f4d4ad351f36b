//! Analysis logic for coverage data
//!
//! This module contains pure reporting-time transforms over the exact
//! coverage, separated from collection and export.

pub mod proximity_grouper;

pub use proximity_grouper::{
    group_ranges, GroupingThresholds, RangeGroup, DEFAULT_GAP_RATIO_DIVISOR, DEFAULT_MAX_GAP,
    DEFAULT_UNCONDITIONAL_GAP,
};
