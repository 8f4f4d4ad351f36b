//! Watermark-driven folding of finished segments into global coverage
//!
//! The replay engine promises that once it reports a watermark `W`, every
//! segment ending at or before `W` has already been pushed to the
//! [`CompletedSegmentQueue`]. The aggregator relies on nothing else: segments
//! ending after `W` may or may not be queued yet, so they are parked locally
//! and re-checked on the next call.
//!
//! # Performance
//!
//! - Drain: one short lock to measure, one to move the segments out
//! - Merge: linear in `coverage.len() + segment.len()` per segment
//!   (see [`RangeSet::merge_sorted`])

use std::sync::Arc;

use log::debug;

use super::range_set::RangeSet;
use super::{CompletedSegmentQueue, SegmentData};
use crate::domain::Position;

/// Counters describing the work done by an aggregator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Number of `on_progress` calls that ran
    pub merge_passes: u64,
    /// Number of segments folded into global coverage
    pub segments_merged: u64,
    /// Highest watermark observed so far
    pub last_watermark: Position,
}

/// Outcome of one merge pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub watermark: Position,
    /// Segments merged by this pass
    pub merged: usize,
    /// Global ranges after the pass
    pub ranges: usize,
    /// Global covered bytes after the pass
    pub covered_bytes: u64,
}

/// Folds finished segments into a sorted, disjoint global range set.
///
/// Single writer: only the control thread (or the one background pass the
/// offload wrapper allows) ever touches it.
#[derive(Debug)]
pub struct ProgressDrivenAggregator {
    queue: Arc<CompletedSegmentQueue>,
    coverage: RangeSet,
    /// Drained segments ending after the last watermark
    deferred: Vec<SegmentData>,
    stats: AggregatorStats,
}

impl ProgressDrivenAggregator {
    /// Create an aggregator with empty coverage that drains `queue`.
    #[must_use]
    pub fn new(queue: Arc<CompletedSegmentQueue>) -> Self {
        Self {
            queue,
            coverage: RangeSet::new(),
            deferred: Vec::new(),
            stats: AggregatorStats::default(),
        }
    }

    /// Fold every segment with `end_position <= watermark` into coverage.
    ///
    /// Ready segments are merged in ascending `(end_position, thread_id)`
    /// order so intermediate states are reproducible. Returns the number of
    /// segments merged by this call.
    pub fn on_progress(&mut self, watermark: Position) -> usize {
        let count = self.queue.len();
        let drained = self.queue.drain_count(count);
        self.deferred.extend(drained);

        let (mut ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|s| s.end_position <= watermark);
        self.deferred = pending;

        ready.sort_unstable_by_key(|s| (s.end_position, s.thread_id));
        for segment in &ready {
            self.coverage.merge_sorted(&segment.ranges);
        }

        self.stats.merge_passes += 1;
        self.stats.segments_merged += ready.len() as u64;
        self.stats.last_watermark = self.stats.last_watermark.max(watermark);

        debug!(
            "Merge pass @ {watermark}: {} merged, {} deferred, {} global ranges",
            ready.len(),
            self.deferred.len(),
            self.coverage.len()
        );

        ready.len()
    }

    /// Final drain-and-merge with the maximum watermark.
    ///
    /// After this call no pushed segment is left unmerged.
    pub fn flush(&mut self) -> usize {
        self.on_progress(Position::MAX)
    }

    /// Run [`on_progress`](Self::on_progress) and describe the coverage it
    /// left behind.
    pub fn run_pass(&mut self, watermark: Position) -> PassSummary {
        let merged = self.on_progress(watermark);
        PassSummary {
            watermark,
            merged,
            ranges: self.coverage.len(),
            covered_bytes: self.coverage.covered_bytes(),
        }
    }

    /// Current global coverage
    #[must_use]
    pub fn coverage(&self) -> &RangeSet {
        &self.coverage
    }

    /// Number of drained segments waiting for a later watermark
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Work counters
    #[must_use]
    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    /// Consume the aggregator, returning the global coverage
    #[must_use]
    pub fn into_coverage(self) -> RangeSet {
        self.coverage
    }
}
