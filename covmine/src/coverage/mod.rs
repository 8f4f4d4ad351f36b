//! # Coverage Aggregation Engine
//!
//! Turns a very-high-frequency stream of per-access events from many replay
//! worker threads into one sorted, disjoint set of address ranges.
//!
//! ## Data Flow
//!
//! ```text
//! worker threads (N)                          control thread (1)
//! ┌──────────────────────┐
//! │ ThreadLocalCollector │ record(addr, size)   no locks, no allocation
//! └──────────┬───────────┘
//!            │ segment end: finalize()        sort + dedup + merge
//!            ▼
//! ┌──────────────────────┐
//! │ CompletedSegmentQueue│ push() under mutex, O(1)
//! └──────────┬───────────┘
//!            │ drain_count()                  on every progress watermark
//!            ▼
//! ┌──────────────────────────┐   optional   ┌─────────────────────┐
//! │ ProgressDrivenAggregator │◀─────────────│ AsyncOffloadWrapper │
//! └──────────┬───────────────┘  one pass    └─────────────────────┘
//!            │                  in flight on one merge thread
//!            ▼
//!      RangeSet (global coverage, sorted + disjoint, never shrinks)
//! ```
//!
//! ## Ordering
//!
//! Segments reach the queue in any order. Merging is commutative and
//! associative over disjoint range sets, so the final coverage does not
//! depend on arrival order; only intermediate snapshots may differ.
//!
//! The watermark is the only causal guarantee consumed from the replay engine:
//! every segment ending at or before it has been pushed.

pub mod aggregator;
pub mod collector;
pub mod offload;
pub mod queue;
pub mod range_set;

pub use aggregator::{AggregatorStats, PassSummary, ProgressDrivenAggregator};
pub use collector::{ThreadLocalCollector, DEFAULT_COLLECTOR_CAPACITY};
pub use offload::AsyncOffloadWrapper;
pub use queue::{CompletedSegmentQueue, SegmentData};
pub use range_set::{coalesce, covered_bytes, is_disjoint, RangeSet};

use crate::domain::Position;

/// How merge passes are executed on progress signals
#[derive(Debug)]
pub enum Aggregation {
    /// Merge synchronously on the control thread
    Inline(ProgressDrivenAggregator),
    /// Merge on a background thread, at most one pass in flight
    Offloaded(AsyncOffloadWrapper),
}

impl Aggregation {
    /// Build the aggregation stage for `queue`.
    #[must_use]
    pub fn new(queue: std::sync::Arc<CompletedSegmentQueue>, offload: bool) -> Self {
        let aggregator = ProgressDrivenAggregator::new(queue);
        if offload {
            Self::Offloaded(AsyncOffloadWrapper::new(aggregator))
        } else {
            Self::Inline(aggregator)
        }
    }

    /// Run (or launch) a merge pass for `watermark`
    pub fn on_progress(&mut self, watermark: Position) {
        match self {
            Self::Inline(aggregator) => {
                aggregator.on_progress(watermark);
            }
            Self::Offloaded(wrapper) => wrapper.on_progress(watermark),
        }
    }

    /// Wait for any background pass, then run the final synchronous
    /// drain-and-merge with the maximum watermark.
    pub fn flush(&mut self) -> PassSummary {
        match self {
            Self::Inline(aggregator) => aggregator.run_pass(Position::MAX),
            Self::Offloaded(wrapper) => wrapper.flush(),
        }
    }

    /// Wait for any background pass and return the aggregator as is.
    #[must_use]
    pub fn into_aggregator(self) -> ProgressDrivenAggregator {
        match self {
            Self::Inline(aggregator) => aggregator,
            Self::Offloaded(wrapper) => wrapper.finish(),
        }
    }

    /// Progress signals that blocked on a running background pass
    #[must_use]
    pub fn backpressure_waits(&self) -> u64 {
        match self {
            Self::Inline(_) => 0,
            Self::Offloaded(wrapper) => wrapper.backpressure_waits(),
        }
    }
}
