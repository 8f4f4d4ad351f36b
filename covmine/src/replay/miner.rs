//! # Coverage Miner
//!
//! The concrete replay observer. Wires the aggregation engine to the replay
//! engine's callbacks:
//!
//! - [`SegmentSink`] implements [`AccessObserver`] for the worker threads:
//!   kind filtering, per-thread collection, segment finalization.
//! - [`CoverageMiner`] implements [`ProgressObserver`] for the control thread:
//!   merge passes on progress and the final flush on stream end.
//!
//! ## Counters
//!
//! Workers count accesses in their own [`ThreadContext`] and publish the totals
//! to shared atomics once per segment, so the per-access path never touches
//! shared memory.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use covmine_common::AccessEvent;
use log::{info, warn};

use super::observer::{AccessObserver, Flow, ProgressObserver, SegmentInfo};
use crate::analysis::{group_ranges, GroupingThresholds};
use crate::config::{KindFilter, MinerConfig};
use crate::coverage::{Aggregation, CompletedSegmentQueue, ThreadLocalCollector};
use crate::domain::Position;
use crate::export::{CoverageReport, MiningStats};

/// Accesses between two deadline/stop checks on a worker
const STOP_CHECK_INTERVAL: u32 = 4096;

/// Per-worker state handed out by [`SegmentSink::thread_context`]
#[derive(Debug)]
pub struct ThreadContext {
    collector: ThreadLocalCollector,
    recorded: u64,
    filtered: u64,
    published_compactions: u64,
    until_stop_check: u32,
}

#[derive(Debug, Default)]
struct SinkCounters {
    accesses_recorded: AtomicU64,
    accesses_filtered: AtomicU64,
    segments_finalized: AtomicU64,
    compactions: AtomicU64,
}

/// Worker-side half of the miner.
#[derive(Debug)]
pub struct SegmentSink {
    queue: Arc<CompletedSegmentQueue>,
    kinds: KindFilter,
    collector_capacity: usize,
    deadline: Option<Instant>,
    stopped: AtomicBool,
    counters: SinkCounters,
}

impl SegmentSink {
    fn should_stop(&self) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            if !self.stopped.swap(true, Ordering::Relaxed) {
                warn!("Mining deadline reached, stopping replay");
            }
            return true;
        }
        false
    }

    /// Returns true if a worker asked the replay engine to stop
    #[must_use]
    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

impl AccessObserver for SegmentSink {
    type Local = ThreadContext;

    fn thread_context(&self) -> ThreadContext {
        ThreadContext {
            collector: ThreadLocalCollector::with_capacity(self.collector_capacity),
            recorded: 0,
            filtered: 0,
            published_compactions: 0,
            until_stop_check: STOP_CHECK_INTERVAL,
        }
    }

    #[inline]
    fn on_access(&self, local: &mut ThreadContext, event: &AccessEvent) -> Flow {
        if self.kinds.allows(event.kind) {
            local.collector.record_range(event.range());
            local.recorded += 1;
        } else {
            local.filtered += 1;
        }

        local.until_stop_check -= 1;
        if local.until_stop_check == 0 {
            local.until_stop_check = STOP_CHECK_INTERVAL;
            if self.should_stop() {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn on_segment_end(&self, local: &mut ThreadContext, segment: &SegmentInfo) {
        let ranges = local.collector.finalize(segment.end, segment.thread, &self.queue);
        if ranges > 0 {
            self.counters.segments_finalized.fetch_add(1, Ordering::Relaxed);
        }

        let compactions = local.collector.compactions();
        self.counters
            .compactions
            .fetch_add(compactions - local.published_compactions, Ordering::Relaxed);
        local.published_compactions = compactions;

        let recorded = std::mem::take(&mut local.recorded);
        let filtered = std::mem::take(&mut local.filtered);
        self.counters.accesses_recorded.fetch_add(recorded, Ordering::Relaxed);
        self.counters.accesses_filtered.fetch_add(filtered, Ordering::Relaxed);
    }
}

/// Control-side half of the miner.
#[derive(Debug)]
pub struct CoverageMiner {
    sink: Arc<SegmentSink>,
    aggregation: Aggregation,
    thresholds: GroupingThresholds,
    stream_ended: bool,
}

impl CoverageMiner {
    /// Create a miner with empty coverage.
    #[must_use]
    pub fn new(config: &MinerConfig) -> Self {
        let queue = Arc::new(CompletedSegmentQueue::new());
        let sink = Arc::new(SegmentSink {
            queue: Arc::clone(&queue),
            kinds: config.kinds,
            collector_capacity: config.collector_capacity,
            deadline: config.deadline.map(|limit| Instant::now() + limit),
            stopped: AtomicBool::new(false),
            counters: SinkCounters::default(),
        });

        Self {
            sink,
            aggregation: Aggregation::new(queue, config.offload),
            thresholds: config.thresholds,
            stream_ended: false,
        }
    }

    /// Worker-side observer to hand to the replay engine
    #[must_use]
    pub fn sink(&self) -> Arc<SegmentSink> {
        Arc::clone(&self.sink)
    }

    /// Finish mining and build the coverage report.
    ///
    /// Runs the final flush first if the replay engine never signalled the
    /// end of the stream.
    #[must_use]
    pub fn into_report(mut self) -> CoverageReport {
        if !self.stream_ended {
            self.on_stream_end(Position::MAX);
        }

        let backpressure_waits = self.aggregation.backpressure_waits();
        let aggregator = self.aggregation.into_aggregator();
        let aggregator_stats = aggregator.stats();
        let counters = &self.sink.counters;

        let ranges = aggregator.into_coverage().into_vec();
        let groups = group_ranges(&ranges, &self.thresholds);

        let stats = MiningStats {
            covered_bytes: crate::coverage::covered_bytes(&ranges),
            range_count: ranges.len(),
            group_count: groups.len(),
            segments_finalized: counters.segments_finalized.load(Ordering::Relaxed),
            segments_merged: aggregator_stats.segments_merged,
            merge_passes: aggregator_stats.merge_passes,
            backpressure_waits,
            compactions: counters.compactions.load(Ordering::Relaxed),
            accesses_recorded: counters.accesses_recorded.load(Ordering::Relaxed),
            accesses_filtered: counters.accesses_filtered.load(Ordering::Relaxed),
            stopped_early: self.sink.stopped(),
        };

        CoverageReport { ranges, groups, stats }
    }
}

impl ProgressObserver for CoverageMiner {
    fn on_progress(&mut self, watermark: Position) {
        if self.stream_ended {
            warn!("Ignoring progress {watermark} after end of stream");
            return;
        }
        self.aggregation.on_progress(watermark);
    }

    fn on_stream_end(&mut self, last_position: Position) {
        if self.stream_ended {
            return;
        }
        self.stream_ended = true;

        let pass = self.aggregation.flush();
        info!(
            "Stream ended at {last_position}: {} ranges, {} bytes covered",
            pass.ranges, pass.covered_bytes
        );
    }
}
