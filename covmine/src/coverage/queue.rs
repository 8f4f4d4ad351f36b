//! Completed-segment hand-off between replay workers and the aggregator
//!
//! Many worker threads push finished segments; the control thread drains them
//! in bulk. The lock is only ever held for a `Vec::push` or a move of already
//! measured items, never for allocation or merge work.

use covmine_common::AddressRange;
use parking_lot::Mutex;

use crate::domain::{Position, ThreadId};

/// Locally merged output of one replay segment.
///
/// `ranges` is sorted and disjoint. `end_position` is only used to decide when
/// the segment may be folded into global coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentData {
    pub end_position: Position,
    pub thread_id: ThreadId,
    pub ranges: Vec<AddressRange>,
}

/// Multi-producer, single-consumer queue of finished segments.
///
/// Unordered: segments arrive in whatever order workers finish them.
#[derive(Debug, Default)]
pub struct CompletedSegmentQueue {
    segments: Mutex<Vec<SegmentData>>,
}

impl CompletedSegmentQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a finished segment over. Ownership moves to the queue.
    pub fn push(&self, segment: SegmentData) {
        self.segments.lock().push(segment);
    }

    /// Number of segments currently queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.lock().len()
    }

    /// Returns true if no segments are queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.lock().is_empty()
    }

    /// Block every producer and consumer until the guard drops
    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> parking_lot::MutexGuard<'_, Vec<SegmentData>> {
        self.segments.lock()
    }

    /// Remove and return the first `count` queued segments.
    ///
    /// `count` is meant to be measured with [`len`](Self::len) beforehand so
    /// the output allocation happens outside the lock. Segments pushed in the
    /// meantime stay queued for the next drain. If fewer than `count` segments
    /// are queued, all of them are returned.
    #[must_use]
    pub fn drain_count(&self, count: usize) -> Vec<SegmentData> {
        let mut drained = Vec::with_capacity(count);
        {
            let mut segments = self.segments.lock();
            let count = count.min(segments.len());
            drained.extend(segments.drain(..count));
        }
        drained
    }
}
