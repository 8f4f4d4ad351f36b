//! Per-worker access collection and segment finalization
//!
//! Every replay worker thread owns one [`ThreadLocalCollector`]. The replay
//! engine calls [`ThreadLocalCollector::record`] for every access, at very high
//! frequency, so recording is a bounds check plus a store into a pre-reserved
//! buffer. Nothing here is shared between threads.
//!
//! When a worker finishes a segment, [`ThreadLocalCollector::finalize`] turns
//! the buffer into a compact [`SegmentData`] and hands it to the
//! [`CompletedSegmentQueue`]. The buffer keeps its allocation for the next
//! segment on the same thread.
//!
//! ## Compaction instead of growth
//!
//! When the buffer fills up it is coalesced in place rather than reallocated.
//! Code coverage is extremely repetitive (loops re-execute the same
//! instructions), so compaction usually frees most of the buffer. Only when it
//! frees less than half is the compaction threshold doubled, which keeps the
//! amortized cost per access constant for segments that really do touch many
//! disjoint ranges.

use covmine_common::AddressRange;
use log::debug;

use super::range_set::coalesce;
use super::{CompletedSegmentQueue, SegmentData};
use crate::domain::{Position, ThreadId};

/// Default number of ranges a collector holds before compacting.
pub const DEFAULT_COLLECTOR_CAPACITY: usize = 4096;

/// Per-worker buffer of raw, unsorted address ranges.
#[derive(Debug)]
pub struct ThreadLocalCollector {
    ranges: Vec<AddressRange>,
    /// Configured capacity; the threshold is reset to this at every segment end
    capacity: usize,
    /// Length at which the next in-place compaction runs
    compact_at: usize,
    /// Number of in-place compactions since creation (diagnostics)
    compactions: u64,
}

impl ThreadLocalCollector {
    /// Create a collector with `capacity` ranges pre-reserved.
    ///
    /// A capacity of zero is bumped to one so compaction always has room.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ranges: Vec::with_capacity(capacity),
            capacity,
            compact_at: capacity,
            compactions: 0,
        }
    }

    /// Record one access of `size` bytes at `address`.
    #[inline]
    pub fn record(&mut self, address: u64, size: u64) {
        self.record_range(AddressRange::from_access(address, size));
    }

    /// Record the bytes of `range`.
    ///
    /// Empty ranges are ignored. That covers zero-sized accesses and an access
    /// starting at `u64::MAX`: ranges are half-open over `u64`, so the last
    /// byte of the address space cannot be represented.
    #[inline]
    pub fn record_range(&mut self, range: AddressRange) {
        if range.is_empty() {
            return;
        }
        if self.ranges.len() >= self.compact_at {
            self.compact();
        }
        self.ranges.push(range);
    }

    /// Number of buffered (not yet finalized) ranges
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if nothing has been recorded since the last segment end
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of in-place compactions performed so far
    #[must_use]
    pub fn compactions(&self) -> u64 {
        self.compactions
    }

    /// Convert the buffer into a [`SegmentData`] and push it to `queue`.
    ///
    /// Sorts, deduplicates and merges the buffered ranges, copies them into an
    /// exactly sized allocation and resets the buffer. Returns the number of
    /// ranges handed off; an empty buffer pushes nothing and returns 0.
    pub fn finalize(
        &mut self,
        end_position: Position,
        thread_id: ThreadId,
        queue: &CompletedSegmentQueue,
    ) -> usize {
        let Some(segment) = self.take_segment(end_position, thread_id) else {
            return 0;
        };
        let count = segment.ranges.len();
        queue.push(segment);
        count
    }

    /// Build the segment without pushing it anywhere.
    ///
    /// Returns `None` for an empty buffer. The buffer is empty afterwards.
    pub fn take_segment(
        &mut self,
        end_position: Position,
        thread_id: ThreadId,
    ) -> Option<SegmentData> {
        if self.ranges.is_empty() {
            return None;
        }

        coalesce(&mut self.ranges);

        let mut ranges: Vec<AddressRange> = self.ranges.drain(..).collect();
        ranges.shrink_to_fit();
        self.compact_at = self.capacity;

        debug!("Finalized segment {thread_id} @ {end_position}: {} ranges", ranges.len());

        Some(SegmentData { end_position, thread_id, ranges })
    }

    fn compact(&mut self) {
        coalesce(&mut self.ranges);
        self.compactions += 1;

        // Freed less than half: allow the buffer to grow instead of compacting
        // on every subsequent record
        if self.ranges.len() > self.compact_at / 2 {
            self.compact_at = self.compact_at.saturating_mul(2);
        }
    }
}

impl Default for ThreadLocalCollector {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_COLLECTOR_CAPACITY)
    }
}
