//! Replay engine callback interface
//!
//! The replay engine drives the miner through two capabilities instead of raw
//! function pointers:
//!
//! - [`AccessObserver`]: shared by all worker threads. Each worker gets its own
//!   [`AccessObserver::Local`] context, so the hot path needs no locking.
//! - [`ProgressObserver`]: owned by the single control thread.
//!
//! ## Contract
//!
//! | Callback           | Thread           | Frequency                     |
//! |--------------------|------------------|-------------------------------|
//! | `on_access`        | worker           | every access (very high)      |
//! | `on_segment_end`   | same worker      | once per finished segment     |
//! | `on_progress`      | control          | whenever the watermark moves  |
//! | `on_stream_end`    | control          | once, after all workers exit  |
//!
//! `on_progress(W)` may only be called once every segment ending at or before
//! `W` has returned from `on_segment_end`.

use covmine_common::AccessEvent;

use crate::domain::{Position, ThreadId};

/// Whether the replay engine should keep dispatching events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Identifies a finished replay segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Replayed thread the segment belongs to
    pub thread: ThreadId,
    /// Position of the first event in the segment
    pub start: Position,
    /// Position of the last event in the segment
    pub end: Position,
}

/// Worker-side callbacks, invoked concurrently from many replay threads.
pub trait AccessObserver: Sync {
    /// Per-worker state, created once per worker thread and never shared.
    type Local: Send;

    /// Create the state for a new worker thread
    fn thread_context(&self) -> Self::Local;

    /// Observe one access. Must be O(1) and touch only `local`.
    fn on_access(&self, local: &mut Self::Local, event: &AccessEvent) -> Flow;

    /// The worker owning `local` finished `segment`.
    fn on_segment_end(&self, local: &mut Self::Local, segment: &SegmentInfo);
}

/// Control-side callbacks, invoked from a single thread.
pub trait ProgressObserver {
    /// All segments ending at or before `watermark` have finished.
    fn on_progress(&mut self, watermark: Position);

    /// The stream is over; `last_position` is the final position of the trace.
    fn on_stream_end(&mut self, last_position: Position);
}
