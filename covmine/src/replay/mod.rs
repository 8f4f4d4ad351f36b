//! Replay side of the miner
//!
//! - [`observer`]: callback traits the replay engine drives
//! - [`miner`]: the coverage observer built on [`crate::coverage`]
//! - [`driver`]: reference multi-threaded replayer for recorded traces
//! - [`trace`]: recorded trace format
//! - [`watermark`]: completeness watermark bookkeeping

pub mod driver;
pub mod miner;
pub mod observer;
pub mod trace;
pub mod watermark;

pub use driver::{ReplayDriver, ReplaySummary};
pub use miner::{CoverageMiner, SegmentSink, ThreadContext};
pub use observer::{AccessObserver, Flow, ProgressObserver, SegmentInfo};
pub use trace::{AccessKind, Trace, TraceAccess, TraceSegment};
pub use watermark::WatermarkTracker;
