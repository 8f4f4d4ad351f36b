//! # covmine - Coverage Mining for Recorded Multi-Threaded Traces
//!
//! covmine observes a replay of a recorded multi-threaded execution and
//! reduces its stream of memory accesses to the set of address ranges that
//! were touched: a sorted, disjoint list of half-open `[min, max)` ranges.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Replay Engine (driver)                       │
//! │      worker threads ── on_access / on_segment_end               │
//! │      control thread ── on_progress(W) / on_stream_end           │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ AccessObserver / ProgressObserver
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   covmine (This Crate)                          │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Collector   │──▶│   Segment    │──▶│  Aggregator  │         │
//! │  │ (per worker) │   │    Queue     │   │ (+ offload)  │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               │                 │
//! │                                               ▼                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    Export    │◀──│   Analysis   │◀──│   RangeSet   │         │
//! │  │ (report.json)│   │  (grouping)  │   │  (coverage)  │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`coverage`]: the aggregation engine
//!   - `collector`: per-thread range buffer with in-place compaction
//!   - `queue`: completed-segment hand-off between workers and control
//!   - `aggregator`: watermark-driven merge into the global coverage
//!   - `offload`: optional background merge, one pass in flight
//!   - `range_set`: sorted disjoint range list and linear merge
//!
//! - [`replay`]: observer traits, the miner observer, and a reference
//!   multi-threaded replay driver for recorded JSON traces
//!
//! - [`analysis`]: proximity grouping of coverage for display
//!
//! - [`export`]: JSON coverage report and terminal summary
//!
//! - [`cli`] / [`config`]: argument parsing and miner configuration
//!
//! - [`domain`]: core domain types (`Position`, `ThreadId`) and errors
//!
//! ## Guarantees
//!
//! - Coverage is exact: every byte of every recorded access is covered and
//!   nothing else is. Ranges are half-open over `u64`, so the single byte at
//!   `u64::MAX` is never covered.
//! - The final coverage does not depend on worker count, scheduling, or
//!   whether merges ran inline or in the background.
//! - Coverage only grows; intermediate snapshots are subsets of the final one.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Mine exec coverage from a recorded trace
//! ./covmine trace.json
//!
//! # Data-access coverage, exported for later analysis
//! ./covmine trace.json --kinds read,write --export coverage.json
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod domain;
pub mod export;
pub mod replay;
