//! Reference replay driver
//!
//! Replays a recorded [`Trace`] on a pool of worker threads and drives the
//! observer callbacks with the same guarantees a production replay engine
//! gives:
//!
//! - every access of a segment is delivered on one worker, in order, followed
//!   by exactly one `on_segment_end`
//! - `on_progress(W)` is only issued once every segment ending at or before
//!   `W` has returned from `on_segment_end`
//! - `on_stream_end` is issued once, after every worker has exited
//!
//! ```text
//!  control thread                        workers
//!  ──────────────                        ───────
//!  work_tx ── segment index ───────────▶ thread_context()
//!                                        on_access() × n
//!                                        on_segment_end()
//!  done_rx ◀── segment end ──────────────┘
//!  WatermarkTracker::complete()
//!  on_progress(W)
//!  ...
//!  join, on_stream_end(last)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};

use super::observer::{AccessObserver, Flow, ProgressObserver, SegmentInfo};
use super::trace::{Trace, TraceSegment};
use super::watermark::WatermarkTracker;
use crate::domain::{Position, ReplayError};

/// Outcome of one replay run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Segments whose `on_segment_end` was delivered
    pub segments_replayed: usize,
    /// Access callbacks delivered
    pub accesses_replayed: u64,
    /// Progress signals issued
    pub progress_signals: usize,
    /// An observer returned [`Flow::Stop`]
    pub stopped: bool,
    /// Final position passed to `on_stream_end`
    pub last_position: Position,
}

/// Multi-threaded trace replayer
#[derive(Debug, Clone, Copy)]
pub struct ReplayDriver {
    workers: usize,
}

impl ReplayDriver {
    /// Create a driver replaying on `workers` threads.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Number of worker threads
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Replay `trace`, delivering accesses to `access` and progress to
    /// `progress`.
    ///
    /// # Errors
    /// Returns [`ReplayError::NoWorkers`] for a zero-sized pool and
    /// [`ReplayError::WorkerPanicked`] if an observer panicked on a worker.
    /// `on_stream_end` is not issued when a worker panicked.
    pub fn run<A, P>(
        &self,
        trace: &Trace,
        access: &A,
        progress: &mut P,
    ) -> Result<ReplaySummary, ReplayError>
    where
        A: AccessObserver,
        P: ProgressObserver,
    {
        if self.workers == 0 {
            return Err(ReplayError::NoWorkers);
        }

        let mut tracker = WatermarkTracker::new(trace.segments.iter().map(TraceSegment::end));
        let (work_tx, work_rx) = unbounded::<usize>();
        let (done_tx, done_rx) = unbounded::<(Position, u64)>();

        // Dispatch in end-position order so the watermark advances steadily
        let mut order: Vec<usize> = (0..trace.segments.len()).collect();
        order.sort_by_key(|&index| trace.segments[index].end_position);
        for index in order {
            // Receiver outlives this loop
            let _ = work_tx.send(index);
        }
        drop(work_tx);

        let stop = AtomicBool::new(false);
        let mut summary = ReplaySummary::default();

        info!(
            "Replaying {} segments on {} workers",
            trace.segments.len(),
            self.workers
        );

        let panicked = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.workers)
                .map(|_| {
                    let work_rx = work_rx.clone();
                    let done_tx = done_tx.clone();
                    let stop = &stop;
                    scope.spawn(move || replay_worker(trace, access, &work_rx, &done_tx, stop))
                })
                .collect();
            drop(done_tx);

            // Ends once every worker has dropped its sender
            for (end, accesses) in &done_rx {
                summary.segments_replayed += 1;
                summary.accesses_replayed += accesses;
                if let Some(watermark) = tracker.complete(end) {
                    debug!("Watermark advanced to {watermark}");
                    progress.on_progress(watermark);
                    summary.progress_signals += 1;
                }
            }

            let mut panicked = None;
            for (index, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() && panicked.is_none() {
                    panicked = Some(index);
                }
            }
            panicked
        });

        if let Some(worker) = panicked {
            return Err(ReplayError::WorkerPanicked(worker));
        }

        summary.stopped = stop.load(Ordering::Relaxed);
        if summary.stopped {
            warn!(
                "Replay stopped early, {} segments never dispatched",
                tracker.outstanding()
            );
        }

        summary.last_position = trace.last_position();
        progress.on_stream_end(summary.last_position);

        info!(
            "Replay finished: {} segments, {} accesses, {} progress signals",
            summary.segments_replayed, summary.accesses_replayed, summary.progress_signals
        );
        Ok(summary)
    }
}

fn replay_worker<A: AccessObserver>(
    trace: &Trace,
    observer: &A,
    work_rx: &Receiver<usize>,
    done_tx: &Sender<(Position, u64)>,
    stop: &AtomicBool,
) {
    let mut local = observer.thread_context();

    for index in work_rx {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let segment = &trace.segments[index];
        let mut accesses = 0u64;
        for event in segment.events() {
            accesses += 1;
            if observer.on_access(&mut local, &event) == Flow::Stop {
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }

        let info = SegmentInfo {
            thread: segment.thread_id(),
            start: segment.start(),
            end: segment.end(),
        };
        observer.on_segment_end(&mut local, &info);

        if done_tx.send((info.end, accesses)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::trace::TraceAccess;
    use covmine_common::AccessEvent;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        ended: Mutex<Vec<Position>>,
        stop_after: Option<usize>,
        seen: AtomicUsize,
    }

    impl AccessObserver for Recorder {
        type Local = usize;

        fn thread_context(&self) -> usize {
            0
        }

        fn on_access(&self, local: &mut usize, _event: &AccessEvent) -> Flow {
            *local += 1;
            let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
            match self.stop_after {
                Some(limit) if seen >= limit => Flow::Stop,
                _ => Flow::Continue,
            }
        }

        fn on_segment_end(&self, _local: &mut usize, segment: &SegmentInfo) {
            self.ended.lock().unwrap().push(segment.end);
        }
    }

    /// Checks every watermark against the segments finished so far
    struct Checker<'a> {
        recorder: &'a Recorder,
        ends: Vec<Position>,
        watermarks: Vec<Position>,
        stream_end: Option<Position>,
    }

    impl ProgressObserver for Checker<'_> {
        fn on_progress(&mut self, watermark: Position) {
            let finished = self.recorder.ended.lock().unwrap().clone();
            for end in self.ends.iter().filter(|end| **end <= watermark) {
                assert!(finished.contains(end), "{end} not finished before {watermark}");
            }
            if let Some(last) = self.watermarks.last() {
                assert!(*last < watermark);
            }
            self.watermarks.push(watermark);
        }

        fn on_stream_end(&mut self, last_position: Position) {
            assert!(self.stream_end.is_none());
            self.stream_end = Some(last_position);
        }
    }

    fn trace(segments: usize, accesses: usize) -> Trace {
        Trace {
            segments: (0..segments)
                .map(|i| TraceSegment {
                    thread: (i % 3) as u32,
                    start_position: (i * 100) as u64,
                    end_position: (i * 100 + 99) as u64,
                    accesses: (0..accesses)
                        .map(|a| TraceAccess {
                            address: (a * 8) as u64,
                            size: 4,
                            kind: crate::replay::AccessKind::Exec,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_rejects_empty_pool() {
        let recorder = Recorder::default();
        let mut checker =
            Checker { recorder: &recorder, ends: vec![], watermarks: vec![], stream_end: None };
        let err = ReplayDriver::new(0).run(&trace(1, 1), &recorder, &mut checker).unwrap_err();
        assert!(matches!(err, ReplayError::NoWorkers));
    }

    #[test]
    fn test_progress_respects_finished_segments() {
        let trace = trace(40, 5);
        for workers in [1, 2, 8] {
            let recorder = Recorder::default();
            let mut checker = Checker {
                recorder: &recorder,
                ends: trace.segments.iter().map(TraceSegment::end).collect(),
                watermarks: vec![],
                stream_end: None,
            };

            let summary = ReplayDriver::new(workers).run(&trace, &recorder, &mut checker).unwrap();

            assert_eq!(summary.segments_replayed, 40);
            assert_eq!(summary.accesses_replayed, 200);
            assert!(!summary.stopped);
            assert_eq!(checker.watermarks.last(), Some(&Position(3999)));
            assert_eq!(checker.stream_end, Some(Position(3999)));
        }
    }

    #[test]
    fn test_stop_ends_current_segment_and_stream() {
        let trace = trace(10, 10);
        let recorder = Recorder { stop_after: Some(3), ..Default::default() };
        let mut checker = Checker {
            recorder: &recorder,
            ends: trace.segments.iter().map(TraceSegment::end).collect(),
            watermarks: vec![],
            stream_end: None,
        };

        let summary = ReplayDriver::new(1).run(&trace, &recorder, &mut checker).unwrap();

        assert!(summary.stopped);
        assert_eq!(summary.segments_replayed, 1);
        assert_eq!(summary.accesses_replayed, 3);
        assert_eq!(recorder.ended.lock().unwrap().len(), 1);
        assert_eq!(checker.stream_end, Some(Position(999)));
    }

    #[test]
    fn test_empty_trace_still_ends_stream() {
        let recorder = Recorder::default();
        let mut checker =
            Checker { recorder: &recorder, ends: vec![], watermarks: vec![], stream_end: None };

        let summary = ReplayDriver::new(4).run(&Trace::default(), &recorder, &mut checker).unwrap();

        assert_eq!(summary.segments_replayed, 0);
        assert_eq!(checker.stream_end, Some(Position::MIN));
    }
}
