//! Background merge passes with single-slot backpressure
//!
//! A merge pass can cost far more than the progress signal that triggers it.
//! Running it inline would stall the replay engine's control thread; running
//! passes with unbounded concurrency would let unmerged segments pile up.
//!
//! [`AsyncOffloadWrapper`] hands the aggregator to one long-lived merge thread
//! and feeds it watermarks over a depth-1 channel. At most one pass is ever in
//! flight: a new watermark first waits for the previous pass to report back,
//! then launches. No watermark is skipped.
//!
//! ```text
//! control thread:  progress(W1) ──send──▶ progress(W2) ──wait──┬─send──▶ ...
//! merge thread:                [ pass W1 .................... ]  [ pass W2 ...
//! ```

use std::panic;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;

use super::aggregator::PassSummary;
use super::ProgressDrivenAggregator;
use crate::domain::Position;

/// Runs [`ProgressDrivenAggregator::on_progress`] off the control thread,
/// one pass at a time.
#[derive(Debug)]
pub struct AsyncOffloadWrapper {
    /// Watermarks for the merge thread; `None` once shut down
    requests: Option<Sender<Position>>,
    completed: Receiver<PassSummary>,
    /// Returns the aggregator when the request channel closes
    worker: Option<JoinHandle<ProgressDrivenAggregator>>,
    in_flight: bool,
    last_pass: Option<PassSummary>,
    /// Number of progress signals that had to wait for a running pass
    backpressure_waits: u64,
}

impl AsyncOffloadWrapper {
    /// Start the merge thread, moving `aggregator` onto it
    #[must_use]
    pub fn new(mut aggregator: ProgressDrivenAggregator) -> Self {
        let (request_tx, request_rx) = bounded::<Position>(1);
        let (completed_tx, completed_rx) = bounded::<PassSummary>(1);

        let worker = std::thread::spawn(move || {
            for watermark in request_rx {
                let pass = aggregator.run_pass(watermark);
                if completed_tx.send(pass).is_err() {
                    break;
                }
            }
            aggregator
        });

        Self {
            requests: Some(request_tx),
            completed: completed_rx,
            worker: Some(worker),
            in_flight: false,
            last_pass: None,
            backpressure_waits: 0,
        }
    }

    /// Launch a background merge pass for `watermark`.
    ///
    /// Blocks first if the previous pass is still running.
    pub fn on_progress(&mut self, watermark: Position) {
        self.wait();
        let sent = self.requests.as_ref().is_some_and(|tx| tx.send(watermark).is_ok());
        if !sent {
            self.reraise();
        }
        self.in_flight = true;
    }

    /// Wait for the outstanding pass, then run the final drain-and-merge with
    /// the maximum watermark on the merge thread.
    pub fn flush(&mut self) -> PassSummary {
        self.on_progress(Position::MAX);
        self.collect()
    }

    /// Returns true if a background pass is currently outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight && self.completed.is_empty()
    }

    /// Most recent pass known to have completed
    #[must_use]
    pub fn last_pass(&self) -> Option<PassSummary> {
        self.last_pass
    }

    /// Number of progress signals that blocked on a previous pass
    #[must_use]
    pub fn backpressure_waits(&self) -> u64 {
        self.backpressure_waits
    }

    /// Wait for the outstanding pass (if any), stop the merge thread and
    /// return the aggregator.
    #[must_use]
    pub fn finish(mut self) -> ProgressDrivenAggregator {
        if self.in_flight {
            self.collect();
        }
        self.requests = None;
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(aggregator)) => aggregator,
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => unreachable!("merge thread is only joined once"),
        }
    }

    /// Before launching a pass: block until the in-flight one (if any)
    /// reports back.
    fn wait(&mut self) {
        if !self.in_flight {
            return;
        }
        if self.completed.is_empty() {
            self.backpressure_waits += 1;
            debug!("Waiting for previous merge pass to finish");
        }
        self.collect();
    }

    /// Receive the result of the in-flight pass.
    fn collect(&mut self) -> PassSummary {
        let pass = match self.completed.recv() {
            Ok(pass) => pass,
            Err(_) => self.reraise(),
        };
        self.in_flight = false;
        self.last_pass = Some(pass);
        pass
    }

    /// The merge thread hung up, which only happens if a pass panicked.
    /// Re-raise that panic on the caller.
    fn reraise(&mut self) -> ! {
        self.requests = None;
        match self.worker.take().map(JoinHandle::join) {
            Some(Err(payload)) => panic::resume_unwind(payload),
            _ => unreachable!("merge thread exited without panicking"),
        }
    }
}
