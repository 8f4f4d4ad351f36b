//! Structured error types for covmine
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! The aggregation core itself has no error paths; these cover trace loading,
//! the replay driver and report export.

use super::types::{Position, ThreadId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Segment of {thread} ends at {end} before it starts at {start}")]
    InvalidSegmentBounds { thread: ThreadId, start: Position, end: Position },

    #[error("Unknown access kind \"{0}\" (expected exec, read or write)")]
    UnknownAccessKind(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Replay worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("Replay needs at least one worker thread")]
    NoWorkers,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_bounds_error_display() {
        let err = TraceError::InvalidSegmentBounds {
            thread: ThreadId(3),
            start: Position(100),
            end: Position(50),
        };
        assert_eq!(err.to_string(), "Segment of TID:3 ends at POS:50 before it starts at POS:100");
    }

    #[test]
    fn test_unknown_kind_error() {
        let err = TraceError::UnknownAccessKind("fetch".to_string());
        assert!(err.to_string().contains("fetch"));
        assert!(err.to_string().contains("exec"));
    }

    #[test]
    fn test_worker_panicked_display() {
        assert_eq!(ReplayError::WorkerPanicked(2).to_string(), "Replay worker 2 panicked");
    }
}
