//! Recorded trace input for the reference replay driver
//!
//! A trace file is a JSON document listing replay segments. Each segment is a
//! contiguous run of accesses by one replayed thread:
//!
//! ```json
//! {
//!   "segments": [
//!     {
//!       "thread": 0,
//!       "start_position": 0,
//!       "end_position": 120,
//!       "accesses": [
//!         { "address": 4096, "size": 4 },
//!         { "address": 8192, "size": 8, "kind": "read" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `kind` defaults to `exec`, `size` defaults to 1 and `start_position`
//! defaults to 0.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use covmine_common::{AccessEvent, ACCESS_EXECUTE, ACCESS_READ, ACCESS_WRITE};
use log::info;
use serde::{Deserialize, Serialize};

use crate::domain::{Position, ThreadId, TraceError};

/// Kind of access recorded in a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    #[default]
    Exec,
    Read,
    Write,
}

impl AccessKind {
    /// Raw `ACCESS_*` value carried in [`AccessEvent::kind`]
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            AccessKind::Exec => ACCESS_EXECUTE,
            AccessKind::Read => ACCESS_READ,
            AccessKind::Write => ACCESS_WRITE,
        }
    }
}

impl FromStr for AccessKind {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exec" | "execute" | "x" => Ok(AccessKind::Exec),
            "read" | "r" => Ok(AccessKind::Read),
            "write" | "w" => Ok(AccessKind::Write),
            other => Err(TraceError::UnknownAccessKind(other.to_string())),
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessKind::Exec => "exec",
            AccessKind::Read => "read",
            AccessKind::Write => "write",
        };
        f.write_str(name)
    }
}

fn default_size() -> u64 {
    1
}

/// One recorded access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceAccess {
    pub address: u64,
    #[serde(default = "default_size")]
    pub size: u64,
    #[serde(default)]
    pub kind: AccessKind,
}

/// One recorded replay segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSegment {
    pub thread: u32,
    #[serde(default)]
    pub start_position: u64,
    pub end_position: u64,
    #[serde(default)]
    pub accesses: Vec<TraceAccess>,
}

impl TraceSegment {
    /// Replayed thread of this segment
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        ThreadId(self.thread)
    }

    /// Position of the last event
    #[must_use]
    pub fn end(&self) -> Position {
        Position(self.end_position)
    }

    /// Position of the first event
    #[must_use]
    pub fn start(&self) -> Position {
        Position(self.start_position)
    }

    /// Access events of this segment in replay order.
    ///
    /// Positions advance by one per access from `start_position` and are
    /// clamped to `end_position`.
    pub fn events(&self) -> impl Iterator<Item = AccessEvent> + '_ {
        self.accesses.iter().enumerate().map(|(index, access)| AccessEvent {
            address: access.address,
            size: access.size,
            position: self.start_position.saturating_add(index as u64).min(self.end_position),
            thread: self.thread,
            kind: access.kind.as_raw(),
        })
    }
}

/// A recorded multi-threaded trace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub segments: Vec<TraceSegment>,
}

impl Trace {
    /// Load and validate a trace file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or a
    /// segment ends before it starts.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let trace = Self::from_json(&content)?;
        info!(
            "Loaded trace {}: {} segments, {} accesses",
            path.as_ref().display(),
            trace.segments.len(),
            trace.access_count()
        );
        Ok(trace)
    }

    /// Parse and validate a trace from a JSON string
    ///
    /// # Errors
    /// Returns an error on malformed JSON or invalid segment bounds.
    pub fn from_json(json: &str) -> Result<Self, TraceError> {
        let trace: Trace = serde_json::from_str(json)?;
        trace.validate()?;
        Ok(trace)
    }

    fn validate(&self) -> Result<(), TraceError> {
        if let Some(segment) = self.segments.iter().find(|s| s.end_position < s.start_position) {
            return Err(TraceError::InvalidSegmentBounds {
                thread: segment.thread_id(),
                start: segment.start(),
                end: segment.end(),
            });
        }
        Ok(())
    }

    /// Final position of the trace (the replay engine's "last position")
    #[must_use]
    pub fn last_position(&self) -> Position {
        self.segments.iter().map(TraceSegment::end).max().unwrap_or(Position::MIN)
    }

    /// Total number of recorded accesses
    #[must_use]
    pub fn access_count(&self) -> usize {
        self.segments.iter().map(|s| s.accesses.len()).sum()
    }
}
