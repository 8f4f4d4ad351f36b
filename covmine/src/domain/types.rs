//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a thread ID where a
//! timeline position is expected, and make function signatures more expressive.

use std::fmt;

/// Timeline position inside a replayed trace
///
/// Opaque and totally ordered. The replay engine hands these out as segment
/// end markers and as progress watermarks; the miner only ever compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position(pub u64);

impl Position {
    /// Smallest possible position
    pub const MIN: Position = Position(0);

    /// Largest possible position, used for the end-of-stream flush
    pub const MAX: Position = Position(u64::MAX);
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Position::MAX {
            write!(f, "POS:end")
        } else {
            write!(f, "POS:{}", self.0)
        }
    }
}

impl From<u64> for Position {
    fn from(pos: u64) -> Self {
        Position(pos)
    }
}

/// Replayed thread ID
///
/// Identifies the thread of the *recorded* program, not the OS thread the
/// miner's worker runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

impl From<u32> for ThreadId {
    fn from(tid: u32) -> Self {
        ThreadId(tid)
    }
}
