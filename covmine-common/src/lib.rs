//! # Shared Data Structures (Replay Engine ↔ Coverage Miner)
//!
//! Defines plain data types and constants shared between a replay engine that
//! emits access events and the `covmine` aggregation engine that consumes them.
//! Event types use `#[repr(C)]` so an engine written against a C ABI can hand
//! them over without conversion.
//!
//! ## Key Types
//!
//! - [`AddressRange`] - Half-open `[min, max)` interval over the 64-bit address space
//! - [`AccessEvent`] - One observed instruction fetch or memory access
//!
//! ## Access Kinds
//!
//! Every event carries one of the `ACCESS_*` constants. The miner can be told
//! to record only a subset of kinds (e.g. code coverage only).

#![no_std]

// ============================================================================
// Access Kind Constants
// ============================================================================

/// **Code Coverage**: instruction fetched and executed at `address`
pub const ACCESS_EXECUTE: u32 = 1;

/// **Data Coverage**: memory read of `size` bytes at `address`
pub const ACCESS_READ: u32 = 2;

/// **Data Coverage**: memory write of `size` bytes at `address`
pub const ACCESS_WRITE: u32 = 3;

/// Bit mask with one bit per access kind, used for kind filtering.
///
/// Returns 0 for unknown kinds so they never pass a filter.
#[must_use]
pub const fn kind_mask(kind: u32) -> u8 {
    match kind {
        ACCESS_EXECUTE => 0b001,
        ACCESS_READ => 0b010,
        ACCESS_WRITE => 0b100,
        _ => 0,
    }
}

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Half-open address interval `[min, max)`.
///
/// Inside any merged collection the invariants are `min <= max` and that no two
/// ranges overlap or touch. Touching ranges (`a.max == b.min`) are always
/// combined into one.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressRange {
    /// First address covered
    pub min: u64,
    /// One past the last address covered
    pub max: u64,
}

impl AddressRange {
    /// Create a range from explicit bounds.
    #[must_use]
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Create the range touched by an access of `size` bytes at `address`.
    ///
    /// The end saturates at `u64::MAX` for accesses at the very top of the
    /// address space, so an access starting at `u64::MAX` yields an empty
    /// range.
    #[must_use]
    pub const fn from_access(address: u64, size: u64) -> Self {
        Self { min: address, max: address.saturating_add(size) }
    }

    /// Number of bytes covered
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.max - self.min
    }

    /// Returns true if the range covers no bytes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min == self.max
    }

    /// Returns true if the two ranges overlap or share an endpoint.
    #[must_use]
    pub const fn touches(&self, other: &Self) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

/// One access reported by the replay engine.
///
/// **Memory Layout**: `#[repr(C)]`, 32 bytes, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessEvent {
    /// Address of the first byte accessed (or instruction pointer for
    /// `ACCESS_EXECUTE`)
    pub address: u64,

    /// Number of bytes accessed (instruction length for `ACCESS_EXECUTE`)
    pub size: u64,

    /// Timeline position of the access inside the replayed trace
    ///
    /// Monotonic per thread. The miner never orders events by it; it is
    /// carried for observers that want it.
    pub position: u64,

    /// Replayed thread that performed the access
    pub thread: u32,

    /// Access kind (see `ACCESS_*` constants)
    pub kind: u32,
}

impl AccessEvent {
    /// Range of addresses touched by this access
    #[must_use]
    pub const fn range(&self) -> AddressRange {
        AddressRange::from_access(self.address, self.size)
    }
}
