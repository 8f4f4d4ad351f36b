//! Disjoint interval sets
//!
//! Two merge primitives back the whole engine:
//!
//! - [`coalesce`] turns an unsorted buffer of ranges into a sorted, disjoint
//!   list in place (used by collectors and segment finalization).
//! - [`RangeSet::merge_sorted`] folds an already coalesced list into the
//!   global set with a single forward cursor (used by the aggregator).
//!
//! Both treat touching ranges (`a.max == b.min`) as overlapping, so a merged
//! collection never contains two ranges that could be combined.

use covmine_common::AddressRange;

/// Sort, deduplicate and merge `ranges` in place.
///
/// After the call `ranges` is sorted ascending by `min` and disjoint. The
/// backing allocation is left untouched; callers that hand the result off
/// shrink it themselves.
///
/// # Performance
///
/// O(n log n) for the sort, then a single O(n) forward pass.
pub fn coalesce(ranges: &mut Vec<AddressRange>) {
    if ranges.len() < 2 {
        return;
    }

    ranges.sort_unstable();
    ranges.dedup();

    let mut write = 0;
    for read in 1..ranges.len() {
        let next = ranges[read];
        let running = &mut ranges[write];
        if running.touches(&next) {
            running.max = running.max.max(next.max);
        } else {
            write += 1;
            ranges[write] = next;
        }
    }
    ranges.truncate(write + 1);
}

/// Total number of bytes covered by a disjoint list.
#[must_use]
pub fn covered_bytes(ranges: &[AddressRange]) -> u64 {
    ranges.iter().map(AddressRange::len).sum()
}

/// Returns true if `ranges` is sorted and no two neighbours overlap or touch.
#[must_use]
pub fn is_disjoint(ranges: &[AddressRange]) -> bool {
    ranges.iter().all(|r| r.min <= r.max) && ranges.windows(2).all(|w| w[0].max < w[1].min)
}

/// Sorted, disjoint, growing set of address ranges.
///
/// This is the global coverage the aggregator maintains. Ranges are only ever
/// added or extended, so [`RangeSet::covered_bytes`] never decreases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<AddressRange>,
    /// Output buffer reused across merges to avoid reallocating per segment
    scratch: Vec<AddressRange>,
}

impl RangeSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sorted, disjoint list into the set.
    ///
    /// Walks a cursor through the existing ranges exactly once:
    ///
    /// 1. Existing ranges ending strictly below the incoming range are copied
    ///    through unchanged.
    /// 2. The incoming range is appended, joining the previous output range if
    ///    they overlap or touch.
    /// 3. Existing ranges that now overlap or touch the output tail are absorbed
    ///    into it (the tail grows to the union).
    ///
    /// The cursor never rewinds, so the cost is linear in
    /// `self.len() + incoming.len()`.
    ///
    /// `incoming` must already be coalesced (see [`coalesce`]).
    pub fn merge_sorted(&mut self, incoming: &[AddressRange]) {
        if incoming.is_empty() {
            return;
        }
        debug_assert!(is_disjoint(incoming), "incoming ranges must be coalesced");

        let mut merged = std::mem::take(&mut self.scratch);
        merged.clear();
        merged.reserve(self.ranges.len() + incoming.len());

        let mut cursor = self.ranges.iter().copied().peekable();
        for &range in incoming {
            while let Some(existing) = cursor.next_if(|g| g.max < range.min) {
                push_coalesced(&mut merged, existing);
            }

            push_coalesced(&mut merged, range);

            // Tail is non-empty: we just pushed into it
            if let Some(tail) = merged.last_mut() {
                while let Some(existing) = cursor.next_if(|g| tail.touches(g)) {
                    tail.min = tail.min.min(existing.min);
                    tail.max = tail.max.max(existing.max);
                }
            }
        }
        merged.extend(cursor);

        self.scratch = std::mem::replace(&mut self.ranges, merged);
    }

    /// Ranges in ascending order
    #[must_use]
    pub fn as_slice(&self) -> &[AddressRange] {
        &self.ranges
    }

    /// Number of disjoint ranges
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if nothing has been covered yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of bytes covered
    #[must_use]
    pub fn covered_bytes(&self) -> u64 {
        covered_bytes(&self.ranges)
    }

    /// Consume the set, returning the ranges
    #[must_use]
    pub fn into_vec(self) -> Vec<AddressRange> {
        self.ranges
    }
}

impl From<Vec<AddressRange>> for RangeSet {
    fn from(mut ranges: Vec<AddressRange>) -> Self {
        coalesce(&mut ranges);
        Self { ranges, scratch: Vec::new() }
    }
}

/// Append `range`, extending the last entry instead when they overlap or touch.
fn push_coalesced(out: &mut Vec<AddressRange>, range: AddressRange) {
    match out.last_mut() {
        Some(last) if last.touches(&range) => last.max = last.max.max(range.max),
        _ => out.push(range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(min: u64, max: u64) -> AddressRange {
        AddressRange::new(min, max)
    }

    #[test]
    fn test_coalesce_touching_ranges_combine() {
        let mut ranges = vec![r(20, 30), r(10, 20)];
        coalesce(&mut ranges);
        assert_eq!(ranges, vec![r(10, 30)]);
    }

    #[test]
    fn test_coalesce_removes_duplicates_and_nested() {
        let mut ranges = vec![r(5, 6), r(0, 100), r(5, 6), r(200, 210), r(50, 60)];
        coalesce(&mut ranges);
        assert_eq!(ranges, vec![r(0, 100), r(200, 210)]);
    }

    #[test]
    fn test_coalesce_keeps_gaps() {
        let mut ranges = vec![r(30, 40), r(0, 10), r(11, 20)];
        coalesce(&mut ranges);
        assert_eq!(ranges, vec![r(0, 10), r(11, 20), r(30, 40)]);
    }

    #[test]
    fn test_coalesce_is_idempotent() {
        let mut ranges = vec![r(0, 10), r(11, 20), r(30, 40)];
        let before = ranges.clone();
        coalesce(&mut ranges);
        assert_eq!(ranges, before);
    }

    #[test]
    fn test_merge_bridges_and_absorbs() {
        let mut set = RangeSet::from(vec![r(0, 10), r(50, 60)]);
        set.merge_sorted(&[r(5, 55)]);
        assert_eq!(set.as_slice(), &[r(0, 60)]);
    }

    #[test]
    fn test_merge_inserts_disjoint_ranges_in_order() {
        let mut set = RangeSet::from(vec![r(100, 110), r(300, 310)]);
        set.merge_sorted(&[r(0, 10), r(200, 210), r(400, 410)]);
        assert_eq!(
            set.as_slice(),
            &[r(0, 10), r(100, 110), r(200, 210), r(300, 310), r(400, 410)]
        );
    }

    #[test]
    fn test_merge_touching_global_range_extends_it() {
        let mut set = RangeSet::from(vec![r(10, 20)]);
        set.merge_sorted(&[r(20, 25)]);
        set.merge_sorted(&[r(5, 10)]);
        assert_eq!(set.as_slice(), &[r(5, 25)]);
    }

    #[test]
    fn test_merge_existing_range_overlapping_from_left() {
        let mut set = RangeSet::from(vec![r(0, 50)]);
        set.merge_sorted(&[r(40, 60), r(70, 80)]);
        assert_eq!(set.as_slice(), &[r(0, 60), r(70, 80)]);
    }

    #[test]
    fn test_merge_incoming_tail_grown_past_next_incoming() {
        // First incoming range absorbs [12,40), which swallows the second incoming range
        let mut set = RangeSet::from(vec![r(12, 40)]);
        set.merge_sorted(&[r(10, 15), r(20, 25), r(41, 45)]);
        assert_eq!(set.as_slice(), &[r(10, 40), r(41, 45)]);
    }

    #[test]
    fn test_merge_into_empty_set() {
        let mut set = RangeSet::new();
        set.merge_sorted(&[r(1, 2), r(4, 8)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.covered_bytes(), 5);
    }

    #[test]
    fn test_is_disjoint_rejects_touching() {
        assert!(is_disjoint(&[r(0, 10), r(11, 20)]));
        assert!(!is_disjoint(&[r(0, 10), r(10, 20)]));
        assert!(!is_disjoint(&[r(11, 20), r(0, 10)]));
    }
}
