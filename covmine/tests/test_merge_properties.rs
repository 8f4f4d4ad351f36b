//! Algebraic properties of the coverage merge.

use std::collections::BTreeSet;
use std::sync::Arc;

use covmine::coverage::{
    coalesce, covered_bytes, is_disjoint, CompletedSegmentQueue, ProgressDrivenAggregator,
    RangeSet, SegmentData,
};
use covmine::domain::{Position, ThreadId};
use covmine_common::AddressRange;
use proptest::prelude::*;

fn ranges() -> impl Strategy<Value = Vec<AddressRange>> {
    prop::collection::vec((0u64..2048, 1u64..64), 0..48).prop_map(|accesses| {
        accesses
            .into_iter()
            .map(|(address, size)| AddressRange::from_access(address, size))
            .collect()
    })
}

fn coalesced() -> impl Strategy<Value = Vec<AddressRange>> {
    ranges().prop_map(|mut ranges| {
        coalesce(&mut ranges);
        ranges
    })
}

fn bytes(ranges: &[AddressRange]) -> BTreeSet<u64> {
    ranges.iter().flat_map(|r| r.min..r.max).collect()
}

fn merged(parts: &[&[AddressRange]]) -> RangeSet {
    let mut set = RangeSet::new();
    for part in parts {
        set.merge_sorted(part);
    }
    set
}

proptest! {
    #[test]
    fn coalesce_is_exact_and_disjoint(raw in ranges()) {
        let mut ranges = raw.clone();
        coalesce(&mut ranges);

        prop_assert!(is_disjoint(&ranges));
        prop_assert_eq!(bytes(&ranges), bytes(&raw));
        prop_assert_eq!(covered_bytes(&ranges), bytes(&raw).len() as u64);
    }

    #[test]
    fn merge_is_commutative(a in coalesced(), b in coalesced()) {
        let ab = merged(&[&a, &b]);
        let ba = merged(&[&b, &a]);
        prop_assert_eq!(ab.as_slice(), ba.as_slice());
    }

    #[test]
    fn merge_is_idempotent(a in coalesced(), b in coalesced()) {
        let once = merged(&[&a, &b]);
        let twice = merged(&[&a, &b, &b, &a]);
        prop_assert_eq!(once.as_slice(), twice.as_slice());
    }

    #[test]
    fn merge_is_exact_union(a in coalesced(), b in coalesced(), c in coalesced()) {
        let set = merged(&[&a, &b, &c]);

        prop_assert!(is_disjoint(set.as_slice()));
        let mut expected = bytes(&a);
        expected.extend(bytes(&b));
        expected.extend(bytes(&c));
        prop_assert_eq!(bytes(set.as_slice()), expected);
    }

    #[test]
    fn coverage_never_shrinks(a in coalesced(), b in coalesced()) {
        let before = merged(&[&a]);
        let after = merged(&[&a, &b]);

        prop_assert!(after.covered_bytes() >= before.covered_bytes());
        prop_assert!(bytes(before.as_slice()).is_subset(&bytes(after.as_slice())));
    }

    #[test]
    fn aggregator_covers_exactly_the_segments_below_each_watermark(
        segments in prop::collection::vec((0u64..100, coalesced()), 0..24),
        mut watermarks in prop::collection::vec(0u64..120, 0..8),
    ) {
        let queue = Arc::new(CompletedSegmentQueue::new());
        let mut aggregator = ProgressDrivenAggregator::new(Arc::clone(&queue));
        for (index, (end, ranges)) in segments.iter().enumerate() {
            queue.push(SegmentData {
                end_position: Position(*end),
                thread_id: ThreadId(index as u32),
                ranges: ranges.clone(),
            });
        }

        watermarks.sort_unstable();
        let mut previous = 0;
        for watermark in watermarks {
            aggregator.on_progress(Position(watermark));

            let expected: BTreeSet<u64> = segments
                .iter()
                .filter(|(end, _)| *end <= watermark)
                .flat_map(|(_, ranges)| bytes(ranges))
                .collect();
            prop_assert_eq!(bytes(aggregator.coverage().as_slice()), expected);
            prop_assert!(aggregator.coverage().covered_bytes() >= previous);
            previous = aggregator.coverage().covered_bytes();
        }

        aggregator.flush();
        let all: BTreeSet<u64> = segments.iter().flat_map(|(_, ranges)| bytes(ranges)).collect();
        prop_assert_eq!(bytes(aggregator.coverage().as_slice()), all);
        prop_assert_eq!(aggregator.deferred_len(), 0);
    }
}
