//! Completeness watermark tracking for the replay driver
//!
//! Segments finish out of order across worker threads. The watermark is the
//! highest position `W` such that every segment ending at or before `W` has
//! finished. It only ever moves forward.

use std::collections::BTreeMap;

use crate::domain::Position;

/// Tracks outstanding segment end positions.
#[derive(Debug, Default)]
pub struct WatermarkTracker {
    /// End position → number of unfinished segments ending there
    outstanding: BTreeMap<Position, usize>,
    /// Largest end position of any registered segment
    last: Option<Position>,
    watermark: Option<Position>,
}

impl WatermarkTracker {
    /// Register every segment that will be replayed.
    pub fn new(ends: impl IntoIterator<Item = Position>) -> Self {
        let mut tracker = Self::default();
        for end in ends {
            *tracker.outstanding.entry(end).or_insert(0) += 1;
            tracker.last = Some(tracker.last.map_or(end, |last| last.max(end)));
        }
        tracker
    }

    /// Mark one segment ending at `end` as finished.
    ///
    /// Returns the new watermark if it advanced.
    pub fn complete(&mut self, end: Position) -> Option<Position> {
        if let Some(count) = self.outstanding.get_mut(&end) {
            *count -= 1;
            if *count == 0 {
                self.outstanding.remove(&end);
            }
        }

        let candidate = match self.outstanding.first_key_value() {
            // Everything strictly before the first unfinished end is complete
            Some((first, _)) => first.0.checked_sub(1).map(Position),
            None => self.last,
        };

        match (candidate, self.watermark) {
            (Some(new), Some(old)) if new <= old => None,
            (Some(new), _) => {
                self.watermark = Some(new);
                Some(new)
            }
            (None, _) => None,
        }
    }

    /// Current watermark, if any segment prefix has completed
    #[must_use]
    pub fn watermark(&self) -> Option<Position> {
        self.watermark
    }

    /// Number of segments not yet finished
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(ends: &[u64]) -> WatermarkTracker {
        WatermarkTracker::new(ends.iter().copied().map(Position))
    }

    #[test]
    fn test_watermark_waits_for_earliest_segment() {
        let mut t = tracker(&[10, 20, 30]);

        assert_eq!(t.complete(Position(20)), Some(Position(9)));
        assert_eq!(t.complete(Position(30)), None);
        assert_eq!(t.complete(Position(10)), Some(Position(30)));
        assert_eq!(t.outstanding(), 0);
    }

    #[test]
    fn test_watermark_never_covers_unfinished_segment() {
        let mut t = tracker(&[5, 5, 8]);

        assert_eq!(t.complete(Position(5)), Some(Position(4)));
        assert_eq!(t.complete(Position(8)), None);
        assert_eq!(t.watermark(), Some(Position(4)));
        assert_eq!(t.complete(Position(5)), Some(Position(8)));
    }

    #[test]
    fn test_segment_ending_at_zero_blocks_everything() {
        let mut t = tracker(&[0, 3]);

        assert_eq!(t.complete(Position(3)), None);
        assert_eq!(t.complete(Position(0)), Some(Position(3)));
    }
}
