//! Interval index over the segments of an address space.
//!
//! Entries are kept sorted by `low` and viewed as an implicit balanced
//! binary tree (the middle element of every sub-slice is its root). Each
//! node records the largest `high` in its subtree, so overlap queries can
//! skip whole subtrees and run in O(log n + k). The index is immutable once
//! built; the insert path replaces it wholesale.

use crate::{Segment, SegmentHandle};

/// One indexed segment: `[low, high)` in wide address arithmetic.
///
/// `high` is one past the last byte. Overlap probes treat it as inclusive,
/// so a segment ending right before a probe point is still reported there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalEntry {
    pub low: u128,
    pub high: u128,
    pub handle: SegmentHandle,
}

impl IntervalEntry {
    pub fn for_segment(segment: &Segment, handle: SegmentHandle) -> Self {
        Self {
            low: segment.start_wide(),
            high: segment.end_exclusive(),
            handle,
        }
    }

    /// True if the entry stores a byte at `addr`.
    pub fn covers(&self, addr: u128) -> bool {
        self.low <= addr && addr < self.high
    }
}

#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    entries: Vec<IntervalEntry>,
    max_high: Vec<u128>,
}

impl SegmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh index. Entries must be pairwise non-overlapping and
    /// non-adjacent.
    pub fn build(mut entries: Vec<IntervalEntry>) -> Self {
        entries.sort_by_key(|e| e.low);
        debug_assert!(
            entries.windows(2).all(|w| w[0].high < w[1].low),
            "segment index entries overlap or touch"
        );

        let mut max_high = vec![0; entries.len()];
        fill_max_high(&entries, &mut max_high, 0, entries.len());
        Self { entries, max_high }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in ascending address order.
    pub fn entries(&self) -> &[IntervalEntry] {
        &self.entries
    }

    pub fn visit_all(&self, mut f: impl FnMut(&IntervalEntry)) {
        for entry in &self.entries {
            f(entry);
        }
    }

    /// Entries with `entry.low <= high && entry.high >= low`, ascending.
    pub fn find_overlapping(&self, low: u128, high: u128) -> Vec<IntervalEntry> {
        let mut out = Vec::new();
        self.collect_overlapping(0, self.entries.len(), low, high, &mut out);
        out
    }

    fn collect_overlapping(
        &self,
        start: usize,
        end: usize,
        low: u128,
        high: u128,
        out: &mut Vec<IntervalEntry>,
    ) {
        if start >= end {
            return;
        }
        let mid = start + (end - start) / 2;
        if self.max_high[mid] < low {
            return;
        }

        self.collect_overlapping(start, mid, low, high, out);

        let entry = self.entries[mid];
        if entry.low <= high {
            if entry.high >= low {
                out.push(entry);
            }
            self.collect_overlapping(mid + 1, end, low, high, out);
        }
    }

    /// Entries whose bytes all lie inside `low..=high_inclusive`.
    pub fn find_contained(&self, low: u128, high_inclusive: u128) -> Vec<IntervalEntry> {
        let first = self.entries.partition_point(|e| e.low < low);
        self.entries[first..]
            .iter()
            .take_while(|e| e.low <= high_inclusive)
            .filter(|e| e.high <= high_inclusive + 1)
            .copied()
            .collect()
    }

    /// The single entry storing a byte at `addr`.
    ///
    /// Panics if more than one entry covers `addr`: the partition is broken
    /// and nothing built on it can be trusted.
    pub fn find_covering(&self, addr: u128) -> Option<IntervalEntry> {
        let mut hits = self
            .find_overlapping(addr, addr)
            .into_iter()
            .filter(|e| e.covers(addr));
        let first = hits.next()?;
        if let Some(second) = hits.next() {
            panic!(
                "segment index corrupted: {:#X}..{:#X} and {:#X}..{:#X} both cover {addr:#X}",
                first.low, first.high, second.low, second.high
            );
        }
        Some(first)
    }

    /// Closest entry starting at or below `addr`.
    pub fn lower_neighbor(&self, addr: u128) -> Option<IntervalEntry> {
        let idx = self.entries.partition_point(|e| e.low <= addr);
        idx.checked_sub(1).map(|i| self.entries[i])
    }

    /// Closest entry starting above `addr`.
    pub fn upper_neighbor(&self, addr: u128) -> Option<IntervalEntry> {
        let idx = self.entries.partition_point(|e| e.low <= addr);
        self.entries.get(idx).copied()
    }
}

fn fill_max_high(
    entries: &[IntervalEntry],
    max_high: &mut [u128],
    start: usize,
    end: usize,
) -> u128 {
    if start >= end {
        return 0;
    }
    let mid = start + (end - start) / 2;
    let left = fill_max_high(entries, max_high, start, mid);
    let right = fill_max_high(entries, max_high, mid + 1, end);
    let max = entries[mid].high.max(left).max(right);
    max_high[mid] = max;
    max
}
