use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, trace};

use crate::arena::SegmentArena;
use crate::config::{ConfigError, SpaceConfig};
use crate::index::{IntervalEntry, SegmentIndex};
use crate::mru::MruCache;
use crate::{LeValue, Range, Segment, SegmentHandle};

/// Widest access handled by [`AddressSpace::read_le`] / [`AddressSpace::write_le`].
const MAX_LE_BYTES: usize = 8;
/// Bytes per word for word-indexed reads.
const WORD_BYTES: u64 = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpaceError {
    #[error("access of {len} bytes at {address:#X} exceeds max address {max:#X}")]
    AddressOutOfRange { address: u64, len: usize, max: u64 },

    #[error("segment of {len} bytes at {start:#X} exceeds max address {max:#X}")]
    SegmentOutOfRange { start: u64, len: usize, max: u64 },

    #[error("byte count {requested} exceeds value width {width}")]
    InvalidByteCount { requested: usize, width: usize },

    #[error("word index {index:#X} exceeds max word index {max:#X}")]
    WordIndexOutOfRange { index: u64, max: u64 },
}

/// Counters for the lookup path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessStats {
    /// Lookups answered by the MRU segment.
    pub mru_hits: u64,
    /// Lookups answered by the segment index.
    pub index_hits: u64,
    /// Zero-filled segments created for first-touch addresses.
    pub materializations: u64,
}

/// A sparse, byte-addressable memory space.
///
/// Only ranges that were written, read, or loaded hold storage. Segments
/// never overlap or touch: every insert coalesces with whatever it meets,
/// newer bytes winning. Reads of untouched addresses return zero after
/// allocating a small segment around them.
///
/// An optional init template (itself an `AddressSpace`) holds the image
/// restored by [`reset`](Self::reset).
#[derive(Debug, Clone, Default)]
pub struct AddressSpace {
    config: SpaceConfig,
    arena: SegmentArena,
    index: SegmentIndex,
    mru: MruCache,
    init_template: Option<Box<AddressSpace>>,
    stats: AccessStats,
}

impl AddressSpace {
    pub fn new(config: SpaceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 64-bit space with the given minimum segment size.
    pub fn with_min_segment_size(size: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(SpaceConfig::default().with_min_segment_size(size)?))
    }

    /// Space whose template holds `segments`, already reset to that image.
    pub fn with_init_image(
        config: SpaceConfig,
        segments: impl IntoIterator<Item = Segment>,
    ) -> Result<Self, SpaceError> {
        let mut space = Self::new(config);
        space.load_init_image(segments)?;
        space.reset();
        Ok(space)
    }

    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    pub fn stats(&self) -> AccessStats {
        self.stats
    }

    // --- Byte access ---

    pub fn write_byte(&mut self, addr: u64, value: u8) -> Result<(), SpaceError> {
        self.check_access(addr, 1)?;
        self.store(addr, value);
        Ok(())
    }

    /// Read one byte. Untouched addresses read as zero.
    pub fn read_byte(&mut self, addr: u64) -> Result<u8, SpaceError> {
        self.check_access(addr, 1)?;
        Ok(self.load(addr))
    }

    /// Fill `buf` from `addr` onwards, materializing gaps.
    pub fn read_bytes(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), SpaceError> {
        self.check_access(addr, buf.len())?;

        let mut filled = 0;
        while filled < buf.len() {
            let current = addr + filled as u64;
            let handle = self.segment_for_address(current);
            let segment = self.resolve(handle);
            let offset = (current - segment.start_address) as usize;
            let n = (segment.len() - offset).min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&segment.data[offset..offset + n]);
            filled += n;
        }
        Ok(())
    }

    /// Write a contiguous run. Equivalent to inserting it as a segment.
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> Result<(), SpaceError> {
        self.insert_segment(addr, data.to_vec()).map(|_| ())
    }

    // --- Little-endian values ---

    /// Write the low `byte_count` bytes of `value`, least significant first.
    pub fn write_le(&mut self, addr: u64, value: u64, byte_count: usize) -> Result<(), SpaceError> {
        check_byte_count(byte_count, MAX_LE_BYTES)?;
        if byte_count == 0 {
            return Ok(());
        }
        self.check_access(addr, byte_count)?;
        for i in 0..byte_count {
            self.store(addr + i as u64, (value >> (8 * i)) as u8);
        }
        Ok(())
    }

    /// Read `byte_count` bytes as a little-endian integer, zero-extended.
    pub fn read_le(&mut self, addr: u64, byte_count: usize) -> Result<u64, SpaceError> {
        check_byte_count(byte_count, MAX_LE_BYTES)?;
        if byte_count == 0 {
            return Ok(0);
        }
        self.check_access(addr, byte_count)?;
        let mut value = 0u64;
        for i in 0..byte_count {
            value |= (self.load(addr + i as u64) as u64) << (8 * i);
        }
        Ok(value)
    }

    pub fn write_value<T: LeValue>(&mut self, addr: u64, value: T) -> Result<(), SpaceError> {
        self.write_le(addr, value.to_le_u64(), T::WIDTH)
    }

    pub fn write_value_sized<T: LeValue>(
        &mut self,
        addr: u64,
        value: T,
        byte_count: usize,
    ) -> Result<(), SpaceError> {
        check_byte_count(byte_count, T::WIDTH)?;
        self.write_le(addr, value.to_le_u64(), byte_count)
    }

    pub fn read_value<T: LeValue>(&mut self, addr: u64) -> Result<T, SpaceError> {
        self.read_le(addr, T::WIDTH).map(T::from_le_u64)
    }

    pub fn read_value_sized<T: LeValue>(
        &mut self,
        addr: u64,
        byte_count: usize,
    ) -> Result<T, SpaceError> {
        check_byte_count(byte_count, T::WIDTH)?;
        self.read_le(addr, byte_count).map(T::from_le_u64)
    }

    /// [`read_le`](Self::read_le) addressed by 32-bit word index instead of byte.
    pub fn read_le_word_indexed(
        &mut self,
        index: u64,
        byte_count: usize,
    ) -> Result<u64, SpaceError> {
        let addr = self.word_address(index)?;
        self.read_le(addr, byte_count)
    }

    fn word_address(&self, index: u64) -> Result<u64, SpaceError> {
        let max = self.config.max_address();
        index
            .checked_mul(WORD_BYTES)
            .filter(|&addr| addr <= max)
            .ok_or(SpaceError::WordIndexOutOfRange {
                index,
                max: max / WORD_BYTES,
            })
    }

    // --- Non-mutating probes ---

    /// Byte at `addr` if some segment stores it. Never allocates.
    pub fn peek_byte(&self, addr: u64) -> Option<u8> {
        let handle = self.contains(addr)?;
        self.arena.get(handle)?.byte_at(addr)
    }

    /// Like [`read_le`](Self::read_le) without allocating; missing bytes read as zero.
    pub fn peek_le(&self, addr: u64, byte_count: usize) -> Result<u64, SpaceError> {
        check_byte_count(byte_count, MAX_LE_BYTES)?;
        if byte_count == 0 {
            return Ok(0);
        }
        self.check_access(addr, byte_count)?;
        Ok((0..byte_count).fold(0u64, |value, i| {
            let byte = self.peek_byte(addr + i as u64).unwrap_or(0);
            value | ((byte as u64) << (8 * i))
        }))
    }

    pub fn peek_le_word_indexed(&self, index: u64, byte_count: usize) -> Result<u64, SpaceError> {
        self.peek_le(self.word_address(index)?, byte_count)
    }

    /// Handle of the segment storing `addr`, if any.
    pub fn contains(&self, addr: u64) -> Option<SegmentHandle> {
        if let Some(handle) = self.mru.get() {
            if self.arena.get(handle).is_some_and(|s| s.contains(addr)) {
                return Some(handle);
            }
        }
        self.index
            .find_covering(addr as u128)
            .map(|entry| entry.handle)
    }

    /// Resolve a handle. `None` once the segment was merged away or cleared.
    pub fn segment(&self, handle: SegmentHandle) -> Option<&Segment> {
        self.arena.get(handle)
    }

    /// Snapshot of the active segments, ordered by address.
    pub fn segments(&self) -> Vec<SegmentHandle> {
        let mut handles = Vec::with_capacity(self.index.len());
        self.index.visit_all(|entry| handles.push(entry.handle));
        handles
    }

    /// Segments storing at least one byte of `range`, ordered by address.
    pub fn segments_in(&self, range: Range) -> Vec<SegmentHandle> {
        let start = range.start() as u128;
        self.index
            .find_overlapping(start, range.end() as u128)
            .into_iter()
            .filter(|entry| entry.high > start)
            .map(|entry| entry.handle)
            .collect()
    }

    pub fn iter_segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.index
            .entries()
            .iter()
            .filter_map(|entry| self.arena.get(entry.handle))
    }

    pub fn segment_count(&self) -> usize {
        self.index.len()
    }

    /// Bytes currently backed by storage.
    pub fn resident_bytes(&self) -> usize {
        self.iter_segments().map(Segment::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // --- Insertion ---

    pub fn insert_segment(
        &mut self,
        start: u64,
        data: Vec<u8>,
    ) -> Result<Option<SegmentHandle>, SpaceError> {
        self.insert(Segment::new(start, data))
    }

    /// Insert `segment`, coalescing with every segment it overlaps or touches.
    /// Bytes of `segment` win on overlap. Empty segments are ignored.
    pub fn insert(&mut self, segment: Segment) -> Result<Option<SegmentHandle>, SpaceError> {
        if segment.is_empty() {
            return Ok(None);
        }
        if segment.end_exclusive() > self.config.address_width().limit() {
            return Err(SpaceError::SegmentOutOfRange {
                start: segment.start_address,
                len: segment.len(),
                max: self.config.max_address(),
            });
        }
        Ok(Some(self.insert_resolved(segment)))
    }

    fn insert_resolved(&mut self, mut segment: Segment) -> SegmentHandle {
        let low = segment.start_wide();
        let high = segment.end_exclusive();

        let superseded: HashSet<SegmentHandle> = self
            .index
            .find_contained(low, high - 1)
            .into_iter()
            .map(|entry| entry.handle)
            .collect();

        // Anything else meeting the new range must straddle or touch one of
        // its two edges; the partition allows at most one segment per edge.
        let mut edge_hits: Vec<SegmentHandle> = Vec::with_capacity(2);
        for edge in [low, high] {
            let hits = self.index.find_overlapping(edge, edge);
            if hits.len() > 1 {
                panic!(
                    "segment index corrupted: {} segments meet edge {edge:#X}",
                    hits.len()
                );
            }
            for hit in hits {
                if !superseded.contains(&hit.handle) && !edge_hits.contains(&hit.handle) {
                    edge_hits.push(hit.handle);
                }
            }
        }

        let mut keep: Vec<IntervalEntry> = self
            .index
            .entries()
            .iter()
            .filter(|e| !superseded.contains(&e.handle) && !edge_hits.contains(&e.handle))
            .copied()
            .collect();

        for handle in superseded {
            self.release(handle);
        }
        for handle in edge_hits {
            if let Some(older) = self.release(handle) {
                segment.absorb(older);
            }
        }

        trace!(
            start = segment.start_address,
            len = segment.len(),
            kept = keep.len(),
            "inserting segment"
        );

        let handle = self.arena.insert(segment);
        keep.push(IntervalEntry::for_segment(self.resolve(handle), handle));
        self.index = SegmentIndex::build(keep);
        debug_assert_eq!(self.arena.len(), self.index.len());
        self.mru.touch(handle);
        handle
    }

    /// Drop a segment from the arena and forget it in the MRU cache.
    fn release(&mut self, handle: SegmentHandle) -> Option<Segment> {
        self.mru.invalidate(handle);
        self.arena.remove(handle)
    }

    // --- Lookup & lazy materialization ---

    fn segment_for_address(&mut self, addr: u64) -> SegmentHandle {
        if let Some(handle) = self.lookup(addr) {
            return handle;
        }
        self.materialize(addr);
        self.lookup(addr)
            .unwrap_or_else(|| panic!("materialized segment does not cover {addr:#X}"))
    }

    fn lookup(&mut self, addr: u64) -> Option<SegmentHandle> {
        if let Some(handle) = self.mru.get() {
            if self.arena.get(handle).is_some_and(|s| s.contains(addr)) {
                self.stats.mru_hits += 1;
                return Some(handle);
            }
        }

        let entry = self.index.find_covering(addr as u128)?;
        self.stats.index_hits += 1;
        self.mru.touch(entry.handle);
        Some(entry.handle)
    }

    /// Create a zero-filled segment around an uncovered `addr`.
    ///
    /// The window is `min_segment_size` wide and centered on `addr`, pushed
    /// up past a lower neighbor and cut short at an upper neighbor or the top
    /// of the address space.
    fn materialize(&mut self, addr: u64) -> SegmentHandle {
        let addr_wide = addr as u128;
        let half = (self.config.min_segment_size() / 2) as u128;

        let (mut low, mut high) = if addr_wide >= half {
            (addr_wide - half, addr_wide + half + 1)
        } else {
            (0, addr_wide + half + 1 + (half - addr_wide))
        };

        if let Some(lower) = self.index.lower_neighbor(addr_wide) {
            if lower.high > low {
                high += lower.high - low;
                low = lower.high;
            }
        }
        if let Some(upper) = self.index.upper_neighbor(addr_wide) {
            if upper.low < high {
                high = upper.low;
            }
        }
        high = high.min(self.config.address_width().limit());

        debug_assert!(low <= addr_wide && addr_wide < high);
        let len = (high - low) as usize;
        debug!(address = addr, start = low as u64, len, "materializing segment");

        self.stats.materializations += 1;
        self.insert_resolved(Segment::zeroed(low as u64, len))
    }

    fn store(&mut self, addr: u64, value: u8) {
        let handle = self.segment_for_address(addr);
        let segment = self.resolve_mut(handle);
        let offset = (addr - segment.start_address) as usize;
        segment.data[offset] = value;
    }

    fn load(&mut self, addr: u64) -> u8 {
        let handle = self.segment_for_address(addr);
        let segment = self.resolve(handle);
        segment.data[(addr - segment.start_address) as usize]
    }

    fn resolve(&self, handle: SegmentHandle) -> &Segment {
        self.arena
            .get(handle)
            .unwrap_or_else(|| panic!("indexed segment handle {handle:?} is stale"))
    }

    fn resolve_mut(&mut self, handle: SegmentHandle) -> &mut Segment {
        self.arena
            .get_mut(handle)
            .unwrap_or_else(|| panic!("indexed segment handle {handle:?} is stale"))
    }

    fn check_access(&self, addr: u64, len: usize) -> Result<(), SpaceError> {
        let end = addr as u128 + len.max(1) as u128;
        if end > self.config.address_width().limit() {
            return Err(SpaceError::AddressOutOfRange {
                address: addr,
                len,
                max: self.config.max_address(),
            });
        }
        Ok(())
    }

    // --- Init template ---

    /// Add a segment to the image restored by [`reset`](Self::reset).
    /// Template segments coalesce with each other like active ones.
    pub fn add_init_segment(&mut self, segment: Segment) -> Result<(), SpaceError> {
        let config = self.config;
        self.init_template
            .get_or_insert_with(|| Box::new(AddressSpace::new(config)))
            .insert(segment)?;
        Ok(())
    }

    pub fn load_init_image(
        &mut self,
        segments: impl IntoIterator<Item = Segment>,
    ) -> Result<(), SpaceError> {
        for segment in segments {
            self.add_init_segment(segment)?;
        }
        Ok(())
    }

    pub fn init_template(&self) -> Option<&AddressSpace> {
        self.init_template.as_deref()
    }

    pub fn clear_init_segments(&mut self) {
        self.init_template = None;
    }

    /// Discard the active state and reload a copy of the init template.
    pub fn reset(&mut self) {
        self.clear();
        let image: Vec<Segment> = self
            .init_template
            .as_ref()
            .map(|template| template.iter_segments().cloned().collect())
            .unwrap_or_default();

        debug!(segments = image.len(), "resetting address space");
        for segment in image {
            self.insert_resolved(segment);
        }
    }

    /// Drop every active segment. The init template is kept.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.index = SegmentIndex::new();
        self.mru.clear();
    }
}

fn check_byte_count(requested: usize, width: usize) -> Result<(), SpaceError> {
    if requested > width {
        return Err(SpaceError::InvalidByteCount { requested, width });
    }
    Ok(())
}
