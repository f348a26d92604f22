//! Segment storage keyed by generational handles.
//!
//! The index, the MRU cache and callers only ever hold a [`SegmentHandle`].
//! Removing a segment bumps its slot's generation, so any handle still
//! naming the old occupant resolves to `None` instead of detached data.
//! Generations are 64-bit and never wrap, so a retired handle stays stale.

use crate::Segment;

/// Non-owning reference to a segment of an [`AddressSpace`](crate::AddressSpace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentHandle {
    slot: u32,
    generation: u64,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u64,
    segment: Option<Segment>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SegmentArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl SegmentArena {
    pub fn insert(&mut self, segment: Segment) -> SegmentHandle {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.segment = Some(segment);
            return SegmentHandle {
                slot,
                generation: entry.generation,
            };
        }

        let slot = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("segment arena exhausted ({} slots)", self.slots.len())
        });
        self.slots.push(Slot {
            generation: 0,
            segment: Some(segment),
        });
        SegmentHandle {
            slot,
            generation: 0,
        }
    }

    pub fn get(&self, handle: SegmentHandle) -> Option<&Segment> {
        let entry = self.slots.get(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.segment.as_ref()
    }

    pub fn get_mut(&mut self, handle: SegmentHandle) -> Option<&mut Segment> {
        let entry = self.slots.get_mut(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.segment.as_mut()
    }

    /// Take the segment out and retire `handle`.
    pub fn remove(&mut self, handle: SegmentHandle) -> Option<Segment> {
        let entry = self.slots.get_mut(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        let segment = entry.segment.take()?;
        entry.generation += 1;
        self.free.push(handle.slot);
        self.live -= 1;
        Some(segment)
    }

    /// Drop every segment; all outstanding handles become stale.
    pub fn clear(&mut self) {
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if entry.segment.take().is_some() {
                entry.generation += 1;
                self.free.push(slot as u32);
            }
        }
        self.live = 0;
    }

    pub fn len(&self) -> usize {
        self.live
    }
}
