/// A contiguous run of bytes anchored at `start_address`.
///
/// Range math on segments is done in `u128` so that a segment ending on the
/// last address of a 64-bit space still has a representable exclusive end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start_address: u64,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn new(start_address: u64, data: Vec<u8>) -> Self {
        Self {
            start_address,
            data,
        }
    }

    /// Zero-filled segment of `len` bytes.
    pub fn zeroed(start_address: u64, len: usize) -> Self {
        Self::new(start_address, vec![0; len])
    }

    /// Address of the last byte (inclusive). Empty segments report their start.
    pub fn end_address(&self) -> u64 {
        if self.data.is_empty() {
            self.start_address
        } else {
            (self.end_exclusive() - 1) as u64
        }
    }

    pub fn start_wide(&self) -> u128 {
        self.start_address as u128
    }

    /// One past the last byte.
    pub fn end_exclusive(&self) -> u128 {
        self.start_address as u128 + self.data.len() as u128
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, addr: u64) -> bool {
        let addr = addr as u128;
        addr >= self.start_wide() && addr < self.end_exclusive()
    }

    /// True if every byte of `other` lies inside `self`.
    pub fn encloses(&self, other: &Segment) -> bool {
        self.start_wide() <= other.start_wide() && other.end_exclusive() <= self.end_exclusive()
    }

    /// Byte at `addr`, if covered.
    pub fn byte_at(&self, addr: u64) -> Option<u8> {
        if !self.contains(addr) {
            return None;
        }
        Some(self.data[(addr - self.start_address) as usize])
    }

    /// Merge an older, overlapping or adjacent segment into `self`.
    ///
    /// Bytes only present in `older` (its prefix below `self` and its suffix
    /// above `self`) are copied in; overlapping bytes keep `self`'s values.
    pub fn absorb(&mut self, older: Segment) {
        if self.encloses(&older) {
            return;
        }

        let (new_lo, new_hi) = (self.start_wide(), self.end_exclusive());
        let (old_lo, old_hi) = (older.start_wide(), older.end_exclusive());
        debug_assert!(
            old_lo <= new_hi && new_lo <= old_hi,
            "absorbing disjoint segment {old_lo:#X}..{old_hi:#X} into {new_lo:#X}..{new_hi:#X}"
        );

        let mut older_data = older.data;

        if old_hi > new_hi {
            let suffix_offset = (new_hi - old_lo) as usize;
            self.data.extend_from_slice(&older_data[suffix_offset..]);
        }

        if old_lo < new_lo {
            older_data.truncate((new_lo - old_lo) as usize);
            older_data.extend_from_slice(&self.data);
            self.data = older_data;
            self.start_address = older.start_address;
        }
    }
}
