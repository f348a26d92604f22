use thiserror::Error;

use crate::Segment;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("range start ({start:#X}) exceeds end ({end:#X})")]
    StartExceedsEnd { start: u64, end: u64 },

    #[error("zero length range at {start:#X}")]
    ZeroLength { start: u64 },

    #[error("range {start:#X} + {length:#X} overflows the address type")]
    AddressOverflow { start: u64, length: u64 },
}

/// An inclusive address range `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: u64,
    end: u64, // inclusive
}

impl Range {
    /// Create range from start address and length.
    pub fn from_start_length(start: u64, length: u64) -> Result<Self, RangeError> {
        if length == 0 {
            return Err(RangeError::ZeroLength { start });
        }
        let end = start
            .checked_add(length - 1)
            .ok_or(RangeError::AddressOverflow { start, length })?;
        Ok(Self { start, end })
    }

    /// Create range from start and end addresses (inclusive).
    pub fn from_start_end(start: u64, end: u64) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::StartExceedsEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covered by a non-empty segment.
    pub fn of_segment(segment: &Segment) -> Option<Self> {
        if segment.is_empty() {
            return None;
        }
        Some(Self {
            start: segment.start_address,
            end: segment.end_address(),
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Return the intersection of two ranges, if they overlap.
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Range { start, end })
    }
}
