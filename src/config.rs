use thiserror::Error;

/// Smallest segment created for a first-touch address when none is configured.
pub const DEFAULT_MIN_SEGMENT_SIZE: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("minimum segment size must be odd, got {0}")]
    EvenMinSegmentSize(usize),

    #[error("minimum segment size must be at least 3, got {0}")]
    MinSegmentSizeTooSmall(usize),
}

/// Width of the address type. Fixes the highest valid address of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressWidth {
    Bits16,
    Bits32,
    #[default]
    Bits64,
}

impl AddressWidth {
    pub fn max_address(self) -> u64 {
        match self {
            Self::Bits16 => u16::MAX as u64,
            Self::Bits32 => u32::MAX as u64,
            Self::Bits64 => u64::MAX,
        }
    }

    /// One past the highest address, in wide arithmetic.
    pub fn limit(self) -> u128 {
        self.max_address() as u128 + 1
    }
}

/// Construction-time settings of an [`AddressSpace`](crate::AddressSpace).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceConfig {
    address_width: AddressWidth,
    min_segment_size: usize,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            address_width: AddressWidth::default(),
            min_segment_size: DEFAULT_MIN_SEGMENT_SIZE,
        }
    }
}

impl SpaceConfig {
    pub fn new(address_width: AddressWidth) -> Self {
        Self {
            address_width,
            ..Self::default()
        }
    }

    /// Set the size of lazily created segments. Must be odd and at least 3 so
    /// the window can be centered on the touched address.
    pub fn with_min_segment_size(mut self, size: usize) -> Result<Self, ConfigError> {
        if size < 3 {
            return Err(ConfigError::MinSegmentSizeTooSmall(size));
        }
        if size % 2 == 0 {
            return Err(ConfigError::EvenMinSegmentSize(size));
        }
        self.min_segment_size = size;
        Ok(self)
    }

    pub fn address_width(&self) -> AddressWidth {
        self.address_width
    }

    pub fn min_segment_size(&self) -> usize {
        self.min_segment_size
    }

    pub fn max_address(&self) -> u64 {
        self.address_width.max_address()
    }
}
