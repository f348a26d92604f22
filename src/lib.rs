//! Sparse byte-addressable memory for simulators and emulators.
//!
//! An [`AddressSpace`] spans the whole range of its address width but only
//! stores the segments that were written, touched, or loaded. Segments are
//! kept in an interval index, coalesce on insert (newer bytes win), and are
//! created on demand around first-touch addresses. An init template restores
//! a known image on [`AddressSpace::reset`].

mod arena;
pub mod checksum;
pub mod config;
pub mod error;
pub mod index;
pub mod io;
mod mru;
pub mod range;
pub mod segment;
pub mod space;
pub mod value;

pub use arena::SegmentHandle;
pub use checksum::ChecksumAlgorithm;
pub use config::{AddressWidth, ConfigError, DEFAULT_MIN_SEGMENT_SIZE, SpaceConfig};
pub use error::Error;
pub use index::{IntervalEntry, SegmentIndex};
pub use io::{ImageFormat, ParseError, load_image, parse_binary, parse_image, parse_intel_hex};
pub use range::{Range, RangeError};
pub use segment::Segment;
pub use space::{AccessStats, AddressSpace, SpaceError};
pub use value::LeValue;
