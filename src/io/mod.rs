//! Loading memory images into segments, typically for an init template.

mod binary;
mod error;
mod intel_hex;

use std::path::Path;

pub use binary::parse_binary;
pub use error::ParseError;
pub use intel_hex::parse_intel_hex;

use crate::{Error, Segment};

/// On-disk layout of a memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    IntelHex,
    /// Raw bytes placed at `base_address`.
    Binary { base_address: u64 },
}

/// Decode an in-memory image.
pub fn parse_image(data: &[u8], format: ImageFormat) -> Result<Vec<Segment>, ParseError> {
    match format {
        ImageFormat::IntelHex => parse_intel_hex(data),
        ImageFormat::Binary { base_address } => {
            Ok(parse_binary(data, base_address)?.into_iter().collect())
        }
    }
}

/// Read and decode an image file.
pub fn load_image(path: impl AsRef<Path>, format: ImageFormat) -> Result<Vec<Segment>, Error> {
    let data = std::fs::read(path)?;
    Ok(parse_image(&data, format)?)
}
