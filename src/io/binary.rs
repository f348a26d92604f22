use super::ParseError;
use crate::Segment;

/// Wrap a raw binary blob as one segment at `base_address`.
/// An empty blob yields no segment.
pub fn parse_binary(data: &[u8], base_address: u64) -> Result<Option<Segment>, ParseError> {
    if data.is_empty() {
        return Ok(None);
    }

    if base_address.checked_add(data.len() as u64 - 1).is_none() {
        return Err(ParseError::AddressOverflow(format!(
            "{:#X} + {} exceeds u64",
            base_address,
            data.len()
        )));
    }

    Ok(Some(Segment::new(base_address, data.to_vec())))
}
