use super::ParseError;
use crate::Segment;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;
const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
const RECORD_START_SEGMENT: u8 = 0x03;
const RECORD_EXTENDED_LINEAR: u8 = 0x04;
const RECORD_START_LINEAR: u8 = 0x05;

struct Record {
    offset: u16,
    kind: u8,
    data: Vec<u8>,
}

/// Parse Intel-HEX text into segments, merging contiguous data records.
///
/// Start-address records (03/05) carry an entry point, not memory, and are
/// skipped.
pub fn parse_intel_hex(input: &[u8]) -> Result<Vec<Segment>, ParseError> {
    let text = std::str::from_utf8(input).map_err(|e| ParseError::InvalidRecord {
        line: 1,
        message: format!("invalid UTF-8: {e}"),
    })?;

    let mut segments: Vec<Segment> = Vec::new();
    let mut base: u64 = 0;
    let mut eof_seen = false;

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if eof_seen {
            return Err(ParseError::InvalidRecord {
                line: line_num,
                message: "data after EOF record".to_string(),
            });
        }

        let record = decode_record(line, line_num)?;
        match record.kind {
            RECORD_DATA => {
                if record.data.is_empty() {
                    continue;
                }
                let address = base + record.offset as u64;
                match segments.last_mut() {
                    Some(last) if last.end_exclusive() == address as u128 => {
                        last.data.extend_from_slice(&record.data);
                    }
                    _ => segments.push(Segment::new(address, record.data)),
                }
            }
            RECORD_EOF => eof_seen = true,
            RECORD_EXTENDED_SEGMENT | RECORD_EXTENDED_LINEAR => {
                let [high, low] = record.data[..] else {
                    return Err(ParseError::InvalidRecord {
                        line: line_num,
                        message: "extended address record must have 2 data bytes".to_string(),
                    });
                };
                let shift = if record.kind == RECORD_EXTENDED_LINEAR { 16 } else { 4 };
                base = (u16::from_be_bytes([high, low]) as u64) << shift;
            }
            RECORD_START_SEGMENT | RECORD_START_LINEAR => {}
            record_type => {
                return Err(ParseError::UnsupportedRecordType {
                    line: line_num,
                    record_type,
                });
            }
        }
    }

    if !eof_seen {
        return Err(ParseError::UnexpectedEof);
    }
    Ok(segments)
}

fn decode_record(line: &str, line_num: usize) -> Result<Record, ParseError> {
    let Some(hex) = line.strip_prefix(':') else {
        return Err(ParseError::InvalidRecord {
            line: line_num,
            message: "line does not start with ':'".to_string(),
        });
    };
    if hex.len() < 10 {
        return Err(ParseError::InvalidRecord {
            line: line_num,
            message: "record too short".to_string(),
        });
    }

    let bytes = decode_hex(hex, line_num)?;
    let byte_count = bytes[0] as usize;
    if bytes.len() != byte_count + 5 {
        return Err(ParseError::InvalidRecord {
            line: line_num,
            message: format!(
                "byte count mismatch: header says {}, got {}",
                byte_count,
                bytes.len() - 5
            ),
        });
    }

    let (body, checksum) = bytes.split_at(bytes.len() - 1);
    let expected = body
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg();
    if expected != checksum[0] {
        return Err(ParseError::ChecksumMismatch {
            line: line_num,
            expected,
            actual: checksum[0],
        });
    }

    Ok(Record {
        offset: u16::from_be_bytes([body[1], body[2]]),
        kind: body[3],
        data: body[4..].to_vec(),
    })
}

fn decode_hex(hex: &str, line_num: usize) -> Result<Vec<u8>, ParseError> {
    if !hex.len().is_multiple_of(2) {
        return Err(ParseError::InvalidRecord {
            line: line_num,
            message: "odd number of hex digits".to_string(),
        });
    }

    let bytes = hex.as_bytes();
    // The first non-hex byte is always where a character starts, so report
    // the whole character rather than a lone UTF-8 lead byte.
    let nibble = |i: usize| {
        (bytes[i] as char)
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| ParseError::InvalidHexDigit {
                line: line_num,
                char: hex
                    .get(i..)
                    .and_then(|rest| rest.chars().next())
                    .unwrap_or(bytes[i] as char),
            })
    };

    (0..bytes.len())
        .step_by(2)
        .map(|i| Ok((nibble(i)? << 4) | nibble(i + 1)?))
        .collect()
}
