//! CRC checksums over address ranges.
//!
//! Bytes no segment stores count as zero, which is what a read of them
//! would return. Computing a checksum never allocates segments.

use crate::{AddressSpace, Range};

const CRC16_ARC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_ARC);
const CRC16_XMODEM: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
const CRC32_ISO_HDLC: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

const ZERO_CHUNK: [u8; 4096] = [0; 4096];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// CRC-16 (poly 0x8005, reflected)
    Crc16Arc,
    /// CRC-16 CCITT (poly 0x1021, init 0)
    Crc16Xmodem,
    /// CRC-32 IEEE
    Crc32,
}

impl ChecksumAlgorithm {
    /// Checksum of a plain byte slice.
    pub fn compute(self, data: &[u8]) -> u32 {
        match self {
            Self::Crc16Arc => CRC16_ARC.checksum(data) as u32,
            Self::Crc16Xmodem => CRC16_XMODEM.checksum(data) as u32,
            Self::Crc32 => CRC32_ISO_HDLC.checksum(data),
        }
    }
}

impl AddressSpace {
    /// Checksum of every byte in `range`, gaps included as zeros.
    pub fn checksum(&self, range: Range, algorithm: ChecksumAlgorithm) -> u32 {
        match algorithm {
            ChecksumAlgorithm::Crc16Arc => {
                let mut digest = CRC16_ARC.digest();
                self.for_each_chunk(range, |chunk| digest.update(chunk));
                digest.finalize() as u32
            }
            ChecksumAlgorithm::Crc16Xmodem => {
                let mut digest = CRC16_XMODEM.digest();
                self.for_each_chunk(range, |chunk| digest.update(chunk));
                digest.finalize() as u32
            }
            ChecksumAlgorithm::Crc32 => {
                let mut digest = CRC32_ISO_HDLC.digest();
                self.for_each_chunk(range, |chunk| digest.update(chunk));
                digest.finalize()
            }
        }
    }

    /// Visit the contents of `range` in address order as slices of segment
    /// data and zero runs for the gaps between them.
    fn for_each_chunk(&self, range: Range, mut f: impl FnMut(&[u8])) {
        let mut cursor = range.start() as u128;

        for handle in self.segments_in(range) {
            let Some(segment) = self.segment(handle) else {
                continue;
            };
            let Some(clip) = Range::of_segment(segment).and_then(|r| r.intersection(&range))
            else {
                continue;
            };

            feed_zeros(clip.start() as u128 - cursor, &mut f);
            let offset = (clip.start() - segment.start_address) as usize;
            let len = (clip.end() - clip.start()) as usize + 1;
            f(&segment.data[offset..offset + len]);
            cursor = clip.end() as u128 + 1;
        }

        feed_zeros(range.end() as u128 + 1 - cursor, &mut f);
    }
}

fn feed_zeros(mut count: u128, f: &mut impl FnMut(&[u8])) {
    while count > 0 {
        let n = count.min(ZERO_CHUNK.len() as u128) as usize;
        f(&ZERO_CHUNK[..n]);
        count -= n as u128;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Segment;

    #[test]
    fn test_known_vectors() {
        assert_eq!(ChecksumAlgorithm::Crc16Arc.compute(b"123456789"), 0xBB3D);
        assert_eq!(ChecksumAlgorithm::Crc16Xmodem.compute(b"123456789"), 0x31C3);
        assert_eq!(ChecksumAlgorithm::Crc32.compute(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_range_checksum_matches_flat_buffer() {
        let mut space = AddressSpace::default();
        space.insert_segment(0x102, vec![0xAA, 0xBB]).unwrap();
        space.insert_segment(0x108, vec![0xCC]).unwrap();

        let range = Range::from_start_end(0x100, 0x10A).unwrap();
        let flat = [0, 0, 0xAA, 0xBB, 0, 0, 0, 0, 0xCC, 0, 0];
        for algorithm in [
            ChecksumAlgorithm::Crc16Arc,
            ChecksumAlgorithm::Crc16Xmodem,
            ChecksumAlgorithm::Crc32,
        ] {
            assert_eq!(space.checksum(range, algorithm), algorithm.compute(&flat));
        }
        assert_eq!(space.segment_count(), 2);
    }

    #[test]
    fn test_range_clips_segments() {
        let space = AddressSpace::with_init_image(
            Default::default(),
            [Segment::new(0x10, vec![1, 2, 3, 4, 5, 6])],
        )
        .unwrap();
        let range = Range::from_start_end(0x12, 0x13).unwrap();
        assert_eq!(
            space.checksum(range, ChecksumAlgorithm::Crc32),
            ChecksumAlgorithm::Crc32.compute(&[3, 4])
        );
    }

    #[test]
    fn test_range_ending_at_top_of_space() {
        let mut space = AddressSpace::default();
        space
            .insert_segment(u64::MAX - 3, vec![0x11, 0x22, 0x33, 0x44])
            .unwrap();
        let range = Range::from_start_end(u64::MAX - 5, u64::MAX - 1).unwrap();
        assert_eq!(
            space.checksum(range, ChecksumAlgorithm::Crc16Xmodem),
            ChecksumAlgorithm::Crc16Xmodem.compute(&[0, 0, 0x11, 0x22, 0x33])
        );
    }

    #[test]
    fn test_large_gap() {
        let space = AddressSpace::default();
        let range = Range::from_start_length(0, 10_000).unwrap();
        assert_eq!(
            space.checksum(range, ChecksumAlgorithm::Crc16Arc),
            ChecksumAlgorithm::Crc16Arc.compute(&vec![0; 10_000])
        );
    }
}
