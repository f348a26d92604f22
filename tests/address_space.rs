//! End-to-end behavior of the address space: coalescing, lazy allocation,
//! handles and the init template.

mod common;

use common::{assert_partition, layout};
use sparsemem::{AddressSpace, AddressWidth, Segment, SpaceConfig, SpaceError};

fn space(min_segment_size: usize) -> AddressSpace {
    AddressSpace::with_min_segment_size(min_segment_size).unwrap()
}

fn bytes_of(space: &AddressSpace, index: usize) -> Vec<u8> {
    space.iter_segments().nth(index).unwrap().data.clone()
}

// --- Coalescing ---

#[test]
fn test_overlap_tie_break_newer_absorbs_older() {
    let mut sp = space(5);
    sp.insert_segment(100, vec![1; 10]).unwrap();
    sp.insert_segment(99, vec![2; 12]).unwrap();

    assert_eq!(layout(&sp), vec![(99, 12)]);
    assert_eq!(bytes_of(&sp, 0), vec![2; 12]);
}

#[test]
fn test_partial_overlap_merge() {
    let mut sp = space(5);
    sp.insert_segment(100, vec![1; 10]).unwrap();
    sp.insert_segment(105, vec![2; 10]).unwrap();

    assert_eq!(layout(&sp), vec![(100, 15)]);
    let mut expected = vec![1; 5];
    expected.extend([2; 10]);
    assert_eq!(bytes_of(&sp, 0), expected);
}

#[test]
fn test_adjacency_merge() {
    let mut sp = space(5);
    sp.insert_segment(100, vec![1; 10]).unwrap();
    sp.insert_segment(90, vec![2; 10]).unwrap();
    sp.insert_segment(110, vec![3; 10]).unwrap();

    assert_eq!(layout(&sp), vec![(90, 30)]);
    let mut expected = vec![2; 10];
    expected.extend([1; 10]);
    expected.extend([3; 10]);
    assert_eq!(bytes_of(&sp, 0), expected);
}

#[test]
fn test_disjoint_segments_stay_separate() {
    let mut sp = space(5);
    sp.insert_segment(0x300, vec![3; 4]).unwrap();
    sp.insert_segment(0x100, vec![1; 4]).unwrap();
    sp.insert_segment(0x200, vec![2; 4]).unwrap();

    assert_eq!(layout(&sp), vec![(0x100, 4), (0x200, 4), (0x300, 4)]);
    assert_partition(&sp);

    let starts: Vec<u64> = sp
        .segments()
        .into_iter()
        .map(|handle| sp.segment(handle).unwrap().start_address)
        .collect();
    assert_eq!(starts, vec![0x100, 0x200, 0x300]);
}

#[test]
fn test_write_bytes_overwrites_range() {
    let mut sp = space(5);
    sp.write_bytes(0x10, &[1, 2, 3, 4, 5, 6]).unwrap();
    sp.write_bytes(0x12, &[0xAA, 0xBB]).unwrap();

    let mut buf = [0; 6];
    sp.read_bytes(0x10, &mut buf).unwrap();
    assert_eq!(buf, [1, 2, 0xAA, 0xBB, 5, 6]);
    assert_eq!(sp.segment_count(), 1);
}

// --- Lazy allocation ---

#[test]
fn test_lazy_allocation_minimality() {
    let mut sp = space(5);
    sp.write_byte(1000, 0x7F).unwrap();

    assert_eq!(layout(&sp), vec![(998, 5)]);
    assert_eq!(bytes_of(&sp, 0), vec![0, 0, 0x7F, 0, 0]);
}

#[test]
fn test_read_of_untouched_address_is_zero() {
    let mut sp = space(5);
    assert_eq!(sp.read_byte(0xDEAD_BEEF).unwrap(), 0);
    assert_eq!(sp.read_value::<u64>(0x4000_0000).unwrap(), 0);
    assert_partition(&sp);
}

#[test]
fn test_sequential_touches_grow_one_segment() {
    let mut sp = space(3);
    for addr in 0x100..0x180 {
        sp.write_byte(addr, addr as u8).unwrap();
    }
    assert_eq!(sp.segment_count(), 1);
    let seg = sp.iter_segments().next().unwrap();
    assert!(seg.start_address <= 0x100);
    assert!(seg.end_address() >= 0x17F);
    assert_eq!(sp.peek_byte(0x17F), Some(0x7F));
}

#[test]
fn test_first_touch_at_address_zero() {
    let mut sp = space(5);
    sp.write_byte(0, 1).unwrap();
    assert_eq!(layout(&sp), vec![(0, 5)]);
}

#[test]
fn test_32bit_space_top() {
    let mut sp = AddressSpace::new(
        SpaceConfig::new(AddressWidth::Bits32)
            .with_min_segment_size(9)
            .unwrap(),
    );
    sp.write_value(0xFFFF_FFFC, 0xCAFE_BABEu32).unwrap();
    assert_eq!(sp.read_value::<u32>(0xFFFF_FFFC).unwrap(), 0xCAFE_BABE);
    let last = sp.iter_segments().last().unwrap();
    assert_eq!(last.end_address(), 0xFFFF_FFFF);

    assert_eq!(
        sp.write_value(0xFFFF_FFFE, 1u32),
        Err(SpaceError::AddressOutOfRange {
            address: 0xFFFF_FFFE,
            len: 4,
            max: 0xFFFF_FFFF
        })
    );
}

// --- Handles ---

#[test]
fn test_contains_is_non_mutating() {
    let mut sp = space(5);
    sp.insert_segment(0x40, vec![1; 8]).unwrap();

    assert!(sp.contains(0x3F).is_none());
    assert!(sp.contains(0x48).is_none());
    let handle = sp.contains(0x44).unwrap();
    assert_eq!(sp.segment(handle).unwrap().start_address, 0x40);
    assert_eq!(sp.segment_count(), 1);
}

#[test]
fn test_segments_snapshot_survives_later_inserts() {
    let mut sp = space(5);
    sp.insert_segment(0x10, vec![1; 4]).unwrap();
    sp.insert_segment(0x40, vec![2; 4]).unwrap();
    let before = sp.segments();
    assert_eq!(before.len(), 2);

    // Bridges both segments; the old handles must not resolve anymore.
    sp.insert_segment(0x14, vec![9; 0x2C]).unwrap();
    assert!(before.iter().all(|&h| sp.segment(h).is_none()));
    assert_eq!(layout(&sp), vec![(0x10, 0x34)]);
}

// --- Init template ---

#[test]
fn test_reset_is_idempotent_and_template_untouched() {
    let t1 = Segment::new(0x1000, (0..32).collect());
    let t2 = Segment::new(0x8000, vec![0xEE; 16]);
    let mut sp =
        AddressSpace::with_init_image(SpaceConfig::default(), [t1.clone(), t2.clone()]).unwrap();

    for addr in (0x0FF0..0x1030).step_by(3) {
        sp.write_byte(addr, 0x55).unwrap();
    }
    sp.write_value(0x8004, u64::MAX).unwrap();
    sp.insert_segment(0x7000, vec![1; 0x2000]).unwrap();

    sp.reset();
    sp.reset();

    for seg in [&t1, &t2] {
        for (i, &expected) in seg.data.iter().enumerate() {
            assert_eq!(sp.read_byte(seg.start_address + i as u64).unwrap(), expected);
        }
    }
    let template = sp.init_template().unwrap();
    assert_eq!(layout(template), vec![(0x1000, 32), (0x8000, 16)]);
    assert_eq!(template.iter_segments().next().unwrap(), &t1);
    assert_eq!(template.iter_segments().nth(1).unwrap(), &t2);
}

#[test]
fn test_reset_without_template_empties() {
    let mut sp = space(5);
    sp.write_byte(0x10, 1).unwrap();
    sp.reset();
    assert!(sp.is_empty());
}

#[test]
fn test_template_rejects_out_of_range_segment() {
    let mut sp = AddressSpace::new(SpaceConfig::new(AddressWidth::Bits16));
    assert!(matches!(
        sp.add_init_segment(Segment::new(0xFFF0, vec![0; 0x20])),
        Err(SpaceError::SegmentOutOfRange { .. })
    ));
}

#[test]
fn test_clear_then_reset_reloads() {
    let mut sp = AddressSpace::with_init_image(
        SpaceConfig::default(),
        [Segment::new(0x20, vec![1, 2, 3])],
    )
    .unwrap();
    sp.clear();
    assert!(sp.is_empty());
    sp.reset();
    assert_eq!(layout(&sp), vec![(0x20, 3)]);
}
