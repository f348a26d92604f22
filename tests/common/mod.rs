#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use sparsemem::AddressSpace;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn temp_dir(prefix: &str) -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut dir = std::env::temp_dir();
    dir.push(format!("sparsemem_{prefix}_{}_{}", std::process::id(), id));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_file(path: &Path, data: &[u8]) {
    std::fs::write(path, data).unwrap();
}

/// `(start, len)` of every active segment, in address order.
pub fn layout(space: &AddressSpace) -> Vec<(u64, usize)> {
    space
        .iter_segments()
        .map(|s| (s.start_address, s.len()))
        .collect()
}

/// Panics unless the active segments are sorted, non-empty, and neither
/// overlap nor touch.
pub fn assert_partition(space: &AddressSpace) {
    let segments: Vec<_> = space.iter_segments().collect();
    assert_eq!(segments.len(), space.segments().len());
    for seg in &segments {
        assert!(!seg.is_empty(), "empty segment at {:#X}", seg.start_address);
    }
    for pair in segments.windows(2) {
        assert!(
            pair[0].end_exclusive() < pair[1].start_wide(),
            "segments {:#X}+{} and {:#X}+{} overlap or touch",
            pair[0].start_address,
            pair[0].len(),
            pair[1].start_address,
            pair[1].len()
        );
    }
}
