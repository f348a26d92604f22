use crate::SegmentHandle;

/// Remembers the most recently used segment.
///
/// Holds only a handle. Callers resolve it through the arena on every use,
/// so a segment merged away since the last access reads as a miss.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MruCache {
    handle: Option<SegmentHandle>,
}

impl MruCache {
    pub fn get(&self) -> Option<SegmentHandle> {
        self.handle
    }

    pub fn touch(&mut self, handle: SegmentHandle) {
        self.handle = Some(handle);
    }

    /// Forget `handle` if it is the cached one.
    pub fn invalidate(&mut self, handle: SegmentHandle) {
        if self.handle == Some(handle) {
            self.handle = None;
        }
    }

    pub fn clear(&mut self) {
        self.handle = None;
    }
}
