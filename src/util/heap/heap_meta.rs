use crate::util::conversions;
use crate::util::heap::layout;
use crate::util::Address;

/// Hands out disjoint pieces of the virtual heap range while a plan creates
/// its spaces. Bottom requests grow upward from the heap start, top requests
/// downward from the heap limit.
pub struct HeapMeta {
    pub heap_cursor: Address,
    pub heap_limit: Address,
}

impl HeapMeta {
    pub fn new() -> Self {
        HeapMeta {
            heap_cursor: layout::HEAP_START,
            heap_limit: layout::HEAP_END,
        }
    }

    /// Carve out `extent` bytes at the requested end of the heap range and
    /// return the start of the carved range. `extent` is rounded up to a
    /// whole number of chunks.
    pub fn reserve(&mut self, extent: usize, top: bool) -> Address {
        let extent = conversions::raw_align_up(extent, layout::BYTES_IN_CHUNK);
        let ret = if top {
            self.heap_limit -= extent;
            self.heap_limit
        } else {
            let start = self.heap_cursor;
            self.heap_cursor += extent;
            start
        };

        assert!(
            self.heap_cursor <= self.heap_limit,
            "Out of virtual address space at {} ({} > {})",
            self.heap_cursor - extent,
            self.heap_cursor,
            self.heap_limit
        );

        ret
    }
}

impl Default for HeapMeta {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::heap::layout::BYTES_IN_CHUNK;

    #[test]
    fn bottom_requests_ascend() {
        let mut heap = HeapMeta::new();
        let a = heap.reserve(BYTES_IN_CHUNK * 4, false);
        let b = heap.reserve(BYTES_IN_CHUNK * 4, false);
        assert_eq!(a, layout::HEAP_START);
        assert_eq!(b, a + BYTES_IN_CHUNK * 4);
    }

    #[test]
    fn top_requests_descend() {
        let mut heap = HeapMeta::new();
        let a = heap.reserve(BYTES_IN_CHUNK * 4, true);
        let b = heap.reserve(BYTES_IN_CHUNK * 4, true);
        assert_eq!(a + BYTES_IN_CHUNK * 4, layout::HEAP_END);
        assert_eq!(b + BYTES_IN_CHUNK * 4, a);
    }

    #[test]
    fn extents_are_chunk_aligned() {
        let mut heap = HeapMeta::new();
        let a = heap.reserve(BYTES_IN_CHUNK + 1, false);
        let b = heap.reserve(1, false);
        assert_eq!(b - a, 2 * BYTES_IN_CHUNK);
    }
}
