use crate::util::heap::layout;
use crate::util::Address;

const TYPE_BITS: usize = 2;
const TYPE_CONTIGUOUS: usize = 1;
const TYPE_CONTIGUOUS_HI: usize = 3;
const TYPE_MASK: usize = (1 << TYPE_BITS) - 1;
const SIZE_SHIFT: usize = TYPE_BITS;
const SIZE_BITS: usize = 14;
const SIZE_MASK: usize = ((1 << SIZE_BITS) - 1) << SIZE_SHIFT;
const INDEX_SHIFT: usize = SIZE_SHIFT + SIZE_BITS;
const INDEX_BITS: usize = 14;
const INDEX_MASK: usize = ((1 << INDEX_BITS) - 1) << INDEX_SHIFT;

static_assertions::const_assert!(layout::MAX_CHUNKS <= (1 << SIZE_BITS));
static_assertions::const_assert!(layout::MAX_CHUNKS <= (1 << INDEX_BITS));
static_assertions::const_assert!(INDEX_SHIFT + INDEX_BITS <= crate::util::constants::BITS_IN_WORD);

/// A space descriptor packs a contiguous space's identity into one word: its
/// chunk index within the heap range, its extent in chunks, and whether it
/// abuts the top of the heap range.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SpaceDescriptor(usize);

impl SpaceDescriptor {
    pub const UNINITIALIZED: Self = SpaceDescriptor(0);

    pub fn create_descriptor_from_heap_range(start: Address, end: Address) -> SpaceDescriptor {
        debug_assert!(start >= layout::HEAP_START && end <= layout::HEAP_END && start < end);
        debug_assert!(start.is_aligned_to(layout::BYTES_IN_CHUNK));
        debug_assert!(end.is_aligned_to(layout::BYTES_IN_CHUNK));
        let top = end == layout::HEAP_END;
        let index = (start - layout::HEAP_START) >> layout::LOG_BYTES_IN_CHUNK;
        let chunks = (end - start) >> layout::LOG_BYTES_IN_CHUNK;
        debug_assert!(index < (1 << INDEX_BITS) && chunks > 0 && chunks <= (1 << SIZE_BITS));
        SpaceDescriptor(
            (index << INDEX_SHIFT)
                | (chunks << SIZE_SHIFT)
                | (if top {
                    TYPE_CONTIGUOUS_HI
                } else {
                    TYPE_CONTIGUOUS
                }),
        )
    }

    pub fn is_empty(self) -> bool {
        self.0 == SpaceDescriptor::UNINITIALIZED.0
    }

    pub fn is_contiguous(self) -> bool {
        (self.0 & TYPE_CONTIGUOUS) == TYPE_CONTIGUOUS
    }

    pub fn is_contiguous_hi(self) -> bool {
        (self.0 & TYPE_MASK) == TYPE_CONTIGUOUS_HI
    }

    pub fn get_start(self) -> Address {
        debug_assert!(self.is_contiguous());
        let index = (self.0 & INDEX_MASK) >> INDEX_SHIFT;
        layout::HEAP_START + (index << layout::LOG_BYTES_IN_CHUNK)
    }

    pub fn get_extent(self) -> usize {
        debug_assert!(self.is_contiguous());
        let chunks = (self.0 & SIZE_MASK) >> SIZE_SHIFT;
        chunks << layout::LOG_BYTES_IN_CHUNK
    }

    /// Does this descriptor's range contain the given address?
    pub fn contains(self, address: Address) -> bool {
        debug_assert!(self.is_contiguous());
        let start = self.get_start();
        address >= start && address < start + self.get_extent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::heap::layout::*;

    const TEST_SPACE_SIZE: usize = BYTES_IN_CHUNK * 10;

    #[test]
    fn uninitialized_is_empty() {
        assert!(SpaceDescriptor::UNINITIALIZED.is_empty());
        assert!(!SpaceDescriptor::UNINITIALIZED.is_contiguous());
    }

    #[test]
    fn create_descriptor_at_heap_start() {
        let d = SpaceDescriptor::create_descriptor_from_heap_range(
            HEAP_START,
            HEAP_START + TEST_SPACE_SIZE,
        );
        assert!(!d.is_empty());
        assert!(d.is_contiguous());
        assert!(!d.is_contiguous_hi());
        assert_eq!(d.get_start(), HEAP_START);
        assert_eq!(d.get_extent(), TEST_SPACE_SIZE);
    }

    #[test]
    fn create_descriptor_in_heap() {
        let d = SpaceDescriptor::create_descriptor_from_heap_range(
            HEAP_START + TEST_SPACE_SIZE,
            HEAP_START + TEST_SPACE_SIZE * 2,
        );
        assert_eq!(d.get_start(), HEAP_START + TEST_SPACE_SIZE);
        assert_eq!(d.get_extent(), TEST_SPACE_SIZE);
    }

    #[test]
    fn create_descriptor_at_heap_end() {
        let d =
            SpaceDescriptor::create_descriptor_from_heap_range(HEAP_END - TEST_SPACE_SIZE, HEAP_END);
        assert!(d.is_contiguous());
        assert!(d.is_contiguous_hi());
        assert_eq!(d.get_start(), HEAP_END - TEST_SPACE_SIZE);
        assert_eq!(d.get_extent(), TEST_SPACE_SIZE);
    }

    #[test]
    fn distinct_ranges_get_distinct_descriptors() {
        let a = SpaceDescriptor::create_descriptor_from_heap_range(
            HEAP_START,
            HEAP_START + TEST_SPACE_SIZE,
        );
        let b = SpaceDescriptor::create_descriptor_from_heap_range(
            HEAP_START + TEST_SPACE_SIZE,
            HEAP_START + TEST_SPACE_SIZE * 2,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn contains() {
        let d = SpaceDescriptor::create_descriptor_from_heap_range(
            HEAP_START,
            HEAP_START + TEST_SPACE_SIZE,
        );
        assert!(d.contains(HEAP_START));
        assert!(d.contains(HEAP_START + (TEST_SPACE_SIZE - 1)));
        assert!(!d.contains(HEAP_START + TEST_SPACE_SIZE));
    }
}
