use crate::util::alloc::size_classes::MAX_SMALL_BYTES;

pub const MOVES_OBJECTS: bool = false;
/// Mark state bits borrowed from the object header.
pub const GC_HEADER_BITS: usize = 2;
pub const GC_HEADER_WORDS: usize = 0;
pub const MAX_NON_LOS_COPY_BYTES: usize = MAX_SMALL_BYTES;
