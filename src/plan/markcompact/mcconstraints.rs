use crate::util::alloc::size_classes::MAX_SMALL_BYTES;

pub const MOVES_OBJECTS: bool = true;
/// One mark bit in the header; the forwarding address lives in the word
/// reserved ahead of each object.
pub const GC_HEADER_BITS: usize = 1;
pub const GC_HEADER_WORDS: usize = 1;
pub const MAX_NON_LOS_COPY_BYTES: usize = MAX_SMALL_BYTES;
