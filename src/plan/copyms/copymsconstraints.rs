use crate::util::alloc::size_classes::MAX_SMALL_BYTES;

pub const MOVES_OBJECTS: bool = true;
/// Forwarding state in the nursery, mark state elsewhere; both fit the
/// same two borrowed header bits.
pub const GC_HEADER_BITS: usize = 2;
pub const GC_HEADER_WORDS: usize = 0;
pub const MAX_NON_LOS_COPY_BYTES: usize = MAX_SMALL_BYTES;
