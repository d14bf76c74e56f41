use crate::util::constants::*;
use crate::util::Address;

/// log2 of the coarsest unit of address space allocation.
pub const LOG_BYTES_IN_CHUNK: usize = 22;
/// Coarsest unit of address space allocation.
pub const BYTES_IN_CHUNK: usize = 1 << LOG_BYTES_IN_CHUNK;
pub const CHUNK_MASK: usize = (1 << LOG_BYTES_IN_CHUNK) - 1;
/// Coarsest unit of address space allocation, in pages
pub const PAGES_IN_CHUNK: usize = 1 << (LOG_BYTES_IN_CHUNK - LOG_BYTES_IN_PAGE as usize);

#[cfg(target_pointer_width = "32")]
pub const HEAP_START: Address = unsafe { Address::from_usize(0x8000_0000) };
#[cfg(target_pointer_width = "32")]
pub const HEAP_END: Address = unsafe { Address::from_usize(0xd000_0000) };

#[cfg(target_pointer_width = "64")]
pub const HEAP_START: Address = unsafe { Address::from_usize(0x0000_2000_0000_0000) };
#[cfg(target_pointer_width = "64")]
pub const HEAP_END: Address = unsafe { Address::from_usize(0x0000_2004_0000_0000) };

/// The total virtual address space the heap may occupy.
pub const AVAILABLE_START: Address = HEAP_START;
pub const AVAILABLE_END: Address = HEAP_END;
pub const AVAILABLE_BYTES: usize = AVAILABLE_END.get_extent(AVAILABLE_START);

/// Maximum number of chunks the heap range can hold.
pub const MAX_CHUNKS: usize = AVAILABLE_BYTES >> LOG_BYTES_IN_CHUNK;

static_assertions::const_assert!(HEAP_START.as_usize() & CHUNK_MASK == 0);
static_assertions::const_assert!(HEAP_END.as_usize() & CHUNK_MASK == 0);
