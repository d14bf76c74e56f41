use crate::util::constants::*;
use crate::util::heap::layout::*;
use crate::util::Address;

/* Alignment */

pub fn page_align_down(address: Address) -> Address {
    address.align_down(BYTES_IN_PAGE)
}

pub fn page_align_up(address: Address) -> Address {
    address.align_up(BYTES_IN_PAGE)
}

pub fn is_page_aligned(address: Address) -> bool {
    address.is_aligned_to(BYTES_IN_PAGE)
}

pub const fn chunk_align_up(addr: Address) -> Address {
    addr.align_up(BYTES_IN_CHUNK)
}

pub const fn chunk_align_down(addr: Address) -> Address {
    addr.align_down(BYTES_IN_CHUNK)
}

pub const fn raw_align_up(val: usize, align: usize) -> usize {
    val.wrapping_add(align).wrapping_sub(1) & !align.wrapping_sub(1)
}

pub const fn raw_align_down(val: usize, align: usize) -> usize {
    val & !align.wrapping_sub(1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/* Conversion */

pub fn pages_to_bytes(pages: usize) -> usize {
    pages << LOG_BYTES_IN_PAGE
}

pub fn bytes_to_pages_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_PAGE - 1) >> LOG_BYTES_IN_PAGE
}

pub fn bytes_to_pages(bytes: usize) -> usize {
    let pages = bytes_to_pages_up(bytes);
    debug_assert!(
        pages << LOG_BYTES_IN_PAGE == bytes,
        "number of bytes computed from pages must match original byte amount: bytes = {} pages = {}",
        bytes,
        pages
    );
    pages
}

pub fn bytes_to_chunks_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_CHUNK - 1) >> LOG_BYTES_IN_CHUNK
}

#[cfg(test)]
mod tests {
    use crate::util::conversions::*;
    use crate::util::Address;

    #[test]
    fn test_page_align() {
        let addr = unsafe { Address::from_usize(0x123456789) };
        assert_eq!(page_align_down(addr), unsafe {
            Address::from_usize(0x123456000)
        });
        assert_eq!(page_align_up(addr), unsafe {
            Address::from_usize(0x123457000)
        });
        assert!(!is_page_aligned(addr));
        assert!(is_page_aligned(page_align_down(addr)));
    }

    #[test]
    fn test_chunk_align() {
        let addr = unsafe { Address::from_usize(0x123456789) };
        assert_eq!(chunk_align_down(addr), unsafe {
            Address::from_usize(0x123400000)
        });
        assert_eq!(chunk_align_up(addr), unsafe {
            Address::from_usize(0x123800000)
        });
    }

    #[test]
    fn test_page_conversions() {
        assert_eq!(pages_to_bytes(2), 8192);
        assert_eq!(bytes_to_pages_up(1), 1);
        assert_eq!(bytes_to_pages_up(4096), 1);
        assert_eq!(bytes_to_pages_up(4097), 2);
        assert_eq!(bytes_to_pages(8192), 2);
    }
}
