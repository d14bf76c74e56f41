use std::sync::Mutex;

use crate::util::conversions::*;
use crate::util::heap::accounting::PageAccounting;
use crate::util::heap::pageresource::PageResource;
use crate::util::memory;
use crate::util::Address;
use crate::util::OpaquePointer;
use crate::vm::VMBinding;

/// Bump-pointer page resource over a contiguous extent. Pages are handed out
/// by advancing a cursor; the whole extent is recycled at once by `reset`.
pub struct MonotonePageResource {
    accounting: PageAccounting,
    start: Address,
    sync: Mutex<MonotonePageResourceSync>,
}

struct MonotonePageResourceSync {
    /// Start of the next page to be allocated.
    cursor: Address,
    /// Limit of the contiguous extent.
    sentinel: Address,
}

impl<VM: VMBinding> PageResource<VM> for MonotonePageResource {
    fn alloc_pages(
        &self,
        reserved_pages: usize,
        required_pages: usize,
        zeroed: bool,
        tls: OpaquePointer,
    ) -> Address {
        let mut sync = self.sync.lock().unwrap();
        let bytes = pages_to_bytes(required_pages);
        let rtn = sync.cursor;
        let tmp = sync.cursor + bytes;
        if tmp > sync.sentinel {
            unsafe { Address::zero() }
        } else {
            sync.cursor = tmp;
            <Self as PageResource<VM>>::commit_pages(self, reserved_pages, required_pages, tls);
            if zeroed {
                memory::zero(rtn, bytes);
            }
            trace!("MonotonePageResource.alloc_pages returned {}", rtn);
            rtn
        }
    }

    fn accounting(&self) -> &PageAccounting {
        &self.accounting
    }
}

impl MonotonePageResource {
    pub fn new_contiguous(start: Address, bytes: usize) -> Self {
        debug_assert!(is_page_aligned(start) && raw_is_aligned(bytes, crate::util::constants::BYTES_IN_PAGE));
        MonotonePageResource {
            accounting: PageAccounting::new(),
            start,
            sync: Mutex::new(MonotonePageResourceSync {
                cursor: start,
                sentinel: start + bytes,
            }),
        }
    }

    /// The current allocation frontier. Everything in `[start, cursor)` has
    /// been handed out.
    pub fn cursor(&self) -> Address {
        self.sync.lock().unwrap().cursor
    }

    pub fn start(&self) -> Address {
        self.start
    }

    /// Release every page at once, winding the cursor back to the start of
    /// the extent.
    ///
    /// # Safety
    /// The caller must guarantee no live objects remain in the extent.
    pub unsafe fn reset(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.cursor = self.start;
        self.accounting.reset();
    }

    /// Wind the cursor back to `top`, keeping `[start, top)` allocated.
    /// Used after objects have been slid toward the start of the extent.
    ///
    /// # Safety
    /// The caller must guarantee no live objects remain above `top`.
    pub unsafe fn reset_cursor(&self, top: Address) {
        let mut sync = self.sync.lock().unwrap();
        debug_assert!(top >= self.start && top <= sync.sentinel);
        let cursor = top.align_up(crate::util::constants::BYTES_IN_PAGE);
        let pages = bytes_to_pages(cursor - self.start);
        self.accounting.reset();
        self.accounting.reserve_and_commit(pages);
        sync.cursor = cursor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_PAGE;
    use crate::util::heap::pageresource::PageResource;
    use crate::vm::dummyvm::DummyVM;

    // A scratch range outside the heap, never mapped; these tests only
    // exercise cursor arithmetic and accounting, not the backing memory.
    const BASE: Address = unsafe { Address::from_usize(0x7000_0000_0000) };

    fn pr(pages: usize) -> MonotonePageResource {
        MonotonePageResource::new_contiguous(BASE, pages << crate::util::constants::LOG_BYTES_IN_PAGE)
    }

    fn alloc(pr: &MonotonePageResource, pages: usize) -> Address {
        let reserved = PageResource::<DummyVM>::reserve_pages(pr, pages);
        let rtn = PageResource::<DummyVM>::alloc_pages(
            pr,
            reserved,
            pages,
            false,
            OpaquePointer::UNINITIALIZED,
        );
        if rtn.is_zero() {
            PageResource::<DummyVM>::clear_request(pr, reserved);
        }
        rtn
    }

    #[test]
    fn bump_until_sentinel() {
        let pr = pr(4);
        assert_eq!(alloc(&pr, 2), BASE);
        assert_eq!(alloc(&pr, 2), BASE + 2 * BYTES_IN_PAGE);
        assert!(alloc(&pr, 1).is_zero());
        assert_eq!(PageResource::<DummyVM>::committed_pages(&pr), 4);
    }

    #[test]
    fn reset_recycles_the_extent() {
        let pr = pr(4);
        assert_eq!(alloc(&pr, 4), BASE);
        unsafe { pr.reset() };
        assert_eq!(PageResource::<DummyVM>::committed_pages(&pr), 0);
        assert_eq!(alloc(&pr, 4), BASE);
    }

    #[test]
    fn reset_cursor_keeps_prefix() {
        let pr = pr(8);
        let _ = alloc(&pr, 8);
        unsafe { pr.reset_cursor(BASE + 3 * BYTES_IN_PAGE) };
        assert_eq!(pr.cursor(), BASE + 3 * BYTES_IN_PAGE);
        assert_eq!(PageResource::<DummyVM>::committed_pages(&pr), 3);
        assert_eq!(alloc(&pr, 5), BASE + 3 * BYTES_IN_PAGE);
    }
}
