use std::sync::Mutex;

use crate::util::conversions::*;
use crate::util::heap::accounting::PageAccounting;
use crate::util::heap::pageresource::PageResource;
use crate::util::int_array_freelist::{self, IntArrayFreeList};
use crate::util::memory;
use crate::util::Address;
use crate::util::OpaquePointer;
use crate::vm::VMBinding;

/// Page resource over a contiguous extent whose pages are handed out and
/// returned in arbitrary runs. Backed by a coalescing free list keyed by
/// page number, so releasing a run only needs its start address.
pub struct FreeListPageResource {
    accounting: PageAccounting,
    start: Address,
    sync: Mutex<FreeListPageResourceSync>,
}

struct FreeListPageResourceSync {
    free_list: IntArrayFreeList,
    pages_currently_on_freelist: usize,
    highwater_mark: i32,
}

impl<VM: VMBinding> PageResource<VM> for FreeListPageResource {
    fn alloc_pages(
        &self,
        reserved_pages: usize,
        required_pages: usize,
        zeroed: bool,
        tls: OpaquePointer,
    ) -> Address {
        let mut sync = self.sync.lock().unwrap();
        let page_offset = sync.free_list.alloc(required_pages as i32);
        if page_offset == int_array_freelist::FAILURE {
            return unsafe { Address::zero() };
        }
        sync.pages_currently_on_freelist -= required_pages;
        if page_offset > sync.highwater_mark {
            sync.highwater_mark = page_offset;
        }
        let rtn = self.start + pages_to_bytes(page_offset as usize);
        <Self as PageResource<VM>>::commit_pages(self, reserved_pages, required_pages, tls);
        if zeroed {
            memory::zero(rtn, pages_to_bytes(required_pages));
        }
        trace!("FreeListPageResource.alloc_pages returned {}", rtn);
        rtn
    }

    fn accounting(&self) -> &PageAccounting {
        &self.accounting
    }
}

impl FreeListPageResource {
    pub fn new_contiguous(start: Address, bytes: usize) -> Self {
        debug_assert!(is_page_aligned(start));
        let pages = bytes_to_pages(bytes);
        debug_assert!(pages <= int_array_freelist::MAX_UNITS as usize);
        FreeListPageResource {
            accounting: PageAccounting::new(),
            start,
            sync: Mutex::new(FreeListPageResourceSync {
                free_list: IntArrayFreeList::new(pages, pages.max(1) as i32),
                pages_currently_on_freelist: pages,
                highwater_mark: 0,
            }),
        }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    /// Pages sitting on the free list right now.
    pub fn pages_available(&self) -> usize {
        self.sync.lock().unwrap().pages_currently_on_freelist
    }

    /// Return the run of pages starting at `first`. The run's length was
    /// recorded by the free list when it was allocated.
    pub fn release_pages(&self, first: Address) {
        debug_assert!(is_page_aligned(first));
        let page_offset = bytes_to_pages(first - self.start);
        let mut sync = self.sync.lock().unwrap();
        let pages = sync.free_list.size(page_offset as i32);
        debug_assert!(pages as usize <= self.accounting.get_committed_pages());
        self.accounting.release(pages as usize);
        sync.free_list.free(page_offset as i32, true);
        sync.pages_currently_on_freelist += pages as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_PAGE;
    use crate::util::heap::pageresource::PageResource;
    use crate::vm::dummyvm::DummyVM;

    // A scratch range outside the heap, never mapped; these tests exercise
    // the free list and accounting, not the backing memory.
    const BASE: Address = unsafe { Address::from_usize(0x7100_0000_0000) };

    fn pr(pages: usize) -> FreeListPageResource {
        FreeListPageResource::new_contiguous(BASE, pages << crate::util::constants::LOG_BYTES_IN_PAGE)
    }

    fn alloc(pr: &FreeListPageResource, pages: usize) -> Address {
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
    fn runs_are_packed_from_the_bottom() {
        let pr = pr(8);
        assert_eq!(alloc(&pr, 2), BASE);
        assert_eq!(alloc(&pr, 3), BASE + 2 * BYTES_IN_PAGE);
        assert_eq!(PageResource::<DummyVM>::committed_pages(&pr), 5);
        assert_eq!(pr.pages_available(), 3);
    }

    #[test]
    fn released_runs_are_reused() {
        let pr = pr(8);
        let a = alloc(&pr, 2);
        let _b = alloc(&pr, 2);
        pr.release_pages(a);
        assert_eq!(PageResource::<DummyVM>::committed_pages(&pr), 2);
        // the freed run at the bottom is found before the tail run
        assert_eq!(alloc(&pr, 2), a);
    }

    #[test]
    fn release_restores_the_full_extent() {
        let pr = pr(8);
        let a = alloc(&pr, 5);
        assert!(alloc(&pr, 4).is_zero());
        pr.release_pages(a);
        assert_eq!(pr.pages_available(), 8);
        // freed pages coalesce with the tail so a large run fits again
        assert_eq!(alloc(&pr, 8), BASE);
    }

    #[test]
    fn exhaustion_returns_zero() {
        let pr = pr(4);
        assert_eq!(alloc(&pr, 4), BASE);
        assert!(alloc(&pr, 1).is_zero());
        assert_eq!(PageResource::<DummyVM>::committed_pages(&pr), 4);
    }
}
