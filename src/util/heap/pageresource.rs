use std::sync::atomic::{AtomicUsize, Ordering};

use crate::util::heap::accounting::PageAccounting;
use crate::util::Address;
use crate::util::OpaquePointer;
use crate::vm::{ActivePlan, VMBinding};

static CUMULATIVE_COMMITTED: AtomicUsize = AtomicUsize::new(0);

/// A page resource hands out pages from a space's contiguous extent and
/// accounts for them. Reservation precedes allocation; the reservation is
/// either committed (on success) or cleared (on failure).
pub trait PageResource<VM: VMBinding>: 'static {
    /// Bump the reservation ahead of an allocation attempt. Returns the
    /// number of pages reserved, which the caller must later pass to either
    /// `commit_pages` (via `alloc_pages`) or `clear_request`.
    fn reserve_pages(&self, pages: usize) -> usize {
        self.accounting().reserve(pages);
        pages
    }

    /// Back out a reservation that could not be satisfied.
    fn clear_request(&self, reserved_pages: usize) {
        self.accounting().clear_reserved(reserved_pages);
    }

    /// Allocate `required_pages` pages. Returns the start of the first page,
    /// or a zero address if the resource is exhausted.
    fn alloc_pages(
        &self,
        reserved_pages: usize,
        required_pages: usize,
        zeroed: bool,
        tls: OpaquePointer,
    ) -> Address;

    /// Commit pages to the page budget. Called by each page resource from
    /// within a successful `alloc_pages`, with its lock held. Accounts for
    /// any discrepancy between the original reservation and the pages
    /// actually handed out.
    fn commit_pages(&self, reserved_pages: usize, actual_pages: usize, tls: OpaquePointer) {
        debug_assert!(actual_pages >= reserved_pages);
        let delta = actual_pages - reserved_pages;
        if delta != 0 {
            self.accounting().reserve(delta);
        }
        self.accounting().commit(actual_pages);
        if unsafe { VM::VMActivePlan::is_mutator(tls) } {
            CUMULATIVE_COMMITTED.fetch_add(actual_pages, Ordering::Relaxed);
        }
    }

    fn reserved_pages(&self) -> usize {
        self.accounting().get_reserved_pages()
    }

    fn committed_pages(&self) -> usize {
        self.accounting().get_committed_pages()
    }

    fn accounting(&self) -> &PageAccounting;
}

/// Total pages ever committed on behalf of mutators, across all spaces.
pub fn cumulative_committed_pages() -> usize {
    CUMULATIVE_COMMITTED.load(Ordering::Relaxed)
}
