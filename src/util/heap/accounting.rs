use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Page usage for a page resource. Reservation happens before an allocation
/// is attempted, commit happens once the pages are actually handed out, so
/// the two counters may legitimately disagree while a request is in flight.
pub struct PageAccounting {
    /// Pages reserved ahead of an allocation attempt.
    reserved: AtomicUsize,
    /// Pages successfully allocated to the space.
    committed: AtomicUsize,
}

impl PageAccounting {
    pub fn new() -> Self {
        Self {
            reserved: AtomicUsize::new(0),
            committed: AtomicUsize::new(0),
        }
    }

    /// Reserve and commit in one step, for allocations that cannot fail.
    pub fn reserve_and_commit(&self, pages: usize) {
        self.reserved.fetch_add(pages, Ordering::Relaxed);
        self.committed.fetch_add(pages, Ordering::Relaxed);
    }

    /// Reserve pages ahead of an allocation attempt.
    pub fn reserve(&self, pages: usize) {
        self.reserved.fetch_add(pages, Ordering::Relaxed);
    }

    /// Back out a reservation after a failed allocation attempt so a later
    /// attempt can reserve again.
    pub fn clear_reserved(&self, pages: usize) {
        let _prev = self.reserved.fetch_sub(pages, Ordering::Relaxed);
        debug_assert!(_prev >= pages);
    }

    /// Commit pages once the underlying memory has been handed out.
    pub fn commit(&self, pages: usize) {
        self.committed.fetch_add(pages, Ordering::Relaxed);
    }

    /// Return pages. Deducts from both reserved and committed.
    pub fn release(&self, pages: usize) {
        let _prev_reserved = self.reserved.fetch_sub(pages, Ordering::Relaxed);
        debug_assert!(_prev_reserved >= pages);

        let _prev_committed = self.committed.fetch_sub(pages, Ordering::Relaxed);
        debug_assert!(_prev_committed >= pages);
    }

    /// Zero both counters. Only used when a space is entirely emptied.
    pub fn reset(&self) {
        self.reserved.store(0, Ordering::Relaxed);
        self.committed.store(0, Ordering::Relaxed);
    }

    pub fn get_reserved_pages(&self) -> usize {
        self.reserved.load(Ordering::Relaxed)
    }

    pub fn get_committed_pages(&self) -> usize {
        self.committed.load(Ordering::Relaxed)
    }
}

impl Default for PageAccounting {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_then_commit() {
        let accounting = PageAccounting::new();
        accounting.reserve(8);
        assert_eq!(accounting.get_reserved_pages(), 8);
        assert_eq!(accounting.get_committed_pages(), 0);
        accounting.commit(8);
        assert_eq!(accounting.get_reserved_pages(), 8);
        assert_eq!(accounting.get_committed_pages(), 8);
    }

    #[test]
    fn failed_reservation_is_cleared() {
        let accounting = PageAccounting::new();
        accounting.reserve(8);
        accounting.clear_reserved(8);
        assert_eq!(accounting.get_reserved_pages(), 0);
        assert_eq!(accounting.get_committed_pages(), 0);
    }

    #[test]
    fn release_deducts_both() {
        let accounting = PageAccounting::new();
        accounting.reserve_and_commit(16);
        accounting.release(10);
        assert_eq!(accounting.get_reserved_pages(), 6);
        assert_eq!(accounting.get_committed_pages(), 6);
    }
}
