use std::collections::HashSet;
use std::mem::swap;
use std::sync::Mutex;

use crate::util::Address;

/// Membership sets for large-object cells. Allocation lands in the
/// nursery; `flip` condemns the nursery (and, on a full-heap
/// collection, the to-space), tracing rescues survivors with `copy`,
/// and whatever stays condemned after the trace is garbage.
#[derive(Debug, Default)]
pub struct TreadMill {
    from_space: Mutex<HashSet<Address>>,
    to_space: Mutex<HashSet<Address>>,
    collect_nursery: Mutex<HashSet<Address>>,
    alloc_nursery: Mutex<HashSet<Address>>,
}

impl TreadMill {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_to_treadmill(&self, cell: Address, nursery: bool) {
        if nursery {
            trace!("adding {} to nursery", cell);
            self.alloc_nursery.lock().unwrap().insert(cell);
        } else {
            trace!("adding {} to to_space", cell);
            self.to_space.lock().unwrap().insert(cell);
        }
    }

    /// Drain the condemned nursery set.
    pub fn collect_nursery(&self) -> Vec<Address> {
        let mut guard = self.collect_nursery.lock().unwrap();
        let vals = guard.iter().copied().collect();
        guard.clear();
        vals
    }

    /// Drain the condemned from-space set.
    pub fn collect(&self) -> Vec<Address> {
        let mut guard = self.from_space.lock().unwrap();
        let vals = guard.iter().copied().collect();
        guard.clear();
        vals
    }

    /// Move a surviving cell out of its condemned set.
    pub fn copy(&self, cell: Address, is_in_nursery: bool) {
        if is_in_nursery {
            let mut guard = self.collect_nursery.lock().unwrap();
            debug_assert!(guard.contains(&cell), "{} was not condemned", cell);
            guard.remove(&cell);
        } else {
            let mut guard = self.from_space.lock().unwrap();
            debug_assert!(guard.contains(&cell), "{} was not condemned", cell);
            guard.remove(&cell);
        }
        self.to_space.lock().unwrap().insert(cell);
    }

    pub fn is_to_space_empty(&self) -> bool {
        self.to_space.lock().unwrap().is_empty()
    }

    pub fn is_from_space_empty(&self) -> bool {
        self.from_space.lock().unwrap().is_empty()
    }

    pub fn is_nursery_empty(&self) -> bool {
        self.collect_nursery.lock().unwrap().is_empty()
    }

    pub fn flip(&self, full_heap: bool) {
        {
            let mut alloc = self.alloc_nursery.lock().unwrap();
            let mut collect = self.collect_nursery.lock().unwrap();
            swap(&mut *alloc, &mut *collect);
        }
        if full_heap {
            let mut from = self.from_space.lock().unwrap();
            let mut to = self.to_space.lock().unwrap();
            swap(&mut *from, &mut *to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(v: usize) -> Address {
        unsafe { Address::from_usize(v) }
    }

    #[test]
    fn survivors_dodge_the_sweep() {
        let treadmill = TreadMill::new();
        treadmill.add_to_treadmill(addr(0x1000), true);
        treadmill.add_to_treadmill(addr(0x2000), true);
        treadmill.add_to_treadmill(addr(0x3000), false);

        treadmill.flip(true);
        assert!(!treadmill.is_nursery_empty());
        assert!(!treadmill.is_from_space_empty());
        assert!(treadmill.is_to_space_empty());

        // 0x1000 is reached by the trace, the others are not.
        treadmill.copy(addr(0x1000), true);

        assert_eq!(treadmill.collect_nursery(), vec![addr(0x2000)]);
        assert_eq!(treadmill.collect(), vec![addr(0x3000)]);

        assert!(!treadmill.is_to_space_empty());
        assert!(treadmill.is_nursery_empty());
        assert!(treadmill.is_from_space_empty());
    }

    #[test]
    fn flip_retires_the_to_space_only_on_full_heap() {
        let treadmill = TreadMill::new();
        treadmill.add_to_treadmill(addr(0x5000), false);

        treadmill.flip(false);
        assert!(treadmill.is_from_space_empty());
        assert!(!treadmill.is_to_space_empty());

        treadmill.flip(true);
        assert!(!treadmill.is_from_space_empty());
        assert!(treadmill.is_to_space_empty());
    }
}
