pub const FAILURE: i32 = -1;

const TOTAL_BITS: i32 = 32;
const UNIT_BITS: i32 = TOTAL_BITS - 2;
/// Largest number of units a list can manage.
pub const MAX_UNITS: i32 = ((1 << UNIT_BITS) - 1) - 2;

const NEXT_MASK: i32 = (1 << UNIT_BITS) - 1;
const PREV_MASK: i32 = (1 << UNIT_BITS) - 1;
const FREE_MASK: i32 = 1 << (TOTAL_BITS - 1);
const MULTI_MASK: i32 = 1 << (TOTAL_BITS - 1);
const SIZE_MASK: i32 = (1 << UNIT_BITS) - 1;

/// Doubly-linked free list over a range of equal-sized units, backed by an
/// int array. Each unit has two table entries: the low entry holds the
/// previous link and the free bit, the high entry holds the next link and,
/// for a multi-unit run, its size. Adjacent free runs coalesce on free.
///
/// The list is circular through a head sentinel at unit -1; a second
/// sentinel sits one past the last unit. Sentinels are never free, so
/// coalescing stops at the ends of the range without special cases.
///
/// Not thread safe; callers synchronise externally.
#[derive(Debug)]
pub struct IntArrayFreeList {
    head: i32,
    table: Vec<i32>,
}

impl IntArrayFreeList {
    pub fn new(units: usize, grain: i32) -> Self {
        debug_assert!(units <= MAX_UNITS as usize);
        debug_assert!(grain > 0);
        // head sentinel + units + bottom sentinel, two entries each
        let len = (units + 2) << 1;
        let mut list = IntArrayFreeList {
            head: -1,
            table: vec![0; len],
        };
        list.initialize_units(units as i32, grain);
        list
    }

    /// Allocate `size` contiguous units, first fit. Returns the first unit,
    /// or `FAILURE` if no free run is large enough.
    pub fn alloc(&mut self, size: i32) -> i32 {
        let mut unit = self.head;
        let mut s = 0;
        while ({
            unit = self.get_next(unit);
            unit != self.head
        }) && ({
            s = self.get_size(unit);
            s < size
        }) {}
        if unit == self.head {
            FAILURE
        } else {
            self.alloc_at(size, unit, s)
        }
    }

    /// Allocate `size` units starting exactly at `unit`, which must be the
    /// first unit of a sufficiently large free run.
    pub fn alloc_from_unit(&mut self, size: i32, unit: i32) -> i32 {
        if self.get_free(unit) {
            let s = self.get_size(unit);
            if s >= size {
                return self.alloc_at(size, unit, s);
            }
        }
        FAILURE
    }

    /// Free a previously allocated run, coalescing with free neighbours.
    /// Returns the size of the freed run, or of the whole coalesced run if
    /// `return_coalesced_size` is set.
    pub fn free(&mut self, unit: i32, return_coalesced_size: bool) -> i32 {
        debug_assert!(!self.get_free(unit));
        let mut freed = self.get_size(unit);
        let left = self.get_left(unit);
        let start = if self.get_free(left) { left } else { unit };
        let right = self.get_right(unit);
        let end = if self.get_free(right) { right } else { unit };
        if start != end {
            self.coalesce(start, end);
        }
        if return_coalesced_size {
            freed = self.get_size(start);
        }
        self.add_to_free(start);
        freed
    }

    /// The size of the run starting at `unit`, allocated or free.
    pub fn size(&self, unit: i32) -> i32 {
        self.get_size(unit)
    }

    fn initialize_units(&mut self, units: i32, grain: i32) {
        self.set_sentinel(-1);
        self.set_sentinel(units);

        // thread the units onto the free list, grain units at a time
        let offset = units % grain;
        let mut cursor = units - offset;
        if offset > 0 {
            self.set_size(cursor, offset);
            self.add_to_free(cursor);
        }
        cursor -= grain;
        while cursor >= 0 {
            self.set_size(cursor, grain);
            self.add_to_free(cursor);
            cursor -= grain;
        }
    }

    fn add_to_free(&mut self, unit: i32) {
        self.set_free(unit, true);
        let next = self.get_next(self.head);
        self.set_next(unit, next);
        let head = self.head;
        self.set_next(head, unit);
        self.set_prev(unit, head);
        self.set_prev(next, unit);
    }

    fn get_right(&self, unit: i32) -> i32 {
        unit + self.get_size(unit)
    }

    fn set_sentinel(&mut self, unit: i32) {
        self.set_lo_entry(unit, PREV_MASK & unit);
        self.set_hi_entry(unit, NEXT_MASK & unit);
    }

    fn get_size(&self, unit: i32) -> i32 {
        if (self.get_hi_entry(unit) & MULTI_MASK) == MULTI_MASK {
            self.get_hi_entry(unit + 1) & SIZE_MASK
        } else {
            1
        }
    }

    fn set_size(&mut self, unit: i32, size: i32) {
        let hi = self.get_hi_entry(unit);
        if size > 1 {
            self.set_hi_entry(unit, hi | MULTI_MASK);
            self.set_hi_entry(unit + 1, MULTI_MASK | size);
            self.set_hi_entry(unit + size - 1, MULTI_MASK | size);
        } else {
            self.set_hi_entry(unit, hi & !MULTI_MASK);
        }
    }

    fn get_free(&self, unit: i32) -> bool {
        (self.get_lo_entry(unit) & FREE_MASK) == FREE_MASK
    }

    fn set_free(&mut self, unit: i32, is_free: bool) {
        let lo = self.get_lo_entry(unit);
        if is_free {
            self.set_lo_entry(unit, lo | FREE_MASK);
            let size = self.get_size(unit);
            if size > 1 {
                let last = self.get_lo_entry(unit + size - 1);
                self.set_lo_entry(unit + size - 1, last | FREE_MASK);
            }
        } else {
            self.set_lo_entry(unit, lo & !FREE_MASK);
            let size = self.get_size(unit);
            if size > 1 {
                let last = self.get_lo_entry(unit + size - 1);
                self.set_lo_entry(unit + size - 1, last & !FREE_MASK);
            }
        }
    }

    fn get_next(&self, unit: i32) -> i32 {
        let next = self.get_hi_entry(unit) & NEXT_MASK;
        if next <= MAX_UNITS {
            next
        } else {
            self.head
        }
    }

    fn set_next(&mut self, unit: i32, next: i32) {
        debug_assert!((-1..=MAX_UNITS).contains(&next));
        let old = self.get_hi_entry(unit);
        self.set_hi_entry(unit, (old & !NEXT_MASK) | (next & NEXT_MASK));
    }

    fn get_prev(&self, unit: i32) -> i32 {
        let prev = self.get_lo_entry(unit) & PREV_MASK;
        if prev <= MAX_UNITS {
            prev
        } else {
            self.head
        }
    }

    fn set_prev(&mut self, unit: i32, prev: i32) {
        debug_assert!((-1..=MAX_UNITS).contains(&prev));
        let old = self.get_lo_entry(unit);
        self.set_lo_entry(unit, (old & !PREV_MASK) | (prev & PREV_MASK));
    }

    // The left neighbour; the first unit of it if it is a multi-unit run.
    fn get_left(&self, unit: i32) -> i32 {
        if (self.get_hi_entry(unit - 1) & MULTI_MASK) == MULTI_MASK {
            unit - (self.get_hi_entry(unit - 1) & SIZE_MASK)
        } else {
            unit - 1
        }
    }

    fn get_lo_entry(&self, unit: i32) -> i32 {
        self.table[((unit + 1) << 1) as usize]
    }

    fn get_hi_entry(&self, unit: i32) -> i32 {
        self.table[(((unit + 1) << 1) + 1) as usize]
    }

    fn set_lo_entry(&mut self, unit: i32, value: i32) {
        self.table[((unit + 1) << 1) as usize] = value;
    }

    fn set_hi_entry(&mut self, unit: i32, value: i32) {
        self.table[(((unit + 1) << 1) + 1) as usize] = value;
    }

    fn alloc_at(&mut self, size: i32, unit: i32, unit_size: i32) -> i32 {
        if unit_size >= size {
            if unit_size > size {
                self.split(unit, size);
            }
            self.remove_from_free(unit);
            self.set_free(unit, false);
        }
        unit
    }

    fn split(&mut self, unit: i32, size: i32) {
        let basesize = self.get_size(unit);
        debug_assert!(basesize > size);
        self.set_size(unit, size);
        self.set_size(unit + size, basesize - size);
        self.add_to_free(unit + size);
    }

    fn coalesce(&mut self, start: i32, end: i32) {
        if self.get_free(end) {
            self.remove_from_free(end);
        }
        if self.get_free(start) {
            self.remove_from_free(start);
        }
        let size = self.get_size(end);
        self.set_size(start, end - start + size);
    }

    fn remove_from_free(&mut self, unit: i32) {
        let next = self.get_next(unit);
        let prev = self.get_prev(unit);
        self.set_next(prev, next);
        self.set_prev(next, prev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_list_allocates_from_the_bottom() {
        let mut list = IntArrayFreeList::new(4, 4);
        assert_eq!(list.alloc(2), 0);
        assert_eq!(list.alloc(2), 2);
        assert_eq!(list.alloc(1), FAILURE);
    }

    #[test]
    fn size_is_remembered_while_allocated() {
        let mut list = IntArrayFreeList::new(8, 8);
        let unit = list.alloc(3);
        assert_eq!(unit, 0);
        assert_eq!(list.size(unit), 3);
    }

    #[test]
    fn free_coalesces_neighbours() {
        let mut list = IntArrayFreeList::new(4, 4);
        let a = list.alloc(2);
        let b = list.alloc(2);
        assert_eq!(list.free(a, false), 2);
        assert_eq!(list.free(b, true), 4);
        assert_eq!(list.alloc(4), 0);
    }

    #[test]
    fn grain_bounds_a_fresh_allocation() {
        let mut list = IntArrayFreeList::new(8, 4);
        assert_eq!(list.alloc(8), FAILURE);
        let a = list.alloc(4);
        let b = list.alloc(4);
        list.free(a, false);
        list.free(b, false);
        // coalescing across the grain boundary makes the full run available
        assert_eq!(list.alloc(8), 0);
    }

    #[test]
    fn alloc_from_unit_carves_a_run_start() {
        let mut list = IntArrayFreeList::new(8, 8);
        assert_eq!(list.alloc_from_unit(2, 0), 0);
        // unit 2 now starts the remaining free run
        assert_eq!(list.alloc_from_unit(2, 2), 2);
        // interior units are not run starts
        assert_eq!(list.alloc_from_unit(1, 5), FAILURE);
    }

    #[test]
    fn remainder_units_are_usable() {
        let mut list = IntArrayFreeList::new(10, 4);
        // runs are threaded [8,10), [4,8), [0,4), bottom first on the list
        assert_eq!(list.alloc(4), 0);
        assert_eq!(list.alloc(4), 4);
        assert_eq!(list.alloc(2), 8);
        assert_eq!(list.alloc(1), FAILURE);
    }
}
