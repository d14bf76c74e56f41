use super::allocator::{align_allocation_no_fill, fill_alignment_gap};
use crate::plan::selected_plan::SelectedPlan;
use crate::policy::markcompactspace::MarkCompactSpace;
use crate::policy::space::Space;
use crate::util::alloc::Allocator;
use crate::util::constants::BYTES_IN_PAGE;
use crate::util::conversions::bytes_to_pages;
use crate::util::{Address, OpaquePointer};
use crate::vm::VMBinding;

const BLOCK_SIZE: usize = 8 * BYTES_IN_PAGE;
const BLOCK_MASK: usize = BLOCK_SIZE - 1;

/// Bump allocator that reserves a forwarding word ahead of every object
/// and retires each finished bump region to its space, so the compacting
/// walks can enumerate what was allocated.
#[repr(C)]
pub struct MarkCompactAllocator<VM: VMBinding> {
    pub tls: OpaquePointer,
    cursor: Address,
    limit: Address,
    /// Start of the bump region the cursor is currently inside.
    region: Address,
    space: Option<&'static MarkCompactSpace<VM>>,
    plan: &'static SelectedPlan<VM>,
}

impl<VM: VMBinding> MarkCompactAllocator<VM> {
    pub fn set_limit(&mut self, cursor: Address, limit: Address) {
        self.cursor = cursor;
        self.limit = limit;
    }

    /// Retire the active region to the space and drop the buffer. The
    /// buffer cannot survive a collection, since compaction reclaims the
    /// unused tail of every region.
    pub fn flush(&mut self) {
        self.retire_region();
        self.cursor = Address::ZERO;
        self.limit = Address::ZERO;
    }

    fn retire_region(&mut self) {
        if !self.region.is_zero() {
            self.space.unwrap().record_region(self.region, self.cursor);
            self.region = Address::ZERO;
        }
    }

    fn alloc_cell(&mut self, size: usize, align: usize, offset: isize) -> Address {
        let result = align_allocation_no_fill::<VM>(self.cursor, align, offset);
        let new_cursor = result + size;
        if new_cursor > self.limit {
            trace!("Thread local buffer used up, go to alloc slow path");
            self.alloc_slow(size, align, offset)
        } else {
            fill_alignment_gap::<VM>(self.cursor, result);
            self.cursor = new_cursor;
            result
        }
    }
}

impl<VM: VMBinding> Allocator<VM> for MarkCompactAllocator<VM> {
    fn get_space(&self) -> Option<&'static dyn Space<VM>> {
        self.space.map(|s| s as &'static dyn Space<VM>)
    }

    fn get_plan(&self) -> &'static SelectedPlan<VM> {
        self.plan
    }

    fn get_tls(&self) -> OpaquePointer {
        self.tls
    }

    fn alloc(&mut self, size: usize, align: usize, offset: isize) -> Address {
        trace!("alloc");
        let cell = self.alloc_cell(
            size + MarkCompactSpace::<VM>::HEADER_RESERVED_IN_BYTES,
            align,
            offset,
        );
        if cell.is_zero() {
            cell
        } else {
            cell + MarkCompactSpace::<VM>::HEADER_RESERVED_IN_BYTES
        }
    }

    // `size` arrives here already padded with the forwarding word.
    fn alloc_slow_once(&mut self, size: usize, align: usize, offset: isize) -> Address {
        trace!("alloc_slow");
        let block_size = (size + BLOCK_MASK) & (!BLOCK_MASK);
        let acquired_start = self
            .space
            .unwrap()
            .acquire(self.tls, bytes_to_pages(block_size));
        if acquired_start.is_zero() {
            trace!("Failed to acquire a new block");
            acquired_start
        } else {
            trace!(
                "Acquired a new block of size {} with start address {}",
                block_size,
                acquired_start
            );
            self.retire_region();
            self.region = acquired_start;
            self.set_limit(acquired_start, acquired_start + block_size);
            self.alloc_cell(size, align, offset)
        }
    }
}

impl<VM: VMBinding> MarkCompactAllocator<VM> {
    pub fn new(
        tls: OpaquePointer,
        space: Option<&'static MarkCompactSpace<VM>>,
        plan: &'static SelectedPlan<VM>,
    ) -> Self {
        MarkCompactAllocator {
            tls,
            cursor: Address::ZERO,
            limit: Address::ZERO,
            region: Address::ZERO,
            space,
            plan,
        }
    }
}
