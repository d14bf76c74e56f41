use crate::plan::selected_plan::SelectedPlan;
use crate::policy::marksweepspace::block::Block;
use crate::policy::marksweepspace::MarkSweepSpace;
use crate::policy::space::Space;
use crate::util::alloc::size_classes::{self, MAX_SMALL_BYTES, SIZE_CLASSES};
use crate::util::alloc::{allocator, Allocator};
use crate::util::conversions;
use crate::util::memory;
use crate::util::{Address, OpaquePointer};
use crate::vm::VMBinding;

/// Segregated free-list allocator over a mark-sweep space. Each size
/// class has a current block whose free-list head and in-use count are
/// cached here, off-block; `flush_free_lists` writes them back into the
/// block headers at collection entry and `restore_free_lists` picks up
/// fresh blocks afterwards.
#[repr(C)]
pub struct FreeListAllocator<VM: VMBinding> {
    pub tls: OpaquePointer,
    space: Option<&'static MarkSweepSpace<VM>>,
    plan: &'static SelectedPlan<VM>,
    free_list: [Address; SIZE_CLASSES],
    current_block: [Block; SIZE_CLASSES],
    in_use: [usize; SIZE_CLASSES],
}

impl<VM: VMBinding> Allocator<VM> for FreeListAllocator<VM> {
    fn get_tls(&self) -> OpaquePointer {
        self.tls
    }

    fn get_space(&self) -> Option<&'static dyn Space<VM>> {
        self.space.map(|s| s as &'static dyn Space<VM>)
    }

    fn get_plan(&self) -> &'static SelectedPlan<VM> {
        self.plan
    }

    fn alloc(&mut self, size: usize, align: usize, offset: isize) -> Address {
        let sc = self.size_class_for(size, align);
        if self.free_list[sc].is_zero() {
            return self.alloc_slow(size, align, offset);
        }
        let cell = self.pop_cell(sc);
        allocator::align_allocation_no_fill::<VM>(cell, align, offset)
    }

    fn alloc_slow_once(&mut self, size: usize, align: usize, offset: isize) -> Address {
        let sc = self.size_class_for(size, align);
        let space = self.space.unwrap();

        // The current block is exhausted; its state must be visible in
        // the header before this thread moves to another block.
        self.flush_size_class(sc);

        // Scan subsequent blocks of this class for one with free cells.
        while let Some(block) = space.pop_available_block(sc) {
            let head = block.free_list_head();
            debug_assert!(!head.is_zero());
            if head.is_zero() {
                continue;
            }
            self.adopt_block(sc, block, head, block.in_use());
            let cell = self.pop_cell(sc);
            return allocator::align_allocation_no_fill::<VM>(cell, align, offset);
        }

        // Nothing has free cells; partition a fresh block.
        let fresh = space.acquire_block(sc, self.tls);
        if fresh.is_zero() {
            return Address::ZERO;
        }
        trace!("fresh block {:?} for size class {}", fresh, sc);
        let head = fresh.make_free_list(sc);
        self.adopt_block(sc, fresh, head, 0);
        let cell = self.pop_cell(sc);
        allocator::align_allocation_no_fill::<VM>(cell, align, offset)
    }
}

impl<VM: VMBinding> FreeListAllocator<VM> {
    pub fn new(
        tls: OpaquePointer,
        space: Option<&'static MarkSweepSpace<VM>>,
        plan: &'static SelectedPlan<VM>,
    ) -> Self {
        FreeListAllocator {
            tls,
            space,
            plan,
            free_list: [Address::ZERO; SIZE_CLASSES],
            current_block: [Block::new(Address::ZERO); SIZE_CLASSES],
            in_use: [0; SIZE_CLASSES],
        }
    }

    fn size_class_for(&self, size: usize, align: usize) -> usize {
        let aligned = allocator::get_maximum_aligned_size::<VM>(
            conversions::raw_align_up(size, VM::MIN_ALIGNMENT),
            align,
            VM::MIN_ALIGNMENT,
        );
        debug_assert!(aligned <= MAX_SMALL_BYTES);
        size_classes::size_class(aligned)
    }

    /// Unlink the head cell and hand it out clean.
    fn pop_cell(&mut self, sc: usize) -> Address {
        let cell = self.free_list[sc];
        debug_assert!(!cell.is_zero());
        self.free_list[sc] = unsafe { cell.load::<Address>() };
        self.in_use[sc] += 1;
        // The allocator, not the caller, guarantees no stale memory
        // escapes.
        memory::zero(cell, size_classes::cell_size(sc));
        cell
    }

    fn adopt_block(&mut self, sc: usize, block: Block, head: Address, in_use: usize) {
        self.current_block[sc] = block;
        self.free_list[sc] = head;
        self.in_use[sc] = in_use;
    }

    /// Write every cached list head and in-use count back into its
    /// block's header so the sweep sees the complete picture.
    pub fn flush_free_lists(&mut self) {
        for sc in 0..SIZE_CLASSES {
            self.flush_size_class(sc);
        }
    }

    fn flush_size_class(&mut self, sc: usize) {
        let block = self.current_block[sc];
        if !block.is_zero() {
            block.store_state(self.free_list[sc], sc, self.in_use[sc]);
            self.current_block[sc] = Block::new(Address::ZERO);
            self.free_list[sc] = Address::ZERO;
            self.in_use[sc] = 0;
        }
    }

    /// Re-read allocation state from the swept block headers, one block
    /// per size class where available.
    pub fn restore_free_lists(&mut self) {
        for sc in 0..SIZE_CLASSES {
            debug_assert!(self.current_block[sc].is_zero());
            if let Some(block) = self.space.unwrap().pop_available_block(sc) {
                let head = block.free_list_head();
                debug_assert!(!head.is_zero());
                self.adopt_block(sc, block, head, block.in_use());
            }
        }
    }
}
