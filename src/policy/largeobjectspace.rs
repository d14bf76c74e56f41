use std::sync::atomic::{AtomicUsize, Ordering};

use crate::plan::TransitiveClosure;
use crate::policy::space::{CommonSpace, Space};
use crate::util::constants::{BYTES_IN_PAGE, BYTES_IN_WORD};
use crate::util::heap::{FreeListPageResource, HeapMeta, PageResource, VMRequest};
use crate::util::treadmill::TreadMill;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{ObjectModel, VMBinding};

/// Every large object owns whole pages and starts with a two word
/// header on its first page; word 0 records the page count, making the
/// superpage self-describing.
pub const SUPERPAGE_HEADER_BYTES: usize = 2 * BYTES_IN_WORD;

const MARK_BIT: usize = 0b01;
const NURSERY_BIT: usize = 0b10;
const LOS_BIT_MASK: usize = 0b11;

/// Page-grained space for objects too big for any size class. Objects
/// never move; liveness is a mark bit plus treadmill membership.
pub struct LargeObjectSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: FreeListPageResource,
    mark_state: AtomicUsize,
    treadmill: TreadMill,
}

impl<VM: VMBinding> Space<VM> for LargeObjectSpace<VM> {
    fn as_space(&self) -> &dyn Space<VM> {
        self
    }

    fn common(&self) -> &CommonSpace<VM> {
        &self.common
    }

    fn page_resource(&self) -> &dyn PageResource<VM> {
        &self.pr
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        self.test_mark_bit(object, self.mark_state.load(Ordering::SeqCst))
    }
}

impl<VM: VMBinding> LargeObjectSpace<VM> {
    pub fn new(
        name: &'static str,
        zeroed: bool,
        vmrequest: VMRequest,
        heap: &mut HeapMeta,
    ) -> Self {
        let common = CommonSpace::new(name, false, false, zeroed, vmrequest, heap);
        LargeObjectSpace {
            pr: FreeListPageResource::new_contiguous(common.start, common.extent),
            common,
            mark_state: AtomicUsize::new(0),
            treadmill: TreadMill::new(),
        }
    }

    pub fn prepare(&self, full_heap: bool) {
        if full_heap {
            debug_assert!(self.treadmill.is_from_space_empty());
            let state = self.mark_state.load(Ordering::SeqCst);
            self.mark_state.store(MARK_BIT - state, Ordering::SeqCst);
        }
        self.treadmill.flip(full_heap);
    }

    pub fn release(&self, full_heap: bool) {
        self.sweep_large_pages(true);
        debug_assert!(self.treadmill.is_nursery_empty());
        if full_heap {
            self.sweep_large_pages(false);
        }
    }

    fn sweep_large_pages(&self, sweep_nursery: bool) {
        let cells = if sweep_nursery {
            self.treadmill.collect_nursery()
        } else {
            self.treadmill.collect()
        };
        for cell in cells {
            self.pr.release_pages(get_super_page(cell));
        }
    }

    /// Obtain `pages` pages for one object, stamping the superpage
    /// header. Zero on failure, in which case a collection has been
    /// triggered.
    pub fn allocate_pages(&self, tls: OpaquePointer, pages: usize) -> Address {
        let sp = self.acquire(tls, pages);
        if !sp.is_zero() {
            unsafe { sp.store::<usize>(pages) };
        }
        sp
    }

    /// Stamp a fresh or freshly copied object and enter it into the
    /// treadmill.
    pub fn initialize_header(&self, object: ObjectReference, alloc: bool) {
        let old_value = VM::VMObjectModel::read_available_bits_word(object);
        let mut new_value = (old_value & !LOS_BIT_MASK) | self.mark_state.load(Ordering::SeqCst);
        if alloc {
            new_value |= NURSERY_BIT;
        }
        VM::VMObjectModel::write_available_bits_word(object, new_value);
        let cell = VM::VMObjectModel::object_start_ref(object);
        self.treadmill.add_to_treadmill(cell, alloc);
    }

    pub fn trace_object<T: TransitiveClosure>(
        &self,
        trace: &mut T,
        object: ObjectReference,
    ) -> ObjectReference {
        let nursery_object = self.is_in_nursery(object);
        if self.test_and_mark(object, self.mark_state.load(Ordering::SeqCst)) {
            let cell = VM::VMObjectModel::object_start_ref(object);
            self.treadmill.copy(cell, nursery_object);
            trace.process_node(object);
        }
        object
    }

    /// Atomically set the mark bit, clearing the nursery bit alongside
    /// it. True for the tracer that won the race.
    fn test_and_mark(&self, object: ObjectReference, value: usize) -> bool {
        loop {
            let old_value = VM::VMObjectModel::prepare_available_bits(object);
            if old_value & MARK_BIT == value {
                return false;
            }
            if VM::VMObjectModel::attempt_available_bits(
                object,
                old_value,
                (old_value & !LOS_BIT_MASK) | value,
            ) {
                return true;
            }
        }
    }

    fn test_mark_bit(&self, object: ObjectReference, value: usize) -> bool {
        VM::VMObjectModel::read_available_bits_word(object) & MARK_BIT == value
    }

    pub fn is_in_nursery(&self, object: ObjectReference) -> bool {
        VM::VMObjectModel::read_available_bits_word(object) & NURSERY_BIT == NURSERY_BIT
    }
}

fn get_super_page(cell: Address) -> Address {
    cell.align_down(BYTES_IN_PAGE)
}
