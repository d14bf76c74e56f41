use spin::Mutex;

use crate::plan::TransitiveClosure;
use crate::policy::space::{CommonSpace, Space};
use crate::util::alloc::allocator::align_allocation_no_fill;
use crate::util::constants::{BYTES_IN_WORD, LOG_BYTES_IN_WORD};
use crate::util::heap::{HeapMeta, MonotonePageResource, PageResource, VMRequest};
use crate::util::{memory, Address, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};

const GC_MARK_BIT_MASK: usize = 1;

pub const GC_EXTRA_HEADER_WORDS: usize = 1;
const GC_EXTRA_HEADER_BYTES: usize = GC_EXTRA_HEADER_WORDS << LOG_BYTES_IN_WORD;

/// Space collected by sliding live objects toward its start.
///
/// Each object is preceded by one reserved word that holds its forwarding
/// address between the two transitive closures. Collection runs the mark
/// closure, assigns forwarding addresses in a single address-ordered walk,
/// runs the forwarding closure to update references, then slides the
/// objects and winds the page cursor back to the end of the live data.
///
/// The walks are driven by a log of (start, end) bump regions retired by
/// the allocators. After compaction the log collapses to the single region
/// of compacted data.
pub struct MarkCompactSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: MonotonePageResource,
    regions: Mutex<Vec<(Address, Address)>>,
}

impl<VM: VMBinding> Space<VM> for MarkCompactSpace<VM> {
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
        // Only meaningful up to the forwarding closure, which consumes the
        // mark bits as it goes.
        Self::is_marked(object)
    }
}

impl<VM: VMBinding> MarkCompactSpace<VM> {
    pub const HEADER_RESERVED_IN_BYTES: usize = if VM::MAX_ALIGNMENT > GC_EXTRA_HEADER_BYTES {
        VM::MAX_ALIGNMENT
    } else {
        GC_EXTRA_HEADER_BYTES
    }
    .next_power_of_two();

    pub fn new(
        name: &'static str,
        zeroed: bool,
        vmrequest: VMRequest,
        heap: &mut HeapMeta,
    ) -> Self {
        let common = CommonSpace::new(name, true, false, zeroed, vmrequest, heap);
        MarkCompactSpace {
            pr: MonotonePageResource::new_contiguous(common.start, common.extent),
            common,
            regions: Mutex::new(Vec::new()),
        }
    }

    pub fn prepare(&self) {}

    pub fn release(&self) {}

    /// Record a retired bump region so the compacting walks can find the
    /// objects inside it.
    pub fn record_region(&self, start: Address, end: Address) {
        debug_assert!(start <= end);
        debug_assert!(self.address_in_space(start));
        if start != end {
            self.regions.lock().push((start, end));
        }
    }

    pub fn trace_mark_object<T: TransitiveClosure>(
        &self,
        trace: &mut T,
        object: ObjectReference,
    ) -> ObjectReference {
        if Self::test_and_mark(object) {
            trace.process_node(object);
        }
        object
    }

    pub fn trace_forward_object<T: TransitiveClosure>(
        &self,
        trace: &mut T,
        object: ObjectReference,
    ) -> ObjectReference {
        // The mark bit is no longer needed once an object has been pushed
        // through the second closure, so it doubles as the "seen" bit.
        if Self::test_and_clear_mark(object) {
            trace.process_node(object);
        }
        let forwarding_pointer =
            unsafe { (object.to_address() - GC_EXTRA_HEADER_BYTES).load::<Address>() };
        VM::VMObjectModel::get_reference_when_copied_to(
            object,
            forwarding_pointer + Self::HEADER_RESERVED_IN_BYTES,
        )
    }

    pub fn test_and_mark(object: ObjectReference) -> bool {
        loop {
            let old_value = VM::VMObjectModel::prepare_available_bits(object);
            if old_value & GC_MARK_BIT_MASK != 0 {
                return false;
            }
            if VM::VMObjectModel::attempt_available_bits(
                object,
                old_value,
                old_value | GC_MARK_BIT_MASK,
            ) {
                return true;
            }
        }
    }

    pub fn test_and_clear_mark(object: ObjectReference) -> bool {
        loop {
            let old_value = VM::VMObjectModel::prepare_available_bits(object);
            if old_value & GC_MARK_BIT_MASK == 0 {
                return false;
            }
            if VM::VMObjectModel::attempt_available_bits(
                object,
                old_value,
                old_value & !GC_MARK_BIT_MASK,
            ) {
                return true;
            }
        }
    }

    pub fn is_marked(object: ObjectReference) -> bool {
        VM::VMObjectModel::read_available_bits_word(object) & GC_MARK_BIT_MASK != 0
    }

    fn to_be_compacted(object: ObjectReference) -> bool {
        Self::is_marked(object)
    }

    /// Assign a forwarding address to every marked object, walking the
    /// retired regions in address order and packing the targets from the
    /// start of the space. The address lands in the word reserved ahead of
    /// the object; unmarked objects keep a zero there.
    pub fn calculate_forwarding_pointer(&self) {
        let mut regions = self.regions.lock();
        regions.sort_unstable();
        let mut to = self.common.start;
        for &(start, end) in regions.iter() {
            let mut addr = start;
            while addr < end {
                let object = unsafe {
                    VM::VMObjectModel::get_object_from_start_address(
                        addr + Self::HEADER_RESERVED_IN_BYTES,
                    )
                };
                let size = VM::VMObjectModel::get_current_size(object);
                if Self::to_be_compacted(object) {
                    let copied_size = VM::VMObjectModel::get_size_when_copied(object)
                        + Self::HEADER_RESERVED_IN_BYTES;
                    let align = VM::VMObjectModel::get_align_when_copied(object);
                    let offset = VM::VMObjectModel::get_align_offset_when_copied(object);
                    to = align_allocation_no_fill::<VM>(to, align, offset);
                    unsafe { (object.to_address() - GC_EXTRA_HEADER_BYTES).store(to) };
                    to += copied_size;
                }
                addr = (object.to_address() + size).align_up(BYTES_IN_WORD);
            }
        }
    }

    /// Slide every forwarded object to its target. Targets never exceed
    /// their sources, so an ascending walk copies each object before the
    /// slide can overwrite it.
    pub fn compact(&self) {
        let mut regions = self.regions.lock();
        let mut to = self.common.start;
        for &(start, end) in regions.iter() {
            let mut addr = start;
            while addr < end {
                let object = unsafe {
                    VM::VMObjectModel::get_object_from_start_address(
                        addr + Self::HEADER_RESERVED_IN_BYTES,
                    )
                };
                let size = VM::VMObjectModel::get_current_size(object);
                addr = (object.to_address() + size).align_up(BYTES_IN_WORD);

                let slot = object.to_address() - GC_EXTRA_HEADER_BYTES;
                let forwarding_pointer = unsafe { slot.load::<Address>() };
                if !forwarding_pointer.is_zero() {
                    let copied_size = VM::VMObjectModel::get_size_when_copied(object)
                        + Self::HEADER_RESERVED_IN_BYTES;
                    let target = VM::VMObjectModel::get_reference_when_copied_to(
                        object,
                        forwarding_pointer + Self::HEADER_RESERVED_IN_BYTES,
                    );
                    // Both copies of the forwarding word go back to zero
                    // before the payload moves over them.
                    memory::zero(
                        forwarding_pointer + Self::HEADER_RESERVED_IN_BYTES
                            - GC_EXTRA_HEADER_BYTES,
                        GC_EXTRA_HEADER_BYTES,
                    );
                    memory::zero(slot, GC_EXTRA_HEADER_BYTES);
                    VM::VMObjectModel::copy_to(object, target, Address::ZERO);
                    to = forwarding_pointer + copied_size;
                }
            }
        }
        unsafe { self.pr.reset_cursor(to) };
        regions.clear();
        if to > self.common.start {
            regions.push((self.common.start, to));
        }
        trace!(
            "[{}] compacted to {}",
            self.common.name,
            to
        );
    }
}
