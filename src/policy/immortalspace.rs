use std::sync::atomic::{AtomicUsize, Ordering};

use crate::plan::TransitiveClosure;
use crate::policy::space::{CommonSpace, Space};
use crate::util::heap::{HeapMeta, MonotonePageResource, PageResource, VMRequest};
use crate::util::ObjectReference;
use crate::vm::{ObjectModel, VMBinding};

const GC_MARK_BIT_MASK: usize = 1;

/// A space that never reclaims. Objects are still traced once per
/// collection so the closure reaches everything they point at.
pub struct ImmortalSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: MonotonePageResource,
    mark_state: AtomicUsize,
}

impl<VM: VMBinding> Space<VM> for ImmortalSpace<VM> {
    fn as_space(&self) -> &dyn Space<VM> {
        self
    }

    fn common(&self) -> &CommonSpace<VM> {
        &self.common
    }

    fn page_resource(&self) -> &dyn PageResource<VM> {
        &self.pr
    }

    fn is_live(&self, _object: ObjectReference) -> bool {
        true
    }
}

impl<VM: VMBinding> ImmortalSpace<VM> {
    pub fn new(
        name: &'static str,
        zeroed: bool,
        vmrequest: VMRequest,
        heap: &mut HeapMeta,
    ) -> Self {
        let common = CommonSpace::new(name, false, true, zeroed, vmrequest, heap);
        ImmortalSpace {
            pr: MonotonePageResource::new_contiguous(common.start, common.extent),
            common,
            mark_state: AtomicUsize::new(0),
        }
    }

    /// New objects are born with the current mark state.
    pub fn initialize_header(&self, object: ObjectReference) {
        let old_value = VM::VMObjectModel::read_available_bits_word(object);
        let new_value = (old_value & !GC_MARK_BIT_MASK) | self.mark_state.load(Ordering::SeqCst);
        VM::VMObjectModel::write_available_bits_word(object, new_value);
    }

    fn test_and_mark(object: ObjectReference, value: usize) -> bool {
        loop {
            let old_value = VM::VMObjectModel::prepare_available_bits(object);
            if old_value & GC_MARK_BIT_MASK == value {
                return false;
            }
            if VM::VMObjectModel::attempt_available_bits(
                object,
                old_value,
                old_value ^ GC_MARK_BIT_MASK,
            ) {
                return true;
            }
        }
    }

    pub fn prepare(&self) {
        // Flip the sense of the mark bit: everything becomes unmarked.
        self.mark_state.fetch_xor(GC_MARK_BIT_MASK, Ordering::SeqCst);
    }

    pub fn release(&self) {}

    pub fn trace_object<T: TransitiveClosure>(
        &self,
        trace: &mut T,
        object: ObjectReference,
    ) -> ObjectReference {
        if ImmortalSpace::<VM>::test_and_mark(object, self.mark_state.load(Ordering::SeqCst)) {
            trace.process_node(object);
        }
        object
    }
}
