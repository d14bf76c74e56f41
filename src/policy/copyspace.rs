use std::sync::atomic::{AtomicBool, Ordering};

use crate::plan::Allocator;
use crate::plan::TransitiveClosure;
use crate::policy::space::{CommonSpace, Space};
use crate::util::forwarding_word as ForwardingWord;
use crate::util::heap::{HeapMeta, MonotonePageResource, PageResource, VMRequest};
use crate::util::{ObjectReference, OpaquePointer};
use crate::vm::VMBinding;

/// Bump-allocated space whose entire population is evacuated at each
/// collection. While it is the from-space, liveness means "already
/// forwarded".
pub struct CopySpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: MonotonePageResource,
    from_space: AtomicBool,
}

impl<VM: VMBinding> Space<VM> for CopySpace<VM> {
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
        !self.is_from_space() || ForwardingWord::is_forwarded::<VM>(object)
    }
}

impl<VM: VMBinding> CopySpace<VM> {
    pub fn new(
        name: &'static str,
        from_space: bool,
        zeroed: bool,
        vmrequest: VMRequest,
        heap: &mut HeapMeta,
    ) -> Self {
        let common = CommonSpace::new(name, true, false, zeroed, vmrequest, heap);
        CopySpace {
            pr: MonotonePageResource::new_contiguous(common.start, common.extent),
            common,
            from_space: AtomicBool::new(from_space),
        }
    }

    pub fn prepare(&self, from_space: bool) {
        self.from_space.store(from_space, Ordering::SeqCst);
    }

    pub fn release(&self) {
        unsafe {
            self.pr.reset();
        }
        self.from_space.store(false, Ordering::SeqCst);
    }

    fn is_from_space(&self) -> bool {
        self.from_space.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn trace_object<T: TransitiveClosure>(
        &self,
        trace: &mut T,
        object: ObjectReference,
        allocator: Allocator,
        tls: OpaquePointer,
    ) -> ObjectReference {
        trace!("copyspace.trace_object(, {:?}, {:?})", object, allocator);
        if !self.is_from_space() {
            return object;
        }
        let forwarding_status = ForwardingWord::attempt_to_forward::<VM>(object);
        if ForwardingWord::state_is_forwarded_or_being_forwarded(forwarding_status) {
            ForwardingWord::spin_and_get_forwarded_object::<VM>(object, forwarding_status)
        } else {
            let new_object = ForwardingWord::forward_object::<VM>(object, allocator, tls);
            trace.process_node(new_object);
            trace!("copying [{:?} -> {:?}]", object, new_object);
            new_object
        }
    }
}
