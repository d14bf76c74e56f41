use crate::plan::copyms::CopyMS;
use crate::plan::plan::Plan;
use crate::plan::trace::Trace;
use crate::plan::tracelocal::TraceLocal;
use crate::plan::transitive_closure::TransitiveClosure;
use crate::plan::Allocator as AllocationType;
use crate::policy::space::Space;
use crate::util::queue::LocalQueue;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{Scanning, VMBinding};

/// One collector's view of the evacuating trace. Nursery objects move
/// into the mature space as they are reached, so every traced slot is
/// rewritten with the (possibly new) referent.
pub struct CopyMSTraceLocal<VM: VMBinding> {
    tls: OpaquePointer,
    values: LocalQueue<'static, ObjectReference>,
    root_locations: LocalQueue<'static, Address>,
    plan: &'static CopyMS<VM>,
}

impl<VM: VMBinding> CopyMSTraceLocal<VM> {
    pub fn new(plan: &'static CopyMS<VM>) -> Self {
        let trace: &'static Trace = &plan.copyms_trace;
        CopyMSTraceLocal {
            tls: OpaquePointer::UNINITIALIZED,
            values: trace.values.spawn_local(),
            root_locations: trace.root_locations.spawn_local(),
            plan,
        }
    }

    pub fn init(&mut self, tls: OpaquePointer) {
        self.tls = tls;
    }
}

impl<VM: VMBinding> TransitiveClosure for CopyMSTraceLocal<VM> {
    fn process_edge(&mut self, slot: Address) {
        trace!("process_edge({:?})", slot);
        let object: ObjectReference = unsafe { slot.load() };
        let new_object = self.trace_object(object);
        if self.overwrite_reference_during_trace() {
            unsafe { slot.store(new_object) };
        }
    }

    fn process_node(&mut self, object: ObjectReference) {
        trace!("process_node({:?})", object);
        self.values.enqueue(object);
    }
}

impl<VM: VMBinding> TraceLocal for CopyMSTraceLocal<VM> {
    fn process_roots(&mut self) {
        while let Some(slot) = self.root_locations.dequeue() {
            self.process_root_edge(slot, true);
        }
    }

    fn process_root_edge(&mut self, slot: Address, _untraced: bool) {
        trace!("process_root_edge({:?})", slot);
        let object: ObjectReference = unsafe { slot.load() };
        let new_object = self.trace_object(object);
        if self.overwrite_reference_during_trace() {
            unsafe { slot.store(new_object) };
        }
    }

    fn trace_object(&mut self, object: ObjectReference) -> ObjectReference {
        trace!("trace_object({:?})", object);
        if object.is_null() {
            return object;
        }
        let tls = self.tls;
        let plan = self.plan;
        if plan.get_nursery().in_space(object) {
            return plan
                .get_nursery()
                .trace_object(self, object, AllocationType::Default, tls);
        }
        if plan.get_ms().in_space(object) {
            return plan.get_ms().trace_object(self, object);
        }
        let common = plan.common();
        if common.get_immortal().in_space(object) {
            return common.get_immortal().trace_object(self, object);
        }
        if common.get_los().in_space(object) {
            return common.get_los().trace_object(self, object);
        }
        panic!("{:?} is not in any space", object)
    }

    fn complete_trace(&mut self) {
        let tls = self.tls;
        self.process_roots();
        while let Some(object) = self.values.dequeue() {
            VM::VMScanning::scan_object(self, object, tls);
        }
    }

    fn release(&mut self) {
        self.values.reset();
        self.root_locations.reset();
    }

    fn process_interior_edge(&mut self, target: ObjectReference, slot: Address, _root: bool) {
        let interior_ref: Address = unsafe { slot.load() };
        let offset = interior_ref - target.to_address();
        let new_target = self.trace_object(target);
        if self.overwrite_reference_during_trace() {
            unsafe { slot.store(new_target.to_address() + offset) };
        }
    }

    fn report_delayed_root_edge(&mut self, slot: Address) {
        self.root_locations.enqueue(slot);
    }

    fn will_not_move_in_current_collection(&self, obj: ObjectReference) -> bool {
        !self.plan.get_nursery().in_space(obj)
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        if object.is_null() {
            return false;
        }
        self.plan.is_live(object)
    }
}
