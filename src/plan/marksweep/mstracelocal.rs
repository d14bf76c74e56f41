use crate::plan::marksweep::MarkSweep;
use crate::plan::plan::Plan;
use crate::plan::trace::Trace;
use crate::plan::tracelocal::TraceLocal;
use crate::plan::transitive_closure::TransitiveClosure;
use crate::policy::space::Space;
use crate::util::queue::LocalQueue;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{Scanning, VMBinding};

/// One collector's view of the mark trace. Nothing moves, so traced
/// references are returned unchanged and slot updates are writes of the
/// value already there.
pub struct MSTraceLocal<VM: VMBinding> {
    tls: OpaquePointer,
    values: LocalQueue<'static, ObjectReference>,
    root_locations: LocalQueue<'static, Address>,
    plan: &'static MarkSweep<VM>,
}

impl<VM: VMBinding> MSTraceLocal<VM> {
    pub fn new(plan: &'static MarkSweep<VM>) -> Self {
        let trace: &'static Trace = &plan.ms_trace;
        MSTraceLocal {
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

impl<VM: VMBinding> TransitiveClosure for MSTraceLocal<VM> {
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

impl<VM: VMBinding> TraceLocal for MSTraceLocal<VM> {
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
        let plan = self.plan;
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

    fn will_not_move_in_current_collection(&self, _obj: ObjectReference) -> bool {
        true
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        if object.is_null() {
            return false;
        }
        self.plan.is_live(object)
    }
}
