use crate::plan::transitive_closure::TransitiveClosure;
use crate::util::{Address, ObjectReference};

/// A per-collector view of one trace. Roots and grey objects are held in
/// thread-local buffers backed by a shared pool, so collectors steal from
/// each other when their own work runs out.
pub trait TraceLocal: TransitiveClosure {
    /// Drain the root-location buffer, tracing every slot found there.
    fn process_roots(&mut self);

    /// Trace the reference held in `slot`. When `untraced` the referent
    /// is known not to have been reached yet this collection.
    fn process_root_edge(&mut self, slot: Address, untraced: bool);

    /// Visit `object`, returning the reference callers must use from now
    /// on. For non-moving policies this is `object` itself.
    fn trace_object(&mut self, object: ObjectReference) -> ObjectReference;

    /// Run the trace to a fixpoint: process roots, then scan grey objects
    /// until every buffer in the pool is empty.
    fn complete_trace(&mut self);

    /// Drop any per-collection state once the trace is finished.
    fn release(&mut self);

    /// Trace an interior pointer. `slot` holds an address somewhere
    /// inside `target` rather than its canonical reference.
    fn process_interior_edge(&mut self, target: ObjectReference, slot: Address, root: bool);

    /// Remember a root slot whose processing must wait until the main
    /// closure is done.
    fn report_delayed_root_edge(&mut self, slot: Address);

    /// Whether `obj` will keep its address for the rest of this
    /// collection.
    fn will_not_move_in_current_collection(&self, obj: ObjectReference) -> bool;

    /// The forwarded version of `object`, tracing it if necessary.
    fn get_forwarded_reference(&mut self, object: ObjectReference) -> ObjectReference {
        self.trace_object(object)
    }

    /// Pin down `object`'s final address before the main closure runs,
    /// returning the reference that is stable for the rest of the
    /// collection. Policies whose relocation targets are computed in a
    /// later pass cannot honour this for objects they move.
    fn precopy_object(&mut self, object: ObjectReference) -> ObjectReference {
        self.trace_object(object)
    }

    /// Whether traced slots should be updated in place.
    fn overwrite_reference_during_trace(&self) -> bool {
        true
    }

    fn is_live(&self, object: ObjectReference) -> bool;
}
