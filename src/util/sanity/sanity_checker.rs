//! An independent audit of the collector's own liveness claims. A second
//! trace walks the object graph from the roots without disturbing it,
//! tallying every reference it sees. The resulting table is then compared
//! against what the plan says should be live: an object the plan declares
//! dead must not have been reached at all.
//!
//! The audit runs twice per collection, once before the first real phase
//! and once after the last, so both the mutator-built graph and the
//! collector-rebuilt graph get checked.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::plan::plan::Plan;
use crate::plan::trace::Trace;
use crate::plan::tracelocal::TraceLocal;
use crate::plan::transitive_closure::TransitiveClosure;
use crate::util::queue::LocalQueue;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{ActivePlan, Scanning, VMBinding};

/// The strongest claim a plan can make about one object before the
/// reachability evidence is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead,
    Unsure,
}

#[derive(Clone, Copy, Default)]
struct Tally {
    refs: usize,
    roots: usize,
}

pub struct SanityChecker {
    pub trace: Trace,
    table: Mutex<HashMap<ObjectReference, Tally>>,
    pre_gc: AtomicBool,
}

impl SanityChecker {
    pub fn new() -> Self {
        SanityChecker {
            trace: Trace::new(),
            table: Mutex::new(HashMap::new()),
            pre_gc: AtomicBool::new(true),
        }
    }

    /// Whether the audit underway runs before the collection proper.
    pub fn is_pre_gc(&self) -> bool {
        self.pre_gc.load(Ordering::Relaxed)
    }

    pub fn set_pre_gc(&self, pre_gc: bool) {
        self.pre_gc.store(pre_gc, Ordering::Relaxed);
    }

    pub fn prepare(&self) {
        self.trace.prepare();
        self.table.lock().unwrap().clear();
    }

    /// Tally one sighting of `object`. Returns true on the first sighting,
    /// in which case the caller owns scanning the object's fields.
    pub fn record(&self, object: ObjectReference, root: bool) -> bool {
        let mut table = self.table.lock().unwrap();
        let tally = table.entry(object).or_default();
        let first = tally.refs == 0;
        tally.refs += 1;
        if root {
            tally.roots += 1;
        }
        first
    }

    /// Compare the evidence against the plan's claims.
    pub fn check<VM: VMBinding, P: Plan<VM>>(&self, plan: &P) {
        let table = self.table.lock().unwrap();
        let mut refs = 0;
        let mut roots = 0;
        let mut errors = 0;
        for (object, tally) in table.iter() {
            refs += tally.refs;
            roots += tally.roots;
            if plan.expected_liveness(*object) == Liveness::Dead {
                error!(
                    "[SANITY] {:?} is reachable ({} refs, {} from roots) but its space says it is dead",
                    object, tally.refs, tally.roots
                );
                errors += 1;
            }
        }
        info!(
            "[SANITY] {}: {} objects, {} refs, {} roots",
            if self.is_pre_gc() { "pre-GC" } else { "post-GC" },
            table.len(),
            refs,
            roots
        );
        if errors > 0 {
            panic!("Sanity check failed: {} objects reachable but presumed dead", errors);
        }
    }

    pub fn release(&self) {
        self.table.lock().unwrap().clear();
    }
}

impl Default for SanityChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-collector side of the audit trace. Unlike the collection
/// traces it never writes to slots and never touches object headers, so
/// the heap comes out of the audit exactly as it went in.
pub struct SanityTraceLocal<VM: VMBinding> {
    tls: OpaquePointer,
    values: LocalQueue<'static, ObjectReference>,
    root_locations: LocalQueue<'static, Address>,
    checker: &'static SanityChecker,
    _p: PhantomData<VM>,
}

impl<VM: VMBinding> SanityTraceLocal<VM> {
    pub fn new(checker: &'static SanityChecker) -> Self {
        SanityTraceLocal {
            tls: OpaquePointer::UNINITIALIZED,
            values: checker.trace.values.spawn_local(),
            root_locations: checker.trace.root_locations.spawn_local(),
            checker,
            _p: PhantomData,
        }
    }

    pub fn init(&mut self, tls: OpaquePointer) {
        self.tls = tls;
    }

    fn trace(&mut self, object: ObjectReference, root: bool) -> ObjectReference {
        if object.is_null() {
            return object;
        }
        let plan = VM::VMActivePlan::global();
        if !plan.is_valid_ref(object) {
            panic!(
                "[SANITY] invalid reference {:?} reached (root: {})",
                object, root
            );
        }
        if self.checker.record(object, root) {
            self.process_node(object);
        }
        object
    }
}

impl<VM: VMBinding> TransitiveClosure for SanityTraceLocal<VM> {
    fn process_edge(&mut self, slot: Address) {
        let object: ObjectReference = unsafe { slot.load() };
        self.trace(object, false);
    }

    fn process_node(&mut self, object: ObjectReference) {
        self.values.enqueue(object);
    }
}

impl<VM: VMBinding> TraceLocal for SanityTraceLocal<VM> {
    fn process_roots(&mut self) {
        while let Some(slot) = self.root_locations.dequeue() {
            self.process_root_edge(slot, true);
        }
    }

    fn process_root_edge(&mut self, slot: Address, _untraced: bool) {
        let object: ObjectReference = unsafe { slot.load() };
        self.trace(object, true);
    }

    fn trace_object(&mut self, object: ObjectReference) -> ObjectReference {
        self.trace(object, false)
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

    fn process_interior_edge(&mut self, target: ObjectReference, _slot: Address, root: bool) {
        self.trace(target, root);
    }

    fn report_delayed_root_edge(&mut self, slot: Address) {
        self.root_locations.enqueue(slot);
    }

    fn will_not_move_in_current_collection(&self, _obj: ObjectReference) -> bool {
        true
    }

    /// The audit must leave every slot exactly as it found it.
    fn overwrite_reference_during_trace(&self) -> bool {
        false
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        !object.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(addr: usize) -> ObjectReference {
        unsafe { Address::from_usize(addr).to_object_reference() }
    }

    #[test]
    fn only_the_first_sighting_claims_the_scan() {
        let checker = SanityChecker::new();
        let o = object(0x1000);
        assert!(checker.record(o, true));
        assert!(!checker.record(o, false));
        assert!(!checker.record(o, true));
        // A different object is its own first sighting.
        assert!(checker.record(object(0x2000), false));
    }

    #[test]
    fn release_forgets_the_evidence() {
        let checker = SanityChecker::new();
        let o = object(0x1000);
        assert!(checker.record(o, false));
        checker.release();
        assert!(checker.record(o, false));
    }

    #[test]
    fn audit_window_flag_flips() {
        let checker = SanityChecker::new();
        assert!(checker.is_pre_gc());
        checker.set_pre_gc(false);
        assert!(!checker.is_pre_gc());
    }
}
