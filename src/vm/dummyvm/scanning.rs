use crate::plan::{TraceLocal, TransitiveClosure};
use crate::util::{ObjectReference, OpaquePointer};
use crate::vm::Scanning;

use super::{field_count, field_slot, DummyVM, ROOTS};

pub struct DummyScanning;

impl Scanning<DummyVM> for DummyScanning {
    fn scan_object<T: TransitiveClosure>(
        trace: &mut T,
        object: ObjectReference,
        _tls: OpaquePointer,
    ) {
        for index in 0..field_count(object) {
            trace.process_edge(field_slot(object, index));
        }
    }

    fn reset_thread_counter() {}

    fn notify_initial_thread_scan_complete(_partial_scan: bool, _tls: OpaquePointer) {}

    fn compute_static_roots<T: TraceLocal>(_trace: &mut T, _tls: OpaquePointer) {}

    fn compute_global_roots<T: TraceLocal>(_trace: &mut T, _tls: OpaquePointer) {}

    fn compute_thread_roots<T: TraceLocal>(trace: &mut T, _tls: OpaquePointer) {
        for slot in ROOTS.lock().unwrap().iter() {
            trace.report_delayed_root_edge(*slot);
        }
    }

    fn compute_bootimage_roots<T: TraceLocal>(_trace: &mut T, _tls: OpaquePointer) {}
}
