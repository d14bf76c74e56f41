use crate::plan::{TraceLocal, TransitiveClosure};
use crate::util::{ObjectReference, OpaquePointer};
use crate::vm::VMBinding;

/// How the runtime enumerates roots and object fields.
pub trait Scanning<VM: VMBinding> {
    /// Delegate each reference field of `object` to `trace`.
    fn scan_object<T: TransitiveClosure>(
        trace: &mut T,
        object: ObjectReference,
        tls: OpaquePointer,
    );

    /// Reset the per-collection thread-scanning cursor.
    fn reset_thread_counter();

    /// Called once the initial round of stack scanning is complete.
    fn notify_initial_thread_scan_complete(partial_scan: bool, tls: OpaquePointer);

    /// Enumerate roots held in static storage.
    fn compute_static_roots<T: TraceLocal>(trace: &mut T, tls: OpaquePointer);

    /// Enumerate global (non-static, non-thread) roots.
    fn compute_global_roots<T: TraceLocal>(trace: &mut T, tls: OpaquePointer);

    /// Enumerate roots held in thread stacks and registers.
    fn compute_thread_roots<T: TraceLocal>(trace: &mut T, tls: OpaquePointer);

    /// Enumerate roots in a boot image, if the runtime has one.
    fn compute_bootimage_roots<T: TraceLocal>(trace: &mut T, tls: OpaquePointer);
}
