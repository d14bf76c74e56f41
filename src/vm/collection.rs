use crate::plan::ParallelCollector;
use crate::util::OpaquePointer;
use crate::vm::VMBinding;

/// How the engine stops, restarts and creates runtime threads.
pub trait Collection<VM: VMBinding> {
    /// Bring every mutator to a safepoint and keep it there. Only the
    /// controller calls this, and only while a collection request is
    /// pending.
    fn stop_all_mutators(tls: OpaquePointer);

    /// Let mutators run again after a collection has finished.
    fn resume_mutators(tls: OpaquePointer);

    /// Park the calling mutator until the collection it requested has
    /// completed.
    fn block_for_gc(tls: OpaquePointer);

    /// Start a collector thread whose body is `ctx.run(tls)`.
    ///
    /// `ctx` is owned by the engine for the life of the process; the
    /// binding must hand it to exactly one new thread.
    fn spawn_worker_thread<T: ParallelCollector<VM>>(tls: OpaquePointer, ctx: *mut T);

    /// Flush and adjust the mutator's thread-local state at the start of
    /// a collection.
    fn prepare_mutator<T: crate::plan::MutatorContext<VM>>(tls: OpaquePointer, m: &T);

    /// The heap cannot satisfy a request even after collecting.
    fn out_of_memory(_tls: OpaquePointer) {
        panic!("Out of memory!");
    }
}
