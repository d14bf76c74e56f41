use crate::plan::selected_plan::SelectedPlan;
use crate::plan::Plan;
use crate::util::OpaquePointer;
use crate::vm::VMBinding;

/// How the engine reaches its own global state, and the per-thread
/// contexts the runtime holds on its behalf.
pub trait ActivePlan<VM: VMBinding> {
    /// The process-wide plan instance.
    fn global() -> &'static SelectedPlan<VM>;

    /// The collector context bound to `tls`.
    ///
    /// # Safety
    /// The caller must only name a `tls` belonging to a collector thread.
    unsafe fn collector(tls: OpaquePointer) -> &'static mut <SelectedPlan<VM> as Plan<VM>>::CollectorT;

    /// Whether `tls` belongs to a mutator thread.
    ///
    /// # Safety
    /// `tls` must identify a live thread known to the runtime.
    unsafe fn is_mutator(tls: OpaquePointer) -> bool;

    /// The mutator context bound to `tls`.
    ///
    /// # Safety
    /// The caller must only name a `tls` belonging to a mutator thread.
    unsafe fn mutator(tls: OpaquePointer) -> &'static mut <SelectedPlan<VM> as Plan<VM>>::MutatorT;

    /// Number of collector contexts in the system.
    fn collector_count() -> usize;

    /// Reset the mutator iterator used by per-mutator collection steps.
    fn reset_mutator_iterator();

    /// The next mutator context, or `None` once all have been visited
    /// since the last reset.
    fn get_next_mutator() -> Option<&'static mut <SelectedPlan<VM> as Plan<VM>>::MutatorT>;
}
