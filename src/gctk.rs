use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::plan::phase::PhaseManager;
use crate::plan::selected_plan::SelectedPlan;
use crate::plan::Plan;
use crate::util::options::{Options, UnsafeOptionsWrapper};
use crate::util::OpaquePointer;
use crate::vm::VMBinding;

/// One garbage-collected heap: the selected plan, the phase machinery
/// that drives its collections, and the options both were built from.
///
/// The engine has no ambient global state. The binding creates a single
/// `GCTK` with `'static` lifetime, returns it from
/// [`ActivePlan::global`](crate::vm::ActivePlan::global) via its plan,
/// and hands it to every [`memory_manager`](crate::memory_manager) call.
pub struct GCTK<VM: VMBinding> {
    pub plan: SelectedPlan<VM>,
    pub phase_manager: PhaseManager,
    pub options: Arc<UnsafeOptionsWrapper>,

    inside_harness: AtomicBool,
}

impl<VM: VMBinding> GCTK<VM> {
    pub fn new() -> Self {
        let options = Arc::new(UnsafeOptionsWrapper::new(Options::default()));
        let plan = SelectedPlan::new(options.clone());
        GCTK {
            plan,
            phase_manager: PhaseManager::new(),
            options,
            inside_harness: AtomicBool::new(false),
        }
    }

    /// Open the statistics measurement window, forcing a collection
    /// first so the measured interval starts from a clean heap.
    pub fn harness_begin(&self, tls: OpaquePointer) {
        self.plan.base().handle_user_collection_request(tls);
        self.inside_harness.store(true, Ordering::SeqCst);
        self.plan.base().stats.start_all();
    }

    /// Close the measurement window and print totals.
    pub fn harness_end(&self) {
        self.plan.base().stats.stop_all();
        self.inside_harness.store(false, Ordering::SeqCst);
    }
}

impl<VM: VMBinding> Default for GCTK<VM> {
    fn default() -> Self {
        Self::new()
    }
}
