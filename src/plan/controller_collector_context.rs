use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use crate::gctk::GCTK;
use crate::plan::parallel_collector_group::ParallelCollectorGroup;
use crate::plan::plan::Plan;
use crate::plan::selected_plan::SelectedPlan;
use crate::util::OpaquePointer;
use crate::vm::{Collection, VMBinding};

struct RequestSync {
    request_count: isize,
    last_request_count: isize,
}

/// The stop-the-world controller. Mutators deposit collection requests
/// here; a dedicated thread consumes them, stops the world, runs the
/// worker group through one cycle and starts the world again.
pub struct ControllerCollectorContext<VM: VMBinding> {
    request_sync: Mutex<RequestSync>,
    request_condvar: Condvar,
    request_flag: AtomicBool,
    pub workers: UnsafeCell<
        ParallelCollectorGroup<VM, <SelectedPlan<VM> as Plan<VM>>::CollectorT>,
    >,
}

// The workers cell is only mutated during startup, before any request
// can arrive.
unsafe impl<VM: VMBinding> Sync for ControllerCollectorContext<VM> {}

impl<VM: VMBinding> ControllerCollectorContext<VM> {
    pub fn new() -> Self {
        ControllerCollectorContext {
            request_sync: Mutex::new(RequestSync {
                request_count: 0,
                last_request_count: -1,
            }),
            request_condvar: Condvar::new(),
            request_flag: AtomicBool::new(false),
            workers: UnsafeCell::new(ParallelCollectorGroup::new("collectors")),
        }
    }

    pub fn init_group(&self, gctk: &'static GCTK<VM>, size: usize, tls: OpaquePointer) {
        let workers = unsafe { &mut *self.workers.get() };
        workers.init_group(gctk, size, tls);
    }

    pub fn run(&self, tls: OpaquePointer) {
        loop {
            debug!("[STWController: Waiting for request...]");
            self.wait_for_request();
            debug!("[STWController: Stopping the world!]");
            VM::VMCollection::stop_all_mutators(tls);

            // A request that arrives after this point belongs to the
            // next cycle.
            self.clear_request();

            debug!("[STWController: Triggering worker threads...]");
            let workers = unsafe { &*self.workers.get() };
            workers.trigger_cycle();
            workers.wait_for_cycle();

            debug!("[STWController: Resuming mutators...]");
            VM::VMCollection::resume_mutators(tls);
        }
    }

    pub fn request(&self) {
        if self.request_flag.load(Ordering::Relaxed) {
            return;
        }
        let mut guard = self.request_sync.lock().unwrap();
        if !self.request_flag.load(Ordering::Relaxed) {
            self.request_flag.store(true, Ordering::Relaxed);
            guard.request_count += 1;
            self.request_condvar.notify_all();
        }
    }

    pub fn clear_request(&self) {
        let guard = self.request_sync.lock().unwrap();
        self.request_flag.store(false, Ordering::Relaxed);
        drop(guard);
    }

    pub fn request_is_pending(&self) -> bool {
        self.request_flag.load(Ordering::Relaxed)
    }

    fn wait_for_request(&self) {
        let mut guard = self.request_sync.lock().unwrap();
        guard.last_request_count += 1;
        while guard.last_request_count == guard.request_count {
            guard = self.request_condvar.wait(guard).unwrap();
        }
    }
}

impl<VM: VMBinding> Default for ControllerCollectorContext<VM> {
    fn default() -> Self {
        Self::new()
    }
}
