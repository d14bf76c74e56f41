use std::marker::PhantomData;
use std::sync::{Condvar, Mutex};

use crate::gctk::GCTK;
use crate::plan::collector_context::CollectorContext;
use crate::plan::parallel_collector::ParallelCollector;
use crate::util::OpaquePointer;
use crate::vm::{Collection, VMBinding};

struct GroupSync {
    trigger_count: usize,
    contexts_parked: usize,
    rendezvous_counter: [usize; 2],
    current_rendezvous_counter: usize,
}

/// A gang of collector threads driven through repeated trigger/park
/// cycles, with an internal barrier for lockstep phase changes.
pub struct ParallelCollectorGroup<VM: VMBinding, C: ParallelCollector<VM>> {
    name: String,
    contexts: Vec<C>,
    sync: Mutex<GroupSync>,
    condvar: Condvar,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding, C: ParallelCollector<VM>> ParallelCollectorGroup<VM, C> {
    pub fn new(name: &str) -> Self {
        ParallelCollectorGroup {
            name: String::from(name),
            contexts: Vec::new(),
            sync: Mutex::new(GroupSync {
                trigger_count: 1,
                contexts_parked: 0,
                rendezvous_counter: [0, 0],
                current_rendezvous_counter: 0,
            }),
            condvar: Condvar::new(),
            phantom: PhantomData,
        }
    }

    pub fn active_worker_count(&self) -> usize {
        self.contexts.len()
    }

    /// Create `size` contexts and hand each to a fresh thread. The
    /// context vector must never grow afterwards: the threads hold raw
    /// pointers into it.
    pub fn init_group(&mut self, gctk: &'static GCTK<VM>, size: usize, tls: OpaquePointer) {
        debug!("Initializing collector group {} with {} workers", self.name, size);
        self.contexts.reserve_exact(size);
        for _ in 0..size {
            self.contexts.push(C::new(gctk));
        }
        let group: *const Self = self;
        for (ordinal, context) in self.contexts.iter_mut().enumerate() {
            context.set_group(group);
            context.set_worker_ordinal(ordinal);
            context.set_last_trigger_count(1);
            VM::VMCollection::spawn_worker_thread(tls, context as *mut C);
        }
    }

    pub fn trigger_cycle(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.trigger_count += 1;
        sync.contexts_parked = 0;
        self.condvar.notify_all();
    }

    /// Block until every worker has parked again.
    pub fn wait_for_cycle(&self) {
        let mut sync = self.sync.lock().unwrap();
        while sync.contexts_parked < self.contexts.len() {
            sync = self.condvar.wait(sync).unwrap();
        }
    }

    /// Park `context` until the next trigger. Returns immediately if a
    /// trigger arrived while the worker was still collecting.
    pub fn park(&self, context: &mut C) {
        let mut sync = self.sync.lock().unwrap();
        context.increment_last_trigger_count();
        if context.get_last_trigger_count() == sync.trigger_count {
            sync.contexts_parked += 1;
            if sync.contexts_parked == self.contexts.len() {
                self.condvar.notify_all();
            }
            while context.get_last_trigger_count() == sync.trigger_count {
                sync = self.condvar.wait(sync).unwrap();
            }
        }
    }

    /// Barrier across the gang. The returned ordinal is this worker's
    /// arrival order, with 0 designating the primary for the next step.
    pub fn rendezvous(&self) -> usize {
        let mut sync = self.sync.lock().unwrap();
        let current = sync.current_rendezvous_counter;
        let order = sync.rendezvous_counter[current];
        sync.rendezvous_counter[current] += 1;
        if order + 1 == self.contexts.len() {
            sync.current_rendezvous_counter ^= 1;
            let next = sync.current_rendezvous_counter;
            sync.rendezvous_counter[next] = 0;
            self.condvar.notify_all();
        } else {
            while sync.rendezvous_counter[current] < self.contexts.len() {
                sync = self.condvar.wait(sync).unwrap();
            }
        }
        order
    }
}
