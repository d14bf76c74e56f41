use crate::gctk::GCTK;
use crate::plan::collector_context::CollectorContext;
use crate::plan::parallel_collector::ParallelCollector;
use crate::plan::parallel_collector_group::ParallelCollectorGroup;
use crate::plan::phase::{Phase, Schedule, COLLECTION};
use crate::plan::Allocator as AllocationType;
use crate::plan::TraceLocal;
#[cfg(feature = "sanity")]
use crate::util::sanity::SanityTraceLocal;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{Scanning, VMBinding};

use super::mstracelocal::MSTraceLocal;

/// One worker in the mark-sweep collection gang. Nothing is copied, so
/// the worker carries no allocators, only its view of the mark trace.
pub struct MSCollector<VM: VMBinding> {
    pub tls: OpaquePointer,
    trace: MSTraceLocal<VM>,
    #[cfg(feature = "sanity")]
    sanity_trace: SanityTraceLocal<VM>,
    last_trigger_count: usize,
    worker_ordinal: usize,
    group: Option<&'static ParallelCollectorGroup<VM, MSCollector<VM>>>,
    gctk: &'static GCTK<VM>,
}

impl<VM: VMBinding> CollectorContext<VM> for MSCollector<VM> {
    fn new(gctk: &'static GCTK<VM>) -> Self {
        MSCollector {
            tls: OpaquePointer::UNINITIALIZED,
            trace: MSTraceLocal::new(&gctk.plan),
            #[cfg(feature = "sanity")]
            sanity_trace: SanityTraceLocal::new(&gctk.plan.common.base.sanity_checker),
            last_trigger_count: 0,
            worker_ordinal: 0,
            group: None,
            gctk,
        }
    }

    fn init(&mut self, tls: OpaquePointer) {
        self.tls = tls;
        self.trace.init(tls);
        #[cfg(feature = "sanity")]
        self.sanity_trace.init(tls);
    }

    fn alloc_copy(
        &mut self,
        _original: ObjectReference,
        _bytes: usize,
        _align: usize,
        _offset: isize,
        _allocator: AllocationType,
    ) -> Address {
        unreachable!()
    }

    fn run(&mut self, tls: OpaquePointer) {
        self.init(tls);
        loop {
            self.park();
            self.collect();
        }
    }

    fn collection_phase(&mut self, _tls: OpaquePointer, phase: &Phase, _primary: bool) {
        match phase {
            Phase::Prepare => {}
            Phase::StackRoots => {
                trace!("Computing thread roots");
                VM::VMScanning::compute_thread_roots(&mut self.trace, self.tls);
            }
            Phase::Roots => {
                trace!("Computing global roots");
                VM::VMScanning::compute_global_roots(&mut self.trace, self.tls);
                VM::VMScanning::compute_static_roots(&mut self.trace, self.tls);
                VM::VMScanning::compute_bootimage_roots(&mut self.trace, self.tls);
            }
            Phase::Closure => {
                self.trace.complete_trace();
            }
            Phase::Release => {
                self.trace.release();
            }
            #[cfg(feature = "sanity")]
            Phase::SanityRoots => {
                VM::VMScanning::compute_thread_roots(&mut self.sanity_trace, self.tls);
                VM::VMScanning::compute_global_roots(&mut self.sanity_trace, self.tls);
                VM::VMScanning::compute_static_roots(&mut self.sanity_trace, self.tls);
                VM::VMScanning::compute_bootimage_roots(&mut self.sanity_trace, self.tls);
            }
            #[cfg(feature = "sanity")]
            Phase::SanityBuildTable => {
                self.sanity_trace.complete_trace();
                self.sanity_trace.release();
            }
            _ => panic!("Collector phase {:?} not handled", phase),
        }
    }

    fn get_tls(&self) -> OpaquePointer {
        self.tls
    }
}

impl<VM: VMBinding> ParallelCollector<VM> for MSCollector<VM> {
    type T = MSTraceLocal<VM>;

    fn park(&mut self) {
        let group = self.group.unwrap();
        group.park(self);
    }

    fn collect(&self) {
        self.gctk
            .phase_manager
            .begin_new_phase_stack::<VM>(self.tls, (Schedule::Complex, COLLECTION.clone()));
    }

    fn get_current_trace(&mut self) -> &mut MSTraceLocal<VM> {
        &mut self.trace
    }

    fn parallel_worker_count(&self) -> usize {
        self.group.unwrap().active_worker_count()
    }

    fn parallel_worker_ordinal(&self) -> usize {
        self.worker_ordinal
    }

    fn rendezvous(&self) -> usize {
        self.group.unwrap().rendezvous()
    }

    fn get_last_trigger_count(&self) -> usize {
        self.last_trigger_count
    }

    fn set_last_trigger_count(&mut self, val: usize) {
        self.last_trigger_count = val;
    }

    fn increment_last_trigger_count(&mut self) {
        self.last_trigger_count += 1;
    }

    fn set_group(&mut self, group: *const ParallelCollectorGroup<VM, Self>) {
        self.group = Some(unsafe { &*group });
    }

    fn set_worker_ordinal(&mut self, ordinal: usize) {
        self.worker_ordinal = ordinal;
    }
}
