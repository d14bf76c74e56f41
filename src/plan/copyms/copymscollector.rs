use crate::gctk::GCTK;
use crate::plan::collector_context::CollectorContext;
use crate::plan::parallel_collector::ParallelCollector;
use crate::plan::parallel_collector_group::ParallelCollectorGroup;
use crate::plan::phase::{Phase, Schedule, COLLECTION};
use crate::plan::plan::Plan;
use crate::plan::Allocator as AllocationType;
use crate::plan::TraceLocal;
use crate::util::alloc::{Allocator, FreeListAllocator, LargeObjectAllocator};
use crate::util::forwarding_word as ForwardingWord;
#[cfg(feature = "sanity")]
use crate::util::sanity::SanityTraceLocal;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{Scanning, VMBinding};

use super::copymstracelocal::CopyMSTraceLocal;

/// One worker in the evacuating collection gang. Each worker copies the
/// nursery survivors it reaches into the mature space through its own
/// free-list allocator, so promotion needs no lock.
pub struct CopyMSCollector<VM: VMBinding> {
    pub tls: OpaquePointer,
    trace: CopyMSTraceLocal<VM>,
    mature: FreeListAllocator<VM>,
    los: LargeObjectAllocator<VM>,
    #[cfg(feature = "sanity")]
    sanity_trace: SanityTraceLocal<VM>,
    last_trigger_count: usize,
    worker_ordinal: usize,
    group: Option<&'static ParallelCollectorGroup<VM, CopyMSCollector<VM>>>,
    gctk: &'static GCTK<VM>,
}

impl<VM: VMBinding> CollectorContext<VM> for CopyMSCollector<VM> {
    fn new(gctk: &'static GCTK<VM>) -> Self {
        CopyMSCollector {
            tls: OpaquePointer::UNINITIALIZED,
            trace: CopyMSTraceLocal::new(&gctk.plan),
            mature: FreeListAllocator::new(
                OpaquePointer::UNINITIALIZED,
                Some(gctk.plan.get_ms()),
                &gctk.plan,
            ),
            los: LargeObjectAllocator::new(
                OpaquePointer::UNINITIALIZED,
                Some(gctk.plan.common().get_los()),
                &gctk.plan,
            ),
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
        self.mature.tls = tls;
        self.los.tls = tls;
        #[cfg(feature = "sanity")]
        self.sanity_trace.init(tls);
    }

    fn alloc_copy(
        &mut self,
        _original: ObjectReference,
        bytes: usize,
        align: usize,
        offset: isize,
        allocator: AllocationType,
    ) -> Address {
        match allocator {
            AllocationType::Default => self.mature.alloc(bytes, align, offset),
            AllocationType::Los => self.los.alloc(bytes, align, offset),
            _ => unreachable!(),
        }
    }

    fn post_copy(&self, object: ObjectReference, _bytes: usize, allocator: AllocationType) {
        // The copy inherited the from-space header, forwarding tag
        // included; stamping the live mark state replaces it.
        match allocator {
            AllocationType::Default => self.gctk.plan.get_ms().initialize_header(object),
            AllocationType::Los => {
                ForwardingWord::clear_forwarding_bits::<VM>(object);
                self.gctk
                    .plan
                    .common()
                    .get_los()
                    .initialize_header(object, false);
            }
            _ => unreachable!(),
        }
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
                // Promoted blocks must be in their headers before the
                // sweep walks them.
                self.mature.flush_free_lists();
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

impl<VM: VMBinding> ParallelCollector<VM> for CopyMSCollector<VM> {
    type T = CopyMSTraceLocal<VM>;

    fn park(&mut self) {
        let group = self.group.unwrap();
        group.park(self);
    }

    fn collect(&self) {
        self.gctk
            .phase_manager
            .begin_new_phase_stack::<VM>(self.tls, (Schedule::Complex, COLLECTION.clone()));
    }

    fn get_current_trace(&mut self) -> &mut CopyMSTraceLocal<VM> {
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
