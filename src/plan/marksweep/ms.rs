use std::cell::UnsafeCell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::plan::phase::Phase;
use crate::plan::plan::{BasePlan, CommonPlan, GcStatus};
use crate::plan::trace::Trace;
use crate::plan::Plan;
use crate::policy::marksweepspace::MarkSweepSpace;
use crate::policy::space::Space;
use crate::util::heap::{HeapMeta, VMRequest};
use crate::util::options::UnsafeOptionsWrapper;
use crate::util::{ObjectReference, OpaquePointer};
use crate::vm::{Scanning, VMBinding};

use super::mscollector::MSCollector;
use super::msmutator::MSMutator;
use super::mstracelocal::MSTraceLocal;

/// Share of the heap range given to the mark-sweep space.
const MS_FRACTION: f32 = 0.70;

pub struct MarkSweepUnsync<VM: VMBinding> {
    pub ms: MarkSweepSpace<VM>,
}

/// Global state of the mark-sweep plan: one non-moving segregated-fit
/// space for small objects over the common immortal and large object
/// spaces. Nothing ever moves; a collection is one mark closure and one
/// sweep.
pub struct MarkSweep<VM: VMBinding> {
    pub unsync: UnsafeCell<MarkSweepUnsync<VM>>,
    pub ms_trace: Trace,
    pub common: CommonPlan<VM>,
}

// Spaces in the cell are only mutated at phase boundaries, with the
// world stopped.
unsafe impl<VM: VMBinding> Sync for MarkSweep<VM> {}

impl<VM: VMBinding> Plan<VM> for MarkSweep<VM> {
    type MutatorT = MSMutator<VM>;
    type TraceLocalT = MSTraceLocal<VM>;
    type CollectorT = MSCollector<VM>;

    fn new(options: Arc<UnsafeOptionsWrapper>) -> Self {
        let mut heap = HeapMeta::new();
        let ms = MarkSweepSpace::new("ms", true, VMRequest::fraction(MS_FRACTION), &mut heap);
        MarkSweep {
            unsync: UnsafeCell::new(MarkSweepUnsync { ms }),
            ms_trace: Trace::new(),
            common: CommonPlan::new(options, heap),
        }
    }

    fn base(&self) -> &BasePlan<VM> {
        &self.common.base
    }

    fn common(&self) -> &CommonPlan<VM> {
        &self.common
    }

    fn gc_init(&self, heap_size: usize) {
        self.common.gc_init(heap_size);
        let unsync = unsafe { &*self.unsync.get() };
        unsync.ms.init();
    }

    fn bind_mutator(&'static self, tls: OpaquePointer) -> Box<MSMutator<VM>> {
        Box::new(MSMutator::new(tls, self))
    }

    fn will_never_move(&self, _object: ObjectReference) -> bool {
        true
    }

    fn collection_phase(&self, tls: OpaquePointer, phase: &Phase) {
        match phase {
            Phase::SetCollectionKind => {
                self.base().set_collection_kind(self.get_pages_avail());
            }
            Phase::Initiate => {
                self.base().set_gc_status(GcStatus::GcPrepare);
                self.base().stacks_prepared.store(false, Ordering::SeqCst);
            }
            Phase::PrepareStacks => {
                self.base().stacks_prepared.store(true, Ordering::SeqCst);
            }
            Phase::Prepare => {
                self.base().note_available_pre_gc(self.get_pages_avail());
                self.ms_trace.prepare();
                let unsync = unsafe { &mut *self.unsync.get() };
                unsync.ms.prepare();
                self.common.collection_phase(tls, phase);
            }
            Phase::StackRoots => {
                VM::VMScanning::notify_initial_thread_scan_complete(false, tls);
                self.base().set_gc_status(GcStatus::GcProper);
            }
            Phase::Roots => {
                VM::VMScanning::reset_thread_counter();
                self.base().set_gc_status(GcStatus::GcProper);
            }
            Phase::Release => {
                let unsync = unsafe { &mut *self.unsync.get() };
                unsync.ms.release();
                self.common.collection_phase(tls, phase);
            }
            Phase::Complete => {
                debug_assert!(self.ms_trace.values.is_empty());
                debug_assert!(self.ms_trace.root_locations.is_empty());
                self.base()
                    .update_exception_reserve(self.get_pages_avail(), tls);
                self.base().set_gc_status(GcStatus::NotInGC);
            }
            #[cfg(feature = "sanity")]
            Phase::SanitySetPreGC => self.base().sanity_checker.set_pre_gc(true),
            #[cfg(feature = "sanity")]
            Phase::SanitySetPostGC => self.base().sanity_checker.set_pre_gc(false),
            #[cfg(feature = "sanity")]
            Phase::SanityPrepare => self.base().sanity_checker.prepare(),
            #[cfg(feature = "sanity")]
            Phase::SanityCheckTable => self.base().sanity_checker.check::<VM, _>(self),
            #[cfg(feature = "sanity")]
            Phase::SanityRelease => self.base().sanity_checker.release(),
            _ => panic!("Global phase {:?} not handled", phase),
        }
    }

    fn is_valid_ref(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        unsync.ms.in_space(object) || self.common.in_common_space(object)
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        if unsync.ms.in_space(object) {
            return unsync.ms.is_live(object);
        }
        self.common.is_live_in_common_space(object)
    }

    fn get_pages_used(&self) -> usize {
        let unsync = unsafe { &*self.unsync.get() };
        unsync.ms.reserved_pages() + self.common.get_pages_used()
    }
}

impl<VM: VMBinding> MarkSweep<VM> {
    pub fn get_ms(&self) -> &'static MarkSweepSpace<VM> {
        let unsync = unsafe { &*self.unsync.get() };
        &unsync.ms
    }
}
