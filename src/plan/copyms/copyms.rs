use std::cell::UnsafeCell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::plan::phase::Phase;
use crate::plan::plan::{BasePlan, CommonPlan, GcStatus};
use crate::plan::trace::Trace;
use crate::plan::Plan;
use crate::policy::copyspace::CopySpace;
use crate::policy::marksweepspace::MarkSweepSpace;
use crate::policy::space::Space;
use crate::util::heap::{HeapMeta, VMRequest};
use crate::util::options::UnsafeOptionsWrapper;
#[cfg(feature = "sanity")]
use crate::util::sanity::Liveness;
use crate::util::{ObjectReference, OpaquePointer};
use crate::vm::{Scanning, VMBinding};

use super::copymscollector::CopyMSCollector;
use super::copymsmutator::CopyMSMutator;
use super::copymstracelocal::CopyMSTraceLocal;

/// Share of the heap range given to the copying nursery.
const NURSERY_FRACTION: f32 = 0.20;
/// Share of the heap range given to the mature mark-sweep space.
const MS_FRACTION: f32 = 0.50;

pub struct CopyMSUnsync<VM: VMBinding> {
    pub nursery: CopySpace<VM>,
    pub ms: MarkSweepSpace<VM>,
}

/// Global state of the copying mark-sweep plan: new objects go to a
/// bump-allocated nursery and survivors are evacuated into a mature
/// mark-sweep space during the (always full-heap) closure. The nursery
/// is from-space in every collection, so it is empty once the trace
/// completes and its pages are released wholesale.
pub struct CopyMS<VM: VMBinding> {
    pub unsync: UnsafeCell<CopyMSUnsync<VM>>,
    pub copyms_trace: Trace,
    pub common: CommonPlan<VM>,
}

// Spaces in the cell are only mutated at phase boundaries, with the
// world stopped.
unsafe impl<VM: VMBinding> Sync for CopyMS<VM> {}

impl<VM: VMBinding> Plan<VM> for CopyMS<VM> {
    type MutatorT = CopyMSMutator<VM>;
    type TraceLocalT = CopyMSTraceLocal<VM>;
    type CollectorT = CopyMSCollector<VM>;

    fn new(options: Arc<UnsafeOptionsWrapper>) -> Self {
        let mut heap = HeapMeta::new();
        let nursery = CopySpace::new(
            "nursery",
            false,
            true,
            VMRequest::fraction(NURSERY_FRACTION),
            &mut heap,
        );
        let ms = MarkSweepSpace::new("ms", true, VMRequest::fraction(MS_FRACTION), &mut heap);
        CopyMS {
            unsync: UnsafeCell::new(CopyMSUnsync { nursery, ms }),
            copyms_trace: Trace::new(),
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
        unsync.nursery.init();
        unsync.ms.init();
    }

    fn bind_mutator(&'static self, tls: OpaquePointer) -> Box<CopyMSMutator<VM>> {
        Box::new(CopyMSMutator::new(tls, self))
    }

    fn will_never_move(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        !unsync.nursery.in_space(object)
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
                self.copyms_trace.prepare();
                let unsync = unsafe { &mut *self.unsync.get() };
                unsync.nursery.prepare(true);
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
                unsync.nursery.release();
                unsync.ms.release();
                self.common.collection_phase(tls, phase);
            }
            Phase::Complete => {
                debug_assert!(self.copyms_trace.values.is_empty());
                debug_assert!(self.copyms_trace.root_locations.is_empty());
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
        unsync.nursery.in_space(object)
            || unsync.ms.in_space(object)
            || self.common.in_common_space(object)
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        if unsync.nursery.in_space(object) {
            return unsync.nursery.is_live(object);
        }
        if unsync.ms.in_space(object) {
            return unsync.ms.is_live(object);
        }
        self.common.is_live_in_common_space(object)
    }

    /// Nursery headers say nothing about reachability until the trace
    /// has run: before a collection any nursery object may yet prove
    /// reachable, afterwards none remain.
    #[cfg(feature = "sanity")]
    fn expected_liveness(&self, object: ObjectReference) -> Liveness {
        let unsync = unsafe { &*self.unsync.get() };
        if unsync.nursery.in_space(object) {
            return if self.base().sanity_checker.is_pre_gc() {
                Liveness::Unsure
            } else {
                Liveness::Dead
            };
        }
        if self.is_live(object) {
            Liveness::Alive
        } else {
            Liveness::Dead
        }
    }

    fn get_pages_used(&self) -> usize {
        let unsync = unsafe { &*self.unsync.get() };
        unsync.nursery.reserved_pages() + unsync.ms.reserved_pages() + self.common.get_pages_used()
    }

    /// Evacuation can at worst promote the entire nursery.
    fn get_collection_reserve(&self) -> usize {
        let unsync = unsafe { &*self.unsync.get() };
        unsync.nursery.reserved_pages()
    }
}

impl<VM: VMBinding> CopyMS<VM> {
    pub fn get_nursery(&self) -> &'static CopySpace<VM> {
        let unsync = unsafe { &*self.unsync.get() };
        &unsync.nursery
    }

    pub fn get_ms(&self) -> &'static MarkSweepSpace<VM> {
        let unsync = unsafe { &*self.unsync.get() };
        &unsync.ms
    }
}
