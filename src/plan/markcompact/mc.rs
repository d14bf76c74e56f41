use std::cell::UnsafeCell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::plan::phase::{
    Phase, Schedule, COMPLETE_CLOSURE_PHASE, FINISH_PHASE, INIT_PHASE, PREPARE_STACKS,
    ROOT_CLOSURE_PHASE,
};
use crate::plan::plan::{BasePlan, CommonPlan, GcStatus};
use crate::plan::trace::Trace;
use crate::plan::Plan;
use crate::policy::markcompactspace::MarkCompactSpace;
use crate::policy::space::Space;
use crate::util::heap::{HeapMeta, VMRequest};
use crate::util::options::UnsafeOptionsWrapper;
#[cfg(feature = "sanity")]
use crate::util::sanity::Liveness;
use crate::util::{ObjectReference, OpaquePointer};
use crate::vm::{Scanning, VMBinding};

use super::mccollector::MCCollector;
use super::mcmutator::MCMutator;
use super::mctracelocal::MCTraceLocal;

/// Share of the heap range given to the mark-compact space.
const MC_FRACTION: f32 = 0.70;

lazy_static! {
    /// The second transitive closure. Forwarding addresses are computed
    /// from the mark bits left by the first closure, then the whole root
    /// set is walked again with the trace in forwarding mode so every
    /// reference is rewritten before the slide.
    ///
    /// The common spaces are prepared and released a second time around
    /// it: the forwarding closure re-traces them, and their first
    /// release has already emptied the large object from-space.
    static ref FORWARD_PHASE: Phase = Phase::Complex(
        vec![
            (Schedule::Global, Phase::CalculateForwarding),
            (Schedule::Global, Phase::Forward),
            (Schedule::Collector, Phase::Forward),
            (Schedule::Complex, PREPARE_STACKS.clone()),
            (Schedule::Collector, Phase::StackRoots),
            (Schedule::Global, Phase::StackRoots),
            (Schedule::Collector, Phase::Roots),
            (Schedule::Global, Phase::Roots),
            (Schedule::Collector, Phase::Closure),
            (Schedule::Global, Phase::Compact),
            (Schedule::Collector, Phase::Release),
            (Schedule::Global, Phase::Release),
        ],
        0
    );

    /// Mark-compact collection: the standard mark closure and release,
    /// then the forwarding pass.
    pub static ref MC_COLLECTION: Phase = Phase::Complex(
        vec![
            (Schedule::Complex, INIT_PHASE.clone()),
            (Schedule::Complex, ROOT_CLOSURE_PHASE.clone()),
            (Schedule::Complex, COMPLETE_CLOSURE_PHASE.clone()),
            (Schedule::Complex, FORWARD_PHASE.clone()),
            (Schedule::Complex, FINISH_PHASE.clone()),
        ],
        0
    );
}

pub struct MarkCompactUnsync<VM: VMBinding> {
    pub mc: MarkCompactSpace<VM>,
}

/// Global state of the mark-compact plan: one sliding-compaction space
/// over the common immortal and large object spaces. A collection is
/// two full closures with a forwarding-address computation between them
/// and the slide after.
pub struct MarkCompact<VM: VMBinding> {
    pub unsync: UnsafeCell<MarkCompactUnsync<VM>>,
    pub mc_trace: Trace,
    pub common: CommonPlan<VM>,
}

// Spaces in the cell are only mutated at phase boundaries, with the
// world stopped.
unsafe impl<VM: VMBinding> Sync for MarkCompact<VM> {}

impl<VM: VMBinding> Plan<VM> for MarkCompact<VM> {
    type MutatorT = MCMutator<VM>;
    type TraceLocalT = MCTraceLocal<VM>;
    type CollectorT = MCCollector<VM>;

    fn new(options: Arc<UnsafeOptionsWrapper>) -> Self {
        let mut heap = HeapMeta::new();
        let mc = MarkCompactSpace::new("mc", true, VMRequest::fraction(MC_FRACTION), &mut heap);
        MarkCompact {
            unsync: UnsafeCell::new(MarkCompactUnsync { mc }),
            mc_trace: Trace::new(),
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
        unsync.mc.init();
    }

    fn bind_mutator(&'static self, tls: OpaquePointer) -> Box<MCMutator<VM>> {
        Box::new(MCMutator::new(tls, self))
    }

    fn will_never_move(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        !unsync.mc.in_space(object)
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
                self.mc_trace.prepare();
                let unsync = unsafe { &mut *self.unsync.get() };
                unsync.mc.prepare();
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
            Phase::CalculateForwarding => {
                let unsync = unsafe { &*self.unsync.get() };
                unsync.mc.calculate_forwarding_pointer();
            }
            Phase::Forward => {
                self.mc_trace.prepare();
                self.common.collection_phase(tls, &Phase::Prepare);
            }
            Phase::Compact => {
                let unsync = unsafe { &*self.unsync.get() };
                unsync.mc.compact();
            }
            Phase::Release => {
                let unsync = unsafe { &mut *self.unsync.get() };
                unsync.mc.release();
                self.common.collection_phase(tls, phase);
            }
            Phase::Complete => {
                debug_assert!(self.mc_trace.values.is_empty());
                debug_assert!(self.mc_trace.root_locations.is_empty());
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
        unsync.mc.in_space(object) || self.common.in_common_space(object)
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        if unsync.mc.in_space(object) {
            return unsync.mc.is_live(object);
        }
        self.common.is_live_in_common_space(object)
    }

    /// The forwarding closure consumes the mark bits, so outside the
    /// window between the two closures the headers carry no reachability
    /// evidence at all.
    #[cfg(feature = "sanity")]
    fn expected_liveness(&self, object: ObjectReference) -> Liveness {
        let unsync = unsafe { &*self.unsync.get() };
        if unsync.mc.in_space(object) {
            return Liveness::Unsure;
        }
        if self.is_live(object) {
            Liveness::Alive
        } else {
            Liveness::Dead
        }
    }

    fn get_pages_used(&self) -> usize {
        let unsync = unsafe { &*self.unsync.get() };
        unsync.mc.reserved_pages() + self.common.get_pages_used()
    }
}

impl<VM: VMBinding> MarkCompact<VM> {
    pub fn get_mc(&self) -> &'static MarkCompactSpace<VM> {
        let unsync = unsafe { &*self.unsync.get() };
        &unsync.mc
    }
}
