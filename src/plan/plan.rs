use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use atomic::Atomic;

use crate::plan::controller_collector_context::ControllerCollectorContext;
use crate::plan::mutator_context::MutatorContext;
use crate::plan::parallel_collector::ParallelCollector;
use crate::plan::phase::Phase;
use crate::plan::tracelocal::TraceLocal;
use crate::policy::immortalspace::ImmortalSpace;
use crate::policy::largeobjectspace::LargeObjectSpace;
use crate::policy::space::Space;
use crate::util::conversions;
use crate::util::heap::{HeapMeta, VMRequest};
use crate::util::options::UnsafeOptionsWrapper;
#[cfg(feature = "sanity")]
use crate::util::sanity::{Liveness, SanityChecker};
use crate::util::statistics::stats::Stats;
use crate::util::{ObjectReference, OpaquePointer};
use crate::vm::{Collection, VMBinding};

/// Allocation site kinds a mutator can name. `Default` goes to the
/// plan's primary space.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allocator {
    Default = 0,
    Immortal = 1,
    Los = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GcStatus {
    NotInGC,
    GcPrepare,
    GcProper,
}

/// Collections a single allocation may force before the heap is declared
/// exhausted.
pub const MAX_COLLECTION_ATTEMPTS: usize = 3;

/// Virtual-range shares for the spaces every plan carries.
const IMMORTAL_FRACTION: f32 = 0.05;
const LOS_FRACTION: f32 = 0.25;

pub trait Plan<VM: VMBinding>: 'static + Sync {
    type MutatorT: MutatorContext<VM>;
    type TraceLocalT: TraceLocal;
    type CollectorT: ParallelCollector<VM>;

    fn new(options: Arc<UnsafeOptionsWrapper>) -> Self;
    fn base(&self) -> &BasePlan<VM>;
    fn common(&self) -> &CommonPlan<VM>;

    /// Fix the heap budget and mark the plan live. Called exactly once,
    /// before any allocation.
    fn gc_init(&self, heap_size: usize);

    fn bind_mutator(&'static self, tls: OpaquePointer) -> Box<Self::MutatorT>;

    fn will_never_move(&self, object: ObjectReference) -> bool;

    /// One step of the collection state machine, executed with the world
    /// stopped.
    fn collection_phase(&self, tls: OpaquePointer, phase: &Phase);

    /// Whether `object` points into a space this plan manages.
    fn is_valid_ref(&self, object: ObjectReference) -> bool;

    fn is_live(&self, object: ObjectReference) -> bool;

    /// What the owning space can promise about `object` without running a
    /// trace. Plans whose headers cannot answer override this.
    #[cfg(feature = "sanity")]
    fn expected_liveness(&self, object: ObjectReference) -> Liveness {
        if self.is_live(object) {
            Liveness::Alive
        } else {
            Liveness::Dead
        }
    }

    fn get_total_pages(&self) -> usize {
        self.base().total_pages.load(Ordering::Relaxed)
    }

    /// Pages committed to data.
    fn get_pages_used(&self) -> usize;

    /// Pages a collection would need before it can free anything.
    /// Copying plans override this with the to-space size.
    fn get_collection_reserve(&self) -> usize {
        0
    }

    fn get_pages_reserved(&self) -> usize {
        self.get_pages_used() + self.get_collection_reserve()
    }

    fn get_pages_avail(&self) -> usize {
        self.get_total_pages()
            .saturating_sub(self.get_pages_reserved())
    }

    fn is_initialized(&self) -> bool {
        self.base().initialized.load(Ordering::SeqCst)
    }

    fn gc_in_progress(&self) -> bool {
        self.base().gc_status() != GcStatus::NotInGC
    }

    /// The allocation slow path asks whether it should give the heap
    /// back before growing a space. Returns true when a collection was
    /// requested; the caller must then block and retry.
    fn poll(&self, space_full: bool, space: &dyn Space<VM>) -> bool {
        if !self.is_initialized()
            || self.gc_in_progress()
            || self.base().control_collector_context.request_is_pending()
        {
            return false;
        }
        let base = self.base();
        let space_quota = conversions::bytes_to_pages(space.common().extent);
        let space_over_quota = space.reserved_pages() > space_quota;
        let heap_full = self.get_pages_reserved() > self.get_total_pages();
        let reserve = std::cmp::max(
            base.exception_reserve.load(Ordering::Relaxed),
            base.options.min_reserve,
        );
        let reserve_low = self.get_pages_avail() <= reserve;
        if space_full || space_over_quota || heap_full || reserve_low {
            info!(
                "[POLL] {}: triggering collection ({}/{} pages reserved)",
                space.common().name,
                self.get_pages_reserved(),
                self.get_total_pages()
            );
            base.control_collector_context.request();
            return true;
        }
        false
    }
}

/// State every plan shares: liveness, the collection request path, the
/// exhaustion controller, statistics and options.
pub struct BasePlan<VM: VMBinding> {
    pub initialized: AtomicBool,
    gc_status: Mutex<GcStatus>,
    pub stacks_prepared: AtomicBool,
    pub emergency_collection: AtomicBool,
    pub total_pages: AtomicUsize,
    /// Pages held back so a collection can still run when the heap looks
    /// full. Retuned after every collection.
    pub exception_reserve: Atomic<usize>,
    pub available_pre_gc: Atomic<usize>,
    pub collection_attempt: Atomic<usize>,
    pub control_collector_context: ControllerCollectorContext<VM>,
    pub stats: Stats,
    pub options: Arc<UnsafeOptionsWrapper>,
    pub heap: HeapMeta,
    #[cfg(feature = "sanity")]
    pub sanity_checker: SanityChecker,
}

impl<VM: VMBinding> BasePlan<VM> {
    pub fn new(options: Arc<UnsafeOptionsWrapper>, heap: HeapMeta) -> Self {
        BasePlan {
            initialized: AtomicBool::new(false),
            gc_status: Mutex::new(GcStatus::NotInGC),
            stacks_prepared: AtomicBool::new(false),
            emergency_collection: AtomicBool::new(false),
            total_pages: AtomicUsize::new(0),
            exception_reserve: Atomic::new(0),
            available_pre_gc: Atomic::new(0),
            collection_attempt: Atomic::new(0),
            control_collector_context: ControllerCollectorContext::new(),
            stats: Stats::new(),
            options,
            heap,
            #[cfg(feature = "sanity")]
            sanity_checker: SanityChecker::new(),
        }
    }

    pub fn gc_init(&self, heap_size: usize) {
        let total = conversions::bytes_to_pages_up(heap_size);
        self.total_pages.store(total, Ordering::Relaxed);
        let fraction = self.options.reserve_fraction;
        let reserve = std::cmp::max(
            (total as f32 * fraction) as usize,
            self.options.min_reserve,
        );
        self.exception_reserve.store(reserve, Ordering::Relaxed);
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn gc_status(&self) -> GcStatus {
        *self.gc_status.lock().unwrap()
    }

    pub fn set_gc_status(&self, status: GcStatus) {
        let mut guard = self.gc_status.lock().unwrap();
        let old = *guard;
        if old == GcStatus::NotInGC && status != GcStatus::NotInGC {
            self.stats.gc_start();
        }
        if old != GcStatus::NotInGC && status == GcStatus::NotInGC {
            self.stats.gc_end();
        }
        *guard = status;
    }

    pub fn stacks_prepared(&self) -> bool {
        self.stacks_prepared.load(Ordering::SeqCst)
    }

    /// Record the headroom present before this collection disturbs the
    /// heap. Paired with `update_exception_reserve`.
    pub fn note_available_pre_gc(&self, available: usize) {
        self.available_pre_gc.store(available, Ordering::Relaxed);
    }

    /// Retune the reserve once a collection is over. Freeing more than
    /// the reserve counts as progress and resets the retry budget;
    /// anything else halves the reserve and burns one attempt.
    pub fn update_exception_reserve(&self, available: usize, tls: OpaquePointer) {
        let reserve = self.exception_reserve.load(Ordering::Relaxed);
        let progress = available > self.available_pre_gc.load(Ordering::Relaxed)
            && available > reserve;
        if progress {
            self.collection_attempt.store(0, Ordering::Relaxed);
            let fraction = self.options.reserve_fraction;
            let tuned = std::cmp::max(
                (available as f32 * fraction) as usize,
                self.options.min_reserve,
            );
            self.exception_reserve.store(tuned, Ordering::Relaxed);
            debug!("[RESERVE] progress; reserve retuned to {} pages", tuned);
        } else {
            let attempt = self.collection_attempt.fetch_add(1, Ordering::Relaxed) + 1;
            self.exception_reserve.store(reserve / 2, Ordering::Relaxed);
            warn!(
                "[RESERVE] no progress (attempt {}); reserve halved to {} pages",
                attempt,
                reserve / 2
            );
            if attempt >= MAX_COLLECTION_ATTEMPTS {
                error!(
                    "Collection made no progress after {} attempts ({} pages available)",
                    attempt, available
                );
                VM::VMCollection::out_of_memory(tls);
            }
        }
    }

    /// Decide what kind of collection this will be. With the reserve
    /// nearly gone the collection runs in emergency mode.
    pub fn set_collection_kind(&self, available: usize) {
        let reserve = self.exception_reserve.load(Ordering::Relaxed);
        let emergency = available < reserve;
        self.emergency_collection.store(emergency, Ordering::Relaxed);
        if emergency {
            info!("[KIND] emergency collection ({} pages available)", available);
        }
    }

    pub fn is_emergency_collection(&self) -> bool {
        self.emergency_collection.load(Ordering::Relaxed)
    }

    /// A mutator asked for a collection. Honoured unless one is already
    /// under way.
    pub fn handle_user_collection_request(&self, tls: OpaquePointer) {
        if !self.initialized.load(Ordering::SeqCst) || self.gc_status() != GcStatus::NotInGC {
            return;
        }
        info!("[POLL] user-triggered collection");
        self.control_collector_context.request();
        VM::VMCollection::block_for_gc(tls);
    }
}

pub struct CommonUnsync<VM: VMBinding> {
    pub immortal: ImmortalSpace<VM>,
    pub los: LargeObjectSpace<VM>,
}

/// The spaces every plan carries, plus the base state. Spaces sit behind
/// an `UnsafeCell`: they are only mutated inside collection phases, with
/// the world stopped.
pub struct CommonPlan<VM: VMBinding> {
    pub unsync: UnsafeCell<CommonUnsync<VM>>,
    pub base: BasePlan<VM>,
}

unsafe impl<VM: VMBinding> Sync for CommonPlan<VM> {}

impl<VM: VMBinding> CommonPlan<VM> {
    pub fn new(options: Arc<UnsafeOptionsWrapper>, mut heap: HeapMeta) -> Self {
        let immortal = ImmortalSpace::new(
            "immortal",
            true,
            VMRequest::fraction(IMMORTAL_FRACTION),
            &mut heap,
        );
        let los = LargeObjectSpace::new(
            "los",
            true,
            VMRequest::fraction(LOS_FRACTION),
            &mut heap,
        );
        CommonPlan {
            unsync: UnsafeCell::new(CommonUnsync { immortal, los }),
            base: BasePlan::new(options, heap),
        }
    }

    pub fn gc_init(&self, heap_size: usize) {
        self.base.gc_init(heap_size);
        let unsync = unsafe { &*self.unsync.get() };
        unsync.immortal.init();
        unsync.los.init();
    }

    pub fn get_immortal(&self) -> &'static ImmortalSpace<VM> {
        let unsync = unsafe { &*self.unsync.get() };
        &unsync.immortal
    }

    pub fn get_los(&self) -> &'static LargeObjectSpace<VM> {
        let unsync = unsafe { &*self.unsync.get() };
        &unsync.los
    }

    pub fn collection_phase(&self, _tls: OpaquePointer, phase: &Phase) {
        let unsync = unsafe { &mut *self.unsync.get() };
        match phase {
            Phase::Prepare => {
                unsync.immortal.prepare();
                unsync.los.prepare(true);
            }
            Phase::Release => {
                unsync.immortal.release();
                unsync.los.release(true);
            }
            _ => {}
        }
    }

    pub fn get_pages_used(&self) -> usize {
        let unsync = unsafe { &*self.unsync.get() };
        unsync.immortal.reserved_pages() + unsync.los.reserved_pages()
    }

    pub fn in_common_space(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        unsync.immortal.in_space(object) || unsync.los.in_space(object)
    }

    pub fn is_live_in_common_space(&self, object: ObjectReference) -> bool {
        let unsync = unsafe { &*self.unsync.get() };
        if unsync.immortal.in_space(object) {
            return unsync.immortal.is_live(object);
        }
        if unsync.los.in_space(object) {
            return unsync.los.is_live(object);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::options::Options;
    use crate::vm::dummyvm::DummyVM;

    const TLS: OpaquePointer = OpaquePointer::UNINITIALIZED;

    fn fresh_base() -> BasePlan<DummyVM> {
        let options = Arc::new(UnsafeOptionsWrapper::new(Options::default()));
        BasePlan::new(options, HeapMeta::new())
    }

    fn reserve(base: &BasePlan<DummyVM>) -> usize {
        base.exception_reserve.load(Ordering::Relaxed)
    }

    #[test]
    fn gc_init_seeds_the_reserve_from_the_fraction() {
        let base = fresh_base();
        base.gc_init(256 << 20);
        let total = base.total_pages.load(Ordering::Relaxed);
        assert_eq!(reserve(&base), (total as f32 * 0.1) as usize);
        assert!(base.initialized.load(Ordering::SeqCst));
    }

    #[test]
    fn productive_collections_shrink_the_reserve_to_the_floor() {
        let base = fresh_base();
        base.gc_init(256 << 20);
        let floor = base.options.min_reserve;

        let mut last = reserve(&base);
        for (before, after) in [(10_000, 20_000), (1_000, 2_100), (100, 500)] {
            base.note_available_pre_gc(before);
            base.update_exception_reserve(after, TLS);
            let now = reserve(&base);
            assert!(now < last);
            assert!(now >= floor);
            assert_eq!(base.collection_attempt.load(Ordering::Relaxed), 0);
            last = now;
        }
        assert_eq!(last, floor);
    }

    #[test]
    fn unproductive_collections_halve_the_reserve_and_burn_attempts() {
        let base = fresh_base();
        base.gc_init(256 << 20);
        let seeded = reserve(&base);

        base.note_available_pre_gc(5_000);
        base.update_exception_reserve(5_000, TLS);
        assert_eq!(reserve(&base), seeded / 2);
        assert_eq!(base.collection_attempt.load(Ordering::Relaxed), 1);

        base.note_available_pre_gc(5_000);
        base.update_exception_reserve(4_000, TLS);
        assert_eq!(reserve(&base), seeded / 2 / 2);
        assert_eq!(base.collection_attempt.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn freeing_pages_without_clearing_the_reserve_is_not_progress() {
        let base = fresh_base();
        base.gc_init(256 << 20);
        let seeded = reserve(&base);

        // More pages than before the collection, but still under the
        // reserve the next collection would need.
        base.note_available_pre_gc(10);
        base.update_exception_reserve(seeded - 1, TLS);
        assert_eq!(reserve(&base), seeded / 2);
        assert_eq!(base.collection_attempt.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn collections_under_the_reserve_run_in_emergency_mode() {
        let base = fresh_base();
        base.gc_init(256 << 20);
        let seeded = reserve(&base);

        base.set_collection_kind(seeded + 1);
        assert!(!base.is_emergency_collection());
        base.set_collection_kind(seeded - 1);
        assert!(base.is_emergency_collection());
    }
}
