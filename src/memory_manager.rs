//! The API the binding drives the engine through.
//!
//! The binding owns one `'static` [`GCTK`] and threads it through these
//! functions. Mutator handles come from [`bind_mutator`] as boxes the
//! binding stores per thread; collector contexts are created inside
//! [`enable_collection`] and handed to the binding through
//! [`Collection::spawn_worker_thread`](crate::vm::Collection::spawn_worker_thread),
//! whose new thread must call [`start_worker`].

use crate::gctk::GCTK;
use crate::plan::plan::Allocator;
use crate::plan::selected_plan::SelectedPlan;
use crate::plan::collector_context::CollectorContext;
use crate::plan::{MutatorContext, Plan, TraceLocal};
use crate::policy::space::Space;
use crate::util::constants::LOG_BYTES_IN_PAGE;
use crate::util::heap::layout;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::VMBinding;

pub type SelectedMutator<VM> = <SelectedPlan<VM> as Plan<VM>>::MutatorT;
pub type SelectedTraceLocal<VM> = <SelectedPlan<VM> as Plan<VM>>::TraceLocalT;
pub type SelectedCollector<VM> = <SelectedPlan<VM> as Plan<VM>>::CollectorT;

/// Fix the heap budget and map the spaces. Called exactly once, before
/// any allocation or thread registration.
pub fn gc_init<VM: VMBinding>(gctk: &'static GCTK<VM>, heap_size: usize) {
    crate::util::logger::try_init().ok();
    assert!(heap_size > 0, "heap size must be positive");
    gctk.plan.gc_init(heap_size);
    info!("gc_init: {} pages", heap_size >> LOG_BYTES_IN_PAGE);
}

/// Create the thread-local allocation context for a new mutator thread.
pub fn bind_mutator<VM: VMBinding>(
    gctk: &'static GCTK<VM>,
    tls: OpaquePointer,
) -> Box<SelectedMutator<VM>> {
    gctk.plan.bind_mutator(tls)
}

pub fn destroy_mutator<VM: VMBinding>(mutator: Box<SelectedMutator<VM>>) {
    drop(mutator);
}

/// Allocate `size` bytes for one object. Never returns zero: if the
/// heap is under pressure the calling thread blocks while a collection
/// runs, and a heap that stays exhausted is fatal.
pub fn alloc<VM: VMBinding>(
    mutator: &mut SelectedMutator<VM>,
    size: usize,
    align: usize,
    offset: isize,
    allocator: Allocator,
) -> Address {
    mutator.alloc(size, align, offset, allocator)
}

/// Finish publishing a freshly allocated object.
pub fn post_alloc<VM: VMBinding>(
    mutator: &mut SelectedMutator<VM>,
    refer: ObjectReference,
    type_refer: ObjectReference,
    bytes: usize,
    allocator: Allocator,
) {
    mutator.post_alloc(refer, type_refer, bytes, allocator);
}

/// The allocation slow path's collection check, exposed for bindings
/// whose own space implementations sit outside the plan.
pub fn poll<VM: VMBinding>(
    gctk: &'static GCTK<VM>,
    space_full: bool,
    space: &dyn Space<VM>,
) -> bool {
    gctk.plan.poll(space_full, space)
}

/// Create the collector contexts and hand each to a new worker thread.
/// The controller itself must then be started on its own thread via
/// [`start_control_collector`].
pub fn enable_collection<VM: VMBinding>(gctk: &'static GCTK<VM>, tls: OpaquePointer) {
    gctk.plan
        .base()
        .control_collector_context
        .init_group(gctk, gctk.options.threads, tls);
}

/// Body of the stop-the-world controller thread. Never returns.
pub fn start_control_collector<VM: VMBinding>(gctk: &'static GCTK<VM>, tls: OpaquePointer) {
    gctk.plan.base().control_collector_context.run(tls);
}

/// Body of one collector worker thread, from the pointer the binding
/// received in `spawn_worker_thread`. Never returns.
///
/// # Safety
/// `worker` must be the context pointer passed to exactly this thread.
pub unsafe fn start_worker<VM: VMBinding>(
    tls: OpaquePointer,
    worker: *mut SelectedCollector<VM>,
) {
    let worker = &mut *worker;
    worker.run(tls);
}

/// Apply one option setting by name, before `gc_init`.
pub fn process<VM: VMBinding>(gctk: &'static GCTK<VM>, name: &str, value: &str) -> bool {
    unsafe { gctk.options.process(name, value) }
}

pub fn used_pages<VM: VMBinding>(gctk: &GCTK<VM>) -> usize {
    gctk.plan.get_pages_used()
}

pub fn reserved_pages<VM: VMBinding>(gctk: &GCTK<VM>) -> usize {
    gctk.plan.get_pages_reserved()
}

pub fn free_pages<VM: VMBinding>(gctk: &GCTK<VM>) -> usize {
    gctk.plan.get_pages_avail()
}

pub fn total_pages<VM: VMBinding>(gctk: &GCTK<VM>) -> usize {
    gctk.plan.get_total_pages()
}

pub fn used_bytes<VM: VMBinding>(gctk: &GCTK<VM>) -> usize {
    used_pages(gctk) << LOG_BYTES_IN_PAGE
}

pub fn total_bytes<VM: VMBinding>(gctk: &GCTK<VM>) -> usize {
    total_pages(gctk) << LOG_BYTES_IN_PAGE
}

pub fn starting_heap_address() -> Address {
    layout::HEAP_START
}

pub fn last_heap_address() -> Address {
    layout::HEAP_END
}

/// Whether `object` survived (or has not yet faced) the current
/// collection.
pub fn is_live_object<VM: VMBinding>(gctk: &GCTK<VM>, object: ObjectReference) -> bool {
    gctk.plan.is_live(object)
}

/// Whether `object` falls inside any space this plan manages.
pub fn is_valid_ref<VM: VMBinding>(gctk: &GCTK<VM>, object: ObjectReference) -> bool {
    gctk.plan.is_valid_ref(object)
}

pub fn will_never_move<VM: VMBinding>(gctk: &GCTK<VM>, object: ObjectReference) -> bool {
    gctk.plan.will_never_move(object)
}

/// Force a collection on behalf of the running program.
pub fn handle_user_collection_request<VM: VMBinding>(
    gctk: &'static GCTK<VM>,
    tls: OpaquePointer,
) {
    gctk.plan.base().handle_user_collection_request(tls);
}

/// Trace `object` as a root, returning the reference to use from now on.
pub fn trace_root_object<VM: VMBinding>(
    trace_local: &mut SelectedTraceLocal<VM>,
    object: ObjectReference,
) -> ObjectReference {
    trace_local.trace_object(object)
}

pub fn trace_get_forwarded_reference<VM: VMBinding>(
    trace_local: &mut SelectedTraceLocal<VM>,
    object: ObjectReference,
) -> ObjectReference {
    trace_local.get_forwarded_reference(object)
}

pub fn report_delayed_root_edge<VM: VMBinding>(
    trace_local: &mut SelectedTraceLocal<VM>,
    addr: Address,
) {
    trace_local.report_delayed_root_edge(addr);
}

pub fn process_interior_edge<VM: VMBinding>(
    trace_local: &mut SelectedTraceLocal<VM>,
    target: ObjectReference,
    slot: Address,
    root: bool,
) {
    trace_local.process_interior_edge(target, slot, root);
}

pub fn will_not_move_in_current_collection<VM: VMBinding>(
    trace_local: &SelectedTraceLocal<VM>,
    obj: ObjectReference,
) -> bool {
    trace_local.will_not_move_in_current_collection(obj)
}

pub fn harness_begin<VM: VMBinding>(gctk: &'static GCTK<VM>, tls: OpaquePointer) {
    gctk.harness_begin(tls);
}

pub fn harness_end<VM: VMBinding>(gctk: &'static GCTK<VM>) {
    gctk.harness_end();
}
