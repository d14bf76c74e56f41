use crate::gctk::GCTK;
use crate::plan::phase::Phase;
use crate::plan::plan::Allocator;
use crate::plan::selected_plan::SelectedConstraints;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::VMBinding;

/// Per-collector-thread state: copy allocators, trace locals and the
/// thread's share of each collection phase.
pub trait CollectorContext<VM: VMBinding> {
    fn new(gctk: &'static GCTK<VM>) -> Self;

    /// Called on the collector thread itself before it parks for the
    /// first time.
    fn init(&mut self, tls: OpaquePointer);

    /// Allocate space an object is about to be copied into.
    fn alloc_copy(
        &mut self,
        original: ObjectReference,
        bytes: usize,
        align: usize,
        offset: isize,
        allocator: Allocator,
    ) -> Address;

    /// Entry point for the collector thread.
    fn run(&mut self, tls: OpaquePointer);

    fn collection_phase(&mut self, tls: OpaquePointer, phase: &Phase, primary: bool);

    fn get_tls(&self) -> OpaquePointer;

    fn copy_check_allocator(
        &self,
        _from: ObjectReference,
        bytes: usize,
        _align: usize,
        allocator: Allocator,
    ) -> Allocator {
        if bytes > SelectedConstraints::MAX_NON_LOS_COPY_BYTES {
            Allocator::Los
        } else {
            allocator
        }
    }

    fn post_copy(
        &self,
        _object: ObjectReference,
        _bytes: usize,
        _allocator: Allocator,
    ) {
    }
}
