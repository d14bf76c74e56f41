use crate::plan::{MutatorContext, ParallelCollector};
use crate::util::OpaquePointer;
use crate::vm::Collection;

use super::DummyVM;

/// The tests drive collection machinery directly rather than through
/// stop-the-world thread choreography, so these hooks should never be
/// reached.
pub struct DummyCollection;

impl Collection<DummyVM> for DummyCollection {
    fn stop_all_mutators(_tls: OpaquePointer) {
        unimplemented!()
    }

    fn resume_mutators(_tls: OpaquePointer) {
        unimplemented!()
    }

    fn block_for_gc(_tls: OpaquePointer) {
        unimplemented!()
    }

    fn spawn_worker_thread<T: ParallelCollector<DummyVM>>(_tls: OpaquePointer, _ctx: *mut T) {
        unimplemented!()
    }

    fn prepare_mutator<T: MutatorContext<DummyVM>>(_tls: OpaquePointer, _m: &T) {}
}
