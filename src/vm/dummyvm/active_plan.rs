use crate::plan::selected_plan::SelectedPlan;
use crate::plan::Plan;
use crate::util::OpaquePointer;
use crate::vm::ActivePlan;

use super::{DummyVM, SINGLETON};

pub struct DummyActivePlan;

impl ActivePlan<DummyVM> for DummyActivePlan {
    fn global() -> &'static SelectedPlan<DummyVM> {
        &SINGLETON.plan
    }

    unsafe fn collector(
        _tls: OpaquePointer,
    ) -> &'static mut <SelectedPlan<DummyVM> as Plan<DummyVM>>::CollectorT {
        unimplemented!()
    }

    unsafe fn is_mutator(_tls: OpaquePointer) -> bool {
        true
    }

    unsafe fn mutator(
        _tls: OpaquePointer,
    ) -> &'static mut <SelectedPlan<DummyVM> as Plan<DummyVM>>::MutatorT {
        unimplemented!()
    }

    fn collector_count() -> usize {
        0
    }

    fn reset_mutator_iterator() {}

    fn get_next_mutator() -> Option<&'static mut <SelectedPlan<DummyVM> as Plan<DummyVM>>::MutatorT> {
        None
    }
}
