use crate::plan::marksweep::MarkSweep;
use crate::plan::mutator_context::{CommonMutatorContext, MutatorContext};
use crate::plan::phase::Phase;
use crate::plan::plan::Plan;
use crate::plan::Allocator as AllocationType;
use crate::util::alloc::size_classes::MAX_SMALL_BYTES;
use crate::util::alloc::{Allocator, FreeListAllocator};
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{Collection, VMBinding};

/// Thread-local state of the mark-sweep plan: a segregated free-list
/// allocator over the ms space, plus the common allocators.
#[repr(C)]
pub struct MSMutator<VM: VMBinding> {
    ms: FreeListAllocator<VM>,
    common: CommonMutatorContext<VM>,
    plan: &'static MarkSweep<VM>,
}

impl<VM: VMBinding> MutatorContext<VM> for MSMutator<VM> {
    fn collection_phase(&mut self, _tls: OpaquePointer, phase: &Phase, _primary: bool) {
        match phase {
            Phase::PrepareStacks => {
                if !self.plan.base().stacks_prepared() {
                    VM::VMCollection::prepare_mutator(self.get_tls(), self);
                }
            }
            Phase::Prepare => {
                self.ms.flush_free_lists();
            }
            Phase::Release => {
                self.ms.restore_free_lists();
            }
            _ => panic!("Mutator phase {:?} not handled", phase),
        }
    }

    fn alloc(
        &mut self,
        size: usize,
        align: usize,
        offset: isize,
        allocator: AllocationType,
    ) -> Address {
        trace!(
            "MSMutator.alloc({}, {}, {}, {:?})",
            size,
            align,
            offset,
            allocator
        );
        match Self::route(size, allocator) {
            AllocationType::Default => self.ms.alloc(size, align, offset),
            other => self.common.alloc(size, align, offset, other),
        }
    }

    fn post_alloc(
        &mut self,
        refer: ObjectReference,
        type_refer: ObjectReference,
        bytes: usize,
        allocator: AllocationType,
    ) {
        match Self::route(bytes, allocator) {
            AllocationType::Default => self.plan.get_ms().initialize_header(refer),
            other => self.common.post_alloc(refer, type_refer, bytes, other),
        }
    }

    fn get_tls(&self) -> OpaquePointer {
        debug_assert!(self.ms.tls == self.common.get_tls());
        self.ms.tls
    }
}

impl<VM: VMBinding> MSMutator<VM> {
    pub fn new(tls: OpaquePointer, plan: &'static MarkSweep<VM>) -> Self {
        MSMutator {
            ms: FreeListAllocator::new(tls, Some(plan.get_ms()), plan),
            common: CommonMutatorContext::new(tls, plan),
            plan,
        }
    }

    /// Default requests too big for any size class take the large
    /// object path.
    fn route(size: usize, allocator: AllocationType) -> AllocationType {
        if allocator == AllocationType::Default && size > MAX_SMALL_BYTES {
            AllocationType::Los
        } else {
            allocator
        }
    }
}
