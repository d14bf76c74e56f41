use crate::plan::markcompact::MarkCompact;
use crate::plan::mutator_context::{CommonMutatorContext, MutatorContext};
use crate::plan::phase::Phase;
use crate::plan::plan::Plan;
use crate::plan::Allocator as AllocationType;
use crate::util::alloc::size_classes::MAX_SMALL_BYTES;
use crate::util::alloc::{Allocator, MarkCompactAllocator};
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{Collection, VMBinding};

/// Thread-local state of the mark-compact plan: a region-logging bump
/// allocator over the mc space, plus the common allocators.
#[repr(C)]
pub struct MCMutator<VM: VMBinding> {
    mc: MarkCompactAllocator<VM>,
    common: CommonMutatorContext<VM>,
    plan: &'static MarkCompact<VM>,
}

impl<VM: VMBinding> MutatorContext<VM> for MCMutator<VM> {
    fn collection_phase(&mut self, _tls: OpaquePointer, phase: &Phase, _primary: bool) {
        match phase {
            Phase::PrepareStacks => {
                if !self.plan.base().stacks_prepared() {
                    VM::VMCollection::prepare_mutator(self.get_tls(), self);
                }
            }
            Phase::Prepare => {
                // The compacting walks can only see retired regions.
                self.mc.flush();
            }
            Phase::Release => {}
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
            "MCMutator.alloc({}, {}, {}, {:?})",
            size,
            align,
            offset,
            allocator
        );
        match Self::route(size, allocator) {
            AllocationType::Default => self.mc.alloc(size, align, offset),
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
            AllocationType::Default => {}
            other => self.common.post_alloc(refer, type_refer, bytes, other),
        }
    }

    fn get_tls(&self) -> OpaquePointer {
        debug_assert!(self.mc.tls == self.common.get_tls());
        self.mc.tls
    }
}

impl<VM: VMBinding> MCMutator<VM> {
    pub fn new(tls: OpaquePointer, plan: &'static MarkCompact<VM>) -> Self {
        MCMutator {
            mc: MarkCompactAllocator::new(tls, Some(plan.get_mc()), plan),
            common: CommonMutatorContext::new(tls, plan),
            plan,
        }
    }

    /// Large default requests are not worth sliding around every
    /// collection; they take the large object path.
    fn route(size: usize, allocator: AllocationType) -> AllocationType {
        if allocator == AllocationType::Default && size > MAX_SMALL_BYTES {
            AllocationType::Los
        } else {
            allocator
        }
    }
}
