use crate::plan::copyms::CopyMS;
use crate::plan::mutator_context::{CommonMutatorContext, MutatorContext};
use crate::plan::phase::Phase;
use crate::plan::plan::Plan;
use crate::plan::Allocator as AllocationType;
use crate::util::alloc::size_classes::MAX_SMALL_BYTES;
use crate::util::alloc::{Allocator, BumpAllocator};
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{Collection, VMBinding};

/// Thread-local state of the copying mark-sweep plan: a bump allocator
/// over the nursery, plus the common allocators. Fresh objects need no
/// header setup; the mark state is stamped when they are promoted.
#[repr(C)]
pub struct CopyMSMutator<VM: VMBinding> {
    nursery: BumpAllocator<VM>,
    common: CommonMutatorContext<VM>,
    plan: &'static CopyMS<VM>,
}

impl<VM: VMBinding> MutatorContext<VM> for CopyMSMutator<VM> {
    fn collection_phase(&mut self, _tls: OpaquePointer, phase: &Phase, _primary: bool) {
        match phase {
            Phase::PrepareStacks => {
                if !self.plan.base().stacks_prepared() {
                    VM::VMCollection::prepare_mutator(self.get_tls(), self);
                }
            }
            Phase::Prepare => {}
            Phase::Release => {
                // The buffer points into the evacuated from-space.
                self.nursery.reset();
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
            "CopyMSMutator.alloc({}, {}, {}, {:?})",
            size,
            align,
            offset,
            allocator
        );
        match Self::route(size, allocator) {
            AllocationType::Default => self.nursery.alloc(size, align, offset),
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
        debug_assert!(self.nursery.tls == self.common.get_tls());
        self.nursery.tls
    }
}

impl<VM: VMBinding> CopyMSMutator<VM> {
    pub fn new(tls: OpaquePointer, plan: &'static CopyMS<VM>) -> Self {
        CopyMSMutator {
            nursery: BumpAllocator::new(tls, Some(plan.get_nursery()), plan),
            common: CommonMutatorContext::new(tls, plan),
            plan,
        }
    }

    /// Default requests the mature free lists could never hold go
    /// straight to the large object path.
    fn route(size: usize, allocator: AllocationType) -> AllocationType {
        if allocator == AllocationType::Default && size > MAX_SMALL_BYTES {
            AllocationType::Los
        } else {
            allocator
        }
    }
}
