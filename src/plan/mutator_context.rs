use crate::plan::phase::Phase;
use crate::plan::plan::Plan;
use crate::plan::selected_plan::SelectedPlan;
use crate::plan::Allocator as AllocationType;
use crate::util::alloc::{Allocator, BumpAllocator, LargeObjectAllocator};
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::VMBinding;

/// Per-mutator-thread state: the thread-local allocators and the
/// mutator's share of each collection phase.
pub trait MutatorContext<VM: VMBinding> {
    fn collection_phase(&mut self, tls: OpaquePointer, phase: &Phase, primary: bool);

    fn alloc(
        &mut self,
        size: usize,
        align: usize,
        offset: isize,
        allocator: AllocationType,
    ) -> Address;

    /// Finish publishing a freshly allocated object: write whatever
    /// header state its space expects.
    fn post_alloc(
        &mut self,
        refer: ObjectReference,
        type_refer: ObjectReference,
        bytes: usize,
        allocator: AllocationType,
    );

    fn get_tls(&self) -> OpaquePointer;
}

/// The allocators every mutator carries for the common spaces. Plans
/// route their `Immortal` and `Los` requests here and keep only their
/// own default-space allocators.
#[repr(C)]
pub struct CommonMutatorContext<VM: VMBinding> {
    immortal: BumpAllocator<VM>,
    los: LargeObjectAllocator<VM>,
    plan: &'static SelectedPlan<VM>,
}

impl<VM: VMBinding> CommonMutatorContext<VM> {
    pub fn new(tls: OpaquePointer, plan: &'static SelectedPlan<VM>) -> Self {
        CommonMutatorContext {
            immortal: BumpAllocator::new(tls, Some(plan.common().get_immortal()), plan),
            los: LargeObjectAllocator::new(tls, Some(plan.common().get_los()), plan),
            plan,
        }
    }

    pub fn alloc(
        &mut self,
        size: usize,
        align: usize,
        offset: isize,
        allocator: AllocationType,
    ) -> Address {
        match allocator {
            AllocationType::Immortal => self.immortal.alloc(size, align, offset),
            AllocationType::Los => self.los.alloc(size, align, offset),
            _ => panic!("Common context cannot allocate for {:?}", allocator),
        }
    }

    pub fn post_alloc(
        &mut self,
        object: ObjectReference,
        _type: ObjectReference,
        _bytes: usize,
        allocator: AllocationType,
    ) {
        match allocator {
            AllocationType::Immortal => {
                self.plan.common().get_immortal().initialize_header(object)
            }
            AllocationType::Los => self.plan.common().get_los().initialize_header(object, true),
            _ => panic!("Common context cannot finish {:?}", allocator),
        }
    }

    pub fn get_tls(&self) -> OpaquePointer {
        debug_assert!(self.immortal.tls == self.los.tls);
        self.immortal.tls
    }
}
