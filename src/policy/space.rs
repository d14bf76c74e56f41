use std::marker::PhantomData;

use crate::plan::Plan;
use crate::util::conversions;
use crate::util::heap::layout;
use crate::util::heap::space_descriptor::SpaceDescriptor;
use crate::util::heap::{HeapMeta, PageResource, VMRequest};
use crate::util::memory;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{ActivePlan, Collection, ObjectModel, VMBinding};

/// A named, contiguous slice of the heap range governed by a single
/// policy. The descriptor answers "does this address belong to you" in
/// a handful of instructions, which is the query every trace leans on.
pub struct CommonSpace<VM: VMBinding> {
    pub name: &'static str,
    pub descriptor: SpaceDescriptor,
    pub vmrequest: VMRequest,
    pub immortal: bool,
    pub movable: bool,
    /// Whether pages handed out by this space must be zeroed.
    pub zeroed: bool,
    pub start: Address,
    pub extent: usize,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> CommonSpace<VM> {
    pub fn new(
        name: &'static str,
        movable: bool,
        immortal: bool,
        zeroed: bool,
        vmrequest: VMRequest,
        heap: &mut HeapMeta,
    ) -> Self {
        let extent = match vmrequest {
            VMRequest::RequestFixed { extent, .. } | VMRequest::RequestExtent { extent, .. } => {
                conversions::raw_align_up(extent, layout::BYTES_IN_CHUNK)
            }
            VMRequest::RequestFraction { frac, .. } => {
                // Fractions share a fixed range, so round down to keep
                // the sum of all requests inside it.
                let bytes = (frac as f64 * layout::AVAILABLE_BYTES as f64) as usize;
                std::cmp::max(
                    conversions::raw_align_down(bytes, layout::BYTES_IN_CHUNK),
                    layout::BYTES_IN_CHUNK,
                )
            }
        };
        let start = match vmrequest {
            VMRequest::RequestFixed { start, .. } => {
                debug_assert!(start.is_aligned_to(layout::BYTES_IN_CHUNK));
                start
            }
            _ => heap.reserve(extent, vmrequest.top()),
        };
        let descriptor = SpaceDescriptor::create_descriptor_from_heap_range(start, start + extent);
        debug!(
            "Space {} at {} extent {} ({} chunks)",
            name,
            start,
            extent,
            extent >> layout::LOG_BYTES_IN_CHUNK
        );
        CommonSpace {
            name,
            descriptor,
            vmrequest,
            immortal,
            movable,
            zeroed,
            start,
            extent,
            phantom: PhantomData,
        }
    }
}

pub trait Space<VM: VMBinding>: Sync {
    fn as_space(&self) -> &dyn Space<VM>;
    fn common(&self) -> &CommonSpace<VM>;
    fn page_resource(&self) -> &dyn PageResource<VM>;

    /// Map the space's virtual range. Called once, before any
    /// allocation.
    fn init(&self) {
        let common = self.common();
        if let Err(e) = memory::mmap_noreserve(common.start, common.extent) {
            panic!(
                "Failed to map space {} at {} ({} bytes): {}",
                common.name, common.start, common.extent, e
            );
        }
    }

    fn in_space(&self, object: ObjectReference) -> bool {
        self.address_in_space(VM::VMObjectModel::ref_to_address(object))
    }

    fn address_in_space(&self, addr: Address) -> bool {
        self.common().descriptor.contains(addr)
    }

    /// Obtain `pages` pages, polling the plan first so a collection can
    /// intervene. A zero return means a collection ran (or is about to);
    /// the caller must retry from scratch.
    fn acquire(&self, tls: OpaquePointer, pages: usize) -> Address {
        trace!("acquiring {} pages from {}", pages, self.common().name);
        // Collectors must never block here; only mutators take the
        // polling path.
        let allow_poll = unsafe { VM::VMActivePlan::is_mutator(tls) }
            && VM::VMActivePlan::global().is_initialized();

        let pr = self.page_resource();
        let pages_reserved = pr.reserve_pages(pages);

        if allow_poll && VM::VMActivePlan::global().poll(false, self.as_space()) {
            pr.clear_request(pages_reserved);
            VM::VMCollection::block_for_gc(tls);
            return unsafe { Address::zero() };
        }

        let rtn = pr.alloc_pages(pages_reserved, pages, self.common().zeroed, tls);
        if rtn.is_zero() {
            if !allow_poll {
                panic!("Physical allocation failed during collection!");
            }
            let gc_performed = VM::VMActivePlan::global().poll(true, self.as_space());
            debug_assert!(gc_performed, "GC not performed when forced.");
            pr.clear_request(pages_reserved);
            VM::VMCollection::block_for_gc(tls);
            unsafe { Address::zero() }
        } else {
            rtn
        }
    }

    fn reserved_pages(&self) -> usize {
        self.page_resource().reserved_pages()
    }

    fn committed_pages(&self) -> usize {
        self.page_resource().committed_pages()
    }

    fn is_movable(&self) -> bool {
        self.common().movable
    }

    fn is_live(&self, object: ObjectReference) -> bool;

    /// The sanity pass asks spaces directly, bypassing the trace that is
    /// being audited.
    fn is_reachable(&self, object: ObjectReference) -> bool {
        self.is_live(object)
    }
}
