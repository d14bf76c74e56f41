use crate::plan::selected_plan::SelectedPlan;
use crate::plan::Plan;
use crate::policy::space::Space;
use crate::util::constants::*;
use crate::util::{Address, OpaquePointer};
use crate::vm::{ActivePlan, Collection, VMBinding};

#[inline(always)]
pub fn align_allocation_no_fill<VM: VMBinding>(
    region: Address,
    alignment: usize,
    offset: isize,
) -> Address {
    align_allocation::<VM>(region, alignment, offset, VM::MIN_ALIGNMENT, false)
}

#[inline(always)]
pub fn align_allocation<VM: VMBinding>(
    region: Address,
    alignment: usize,
    offset: isize,
    known_alignment: usize,
    fillalignmentgap: bool,
) -> Address {
    debug_assert!(known_alignment >= VM::MIN_ALIGNMENT);
    debug_assert!(!(fillalignmentgap && region.is_zero()));
    debug_assert!(alignment <= VM::MAX_ALIGNMENT);
    debug_assert!(offset >= 0);
    debug_assert!((alignment & (VM::MIN_ALIGNMENT - 1)) == 0);
    debug_assert!((offset & (VM::MIN_ALIGNMENT - 1) as isize) == 0);

    // No alignment ever required.
    if alignment <= known_alignment || VM::MAX_ALIGNMENT <= VM::MIN_ALIGNMENT {
        return region;
    }

    // May require an alignment
    let region_isize = region.as_usize() as isize;
    let mask = (alignment - 1) as isize; // fromIntSignExtend
    let neg_off = -offset; // fromIntSignExtend
    let delta = (neg_off - region_isize) & mask;

    if fillalignmentgap && (VM::ALIGNMENT_VALUE != 0) {
        fill_alignment_gap::<VM>(region, region + delta);
    }

    region + delta
}

#[inline(always)]
pub fn fill_alignment_gap<VM: VMBinding>(immut_start: Address, end: Address) {
    let mut start = immut_start;

    if VM::MAX_ALIGNMENT - VM::MIN_ALIGNMENT == BYTES_IN_WORD {
        // At most a single hole
        if end - start != 0 {
            unsafe {
                start.store(VM::ALIGNMENT_VALUE);
            }
        }
    } else {
        while start < end {
            unsafe {
                start.store(VM::ALIGNMENT_VALUE);
            }
            start += BYTES_IN_WORD;
        }
    }
}

/// The worst-case footprint of a `size`-byte request once any alignment
/// padding is accounted for. Used when deciding how many whole pages or
/// which size class a request needs.
#[inline(always)]
pub fn get_maximum_aligned_size<VM: VMBinding>(
    size: usize,
    alignment: usize,
    known_alignment: usize,
) -> usize {
    debug_assert!(known_alignment >= VM::MIN_ALIGNMENT);
    if VM::MAX_ALIGNMENT <= VM::MIN_ALIGNMENT || alignment <= known_alignment {
        size
    } else {
        size + alignment - known_alignment
    }
}

pub trait Allocator<VM: VMBinding> {
    fn get_tls(&self) -> OpaquePointer;

    fn get_space(&self) -> Option<&'static dyn Space<VM>>;
    fn get_plan(&self) -> &'static SelectedPlan<VM>;

    fn alloc(&mut self, size: usize, align: usize, offset: isize) -> Address;

    #[inline(never)]
    fn alloc_slow(&mut self, size: usize, align: usize, offset: isize) -> Address {
        self.alloc_slow_inline(size, align, offset)
    }

    /// Acquire fresh memory from the space, retrying across collections.
    /// Each failed attempt has triggered a collection inside `acquire`;
    /// if even an emergency collection cannot free enough, the request
    /// is hopeless and the binding's out-of-memory handler runs.
    #[inline(always)]
    fn alloc_slow_inline(&mut self, size: usize, align: usize, offset: isize) -> Address {
        let tls = self.get_tls();
        // Whether the collection behind the previous failed attempt was
        // already an emergency one.
        let mut emergency_collection = false;
        loop {
            let result = self.alloc_slow_once(size, align, offset);

            if !unsafe { VM::VMActivePlan::is_mutator(tls) } {
                // Collector threads cannot block on a collection, so
                // their requests must always be served.
                debug_assert!(!result.is_zero());
                return result;
            }

            if !result.is_zero() {
                return result;
            }

            if emergency_collection && self.get_plan().base().is_emergency_collection() {
                error!("The heap is too small for an allocation of {} bytes", size);
                VM::VMCollection::out_of_memory(tls);
            }
            emergency_collection = self.get_plan().base().is_emergency_collection();
            trace!(
                "alloc_slow: retrying, last collection emergency: {}",
                emergency_collection
            );
        }
    }

    /// Single attempt of the slow path. Zero means a collection blocked
    /// this thread and the caller should retry.
    fn alloc_slow_once(&mut self, size: usize, align: usize, offset: isize) -> Address;
}
