pub mod block;
pub use self::block::Block;

use std::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use crate::plan::TransitiveClosure;
use crate::policy::space::{CommonSpace, Space};
use crate::util::alloc::size_classes::SIZE_CLASSES;
use crate::util::heap::{FreeListPageResource, HeapMeta, PageResource, VMRequest};
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::{ObjectModel, VMBinding};

/// Mark states alternate between two odd values, so a marked object's
/// low header bits can never be mistaken for a free cell's next pointer
/// (word aligned) or fresh zeroed memory.
const MARK_BITS_MASK: usize = 0b11;
const INITIAL_MARK_STATE: usize = 0b01;

const EMPTY_BLOCK_LIST: Vec<Block> = Vec::new();

struct BlockLists {
    /// Blocks known to have free cells, per size class.
    available: [Vec<Block>; SIZE_CLASSES],
    /// Full blocks and blocks currently bound to an allocator, per
    /// size class.
    consumed: [Vec<Block>; SIZE_CLASSES],
}

/// Non-moving space for small objects, carved into per-size-class
/// blocks. Liveness is a mark state in each object's header; the sweep
/// turns everything unmarked back into free cells.
pub struct MarkSweepSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: FreeListPageResource,
    mark_state: AtomicUsize,
    blocks: Mutex<BlockLists>,
}

impl<VM: VMBinding> Space<VM> for MarkSweepSpace<VM> {
    fn as_space(&self) -> &dyn Space<VM> {
        self
    }

    fn common(&self) -> &CommonSpace<VM> {
        &self.common
    }

    fn page_resource(&self) -> &dyn PageResource<VM> {
        &self.pr
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        VM::VMObjectModel::read_available_bits_word(object) & MARK_BITS_MASK
            == self.mark_state.load(Ordering::SeqCst)
    }
}

impl<VM: VMBinding> MarkSweepSpace<VM> {
    pub fn new(
        name: &'static str,
        zeroed: bool,
        vmrequest: VMRequest,
        heap: &mut HeapMeta,
    ) -> Self {
        let common = CommonSpace::new(name, false, false, zeroed, vmrequest, heap);
        MarkSweepSpace {
            pr: FreeListPageResource::new_contiguous(common.start, common.extent),
            common,
            mark_state: AtomicUsize::new(INITIAL_MARK_STATE),
            blocks: Mutex::new(BlockLists {
                available: [EMPTY_BLOCK_LIST; SIZE_CLASSES],
                consumed: [EMPTY_BLOCK_LIST; SIZE_CLASSES],
            }),
        }
    }

    /// New objects (and objects copied in from elsewhere) are stamped
    /// with the current mark state.
    pub fn initialize_header(&self, object: ObjectReference) {
        let old_value = VM::VMObjectModel::read_available_bits_word(object);
        let new_value = (old_value & !MARK_BITS_MASK) | self.mark_state.load(Ordering::SeqCst);
        VM::VMObjectModel::write_available_bits_word(object, new_value);
    }

    pub fn prepare(&self) {
        let state = self.mark_state.load(Ordering::SeqCst);
        self.mark_state
            .store(MARK_BITS_MASK + 1 - state, Ordering::SeqCst);
    }

    /// Sweep every block: unmarked cells go back on their block's free
    /// list, blocks with no survivors go back to the page pool.
    pub fn release(&self) {
        let mark_state = self.mark_state.load(Ordering::SeqCst);
        let mut guard = self.blocks.lock();
        let BlockLists {
            available,
            consumed,
        } = &mut *guard;
        for sc in 0..SIZE_CLASSES {
            let blocks: Vec<Block> = available[sc]
                .drain(..)
                .chain(consumed[sc].drain(..))
                .collect();
            for block in blocks {
                if self.sweep_block(block, sc, mark_state) {
                    trace!("releasing empty block {:?}", block);
                    self.pr.release_pages(block.start());
                } else if block.free_list_head().is_zero() {
                    consumed[sc].push(block);
                } else {
                    available[sc].push(block);
                }
            }
        }
    }

    /// Rebuild one block's free list from the mark bits, freeing every
    /// cell whose contents are not marked. True when nothing survived.
    fn sweep_block(&self, block: Block, sc: usize, mark_state: usize) -> bool {
        debug_assert!(block.size_class() == sc);
        let cells = block::cells_in_block(sc);
        block.store_state(Address::ZERO, sc, cells);
        for index in (0..cells).rev() {
            let cell = block.cell(index, sc);
            let object = VM::VMObjectModel::get_object_from_start_address(cell);
            if VM::VMObjectModel::read_available_bits_word(object) & MARK_BITS_MASK != mark_state {
                block.free_cell(cell);
            }
        }
        block.in_use() == 0
    }

    /// Hand over a block of this class with known free cells, if one
    /// exists. The block moves to the consumed list; the caller owns
    /// its free list until the next flush.
    pub fn pop_available_block(&self, sc: usize) -> Option<Block> {
        let mut guard = self.blocks.lock();
        let block = guard.available[sc].pop();
        if let Some(block) = block {
            guard.consumed[sc].push(block);
        }
        block
    }

    /// Acquire and register a fresh block. Zero when a collection was
    /// triggered instead.
    pub fn acquire_block(&self, sc: usize, tls: OpaquePointer) -> Block {
        let start = self.acquire(tls, block::block_pages(sc));
        let block = Block::new(start);
        if !block.is_zero() {
            self.blocks.lock().consumed[sc].push(block);
        }
        block
    }

    pub fn trace_object<T: TransitiveClosure>(
        &self,
        trace: &mut T,
        object: ObjectReference,
    ) -> ObjectReference {
        if self.attempt_mark(object, self.mark_state.load(Ordering::SeqCst)) {
            trace.process_node(object);
        }
        object
    }

    fn attempt_mark(&self, object: ObjectReference, mark_state: usize) -> bool {
        loop {
            let old_value = VM::VMObjectModel::prepare_available_bits(object);
            if old_value & MARK_BITS_MASK == mark_state {
                return false;
            }
            if VM::VMObjectModel::attempt_available_bits(
                object,
                old_value,
                (old_value & !MARK_BITS_MASK) | mark_state,
            ) {
                return true;
            }
        }
    }
}
