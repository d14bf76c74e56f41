//! Blocks are the page-grained unit the mark-sweep space hands to its
//! free-list allocators. A block serves a single size class and carries
//! exactly one word of metadata, packed as:
//!
//! ```text
//! bits  0..=9   cells currently in use
//! bits 10..=15  size class
//! bits 16..=31  free-list head, as a byte offset from block start (0 = empty)
//! ```
//!
//! All other block state (which list a block is on) lives with the
//! owning space. The packing scheme is private to this module; everyone
//! else goes through the accessors.

use crate::util::alloc::size_classes::{self, SIZE_CLASSES};
use crate::util::constants::{BYTES_IN_PAGE, BYTES_IN_WORD, LOG_BYTES_IN_PAGE};
use crate::util::Address;
use std::fmt;

const INUSE_BITS: usize = 10;
const SIZE_CLASS_BITS: usize = 6;
const FREE_HEAD_BITS: usize = 16;

const INUSE_MASK: usize = (1 << INUSE_BITS) - 1;
const SIZE_CLASS_SHIFT: usize = INUSE_BITS;
const SIZE_CLASS_MASK: usize = ((1 << SIZE_CLASS_BITS) - 1) << SIZE_CLASS_SHIFT;
const FREE_HEAD_SHIFT: usize = INUSE_BITS + SIZE_CLASS_BITS;
const FREE_HEAD_MASK: usize = ((1 << FREE_HEAD_BITS) - 1) << FREE_HEAD_SHIFT;

/// The metadata word at the start of every block.
pub const BLOCK_HEADER_BYTES: usize = BYTES_IN_WORD;

/// A block is sized so it holds at least this many cells, where possible.
pub const MIN_CELLS: usize = 6;

/// Blocks never exceed this many pages.
pub const MAX_BLOCK_PAGES: usize = 8;

// Every field must survive the packing.
const_assert!(SIZE_CLASSES <= 1 << SIZE_CLASS_BITS);
const_assert!(MAX_BLOCK_PAGES * BYTES_IN_PAGE <= 1 << FREE_HEAD_BITS);
const_assert!((BYTES_IN_PAGE - BLOCK_HEADER_BYTES) / 4 <= INUSE_MASK);

/// Pages in one block of size class `sc`: the smallest power of two
/// that fits `MIN_CELLS` cells, capped at `MAX_BLOCK_PAGES`.
pub fn block_pages(sc: usize) -> usize {
    let cell_size = size_classes::cell_size(sc);
    let mut pages = 1;
    while pages < MAX_BLOCK_PAGES
        && ((pages << LOG_BYTES_IN_PAGE) - BLOCK_HEADER_BYTES) / cell_size < MIN_CELLS
    {
        pages <<= 1;
    }
    pages
}

pub fn block_bytes(sc: usize) -> usize {
    block_pages(sc) << LOG_BYTES_IN_PAGE
}

/// Whole cells that fit after the header. The tail fragment, if any, is
/// never handed out.
pub fn cells_in_block(sc: usize) -> usize {
    (block_bytes(sc) - BLOCK_HEADER_BYTES) / size_classes::cell_size(sc)
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Block(Address);

impl Block {
    pub fn new(start: Address) -> Block {
        Block(start)
    }

    pub fn start(self) -> Address {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    fn header(self) -> usize {
        unsafe { self.0.load::<usize>() }
    }

    pub fn free_list_head(self) -> Address {
        let offset = (self.header() & FREE_HEAD_MASK) >> FREE_HEAD_SHIFT;
        if offset == 0 {
            Address::ZERO
        } else {
            self.0 + offset
        }
    }

    pub fn size_class(self) -> usize {
        (self.header() & SIZE_CLASS_MASK) >> SIZE_CLASS_SHIFT
    }

    pub fn in_use(self) -> usize {
        self.header() & INUSE_MASK
    }

    /// Write the whole metadata word at once.
    pub fn store_state(self, free_head: Address, sc: usize, in_use: usize) {
        let offset = if free_head.is_zero() {
            0
        } else {
            debug_assert!(free_head > self.0 && free_head - self.0 < block_bytes(sc));
            free_head - self.0
        };
        debug_assert!(sc < SIZE_CLASSES);
        debug_assert!(in_use <= INUSE_MASK);
        let header = (offset << FREE_HEAD_SHIFT) | (sc << SIZE_CLASS_SHIFT) | in_use;
        unsafe { self.0.store::<usize>(header) };
    }

    pub fn first_cell(self) -> Address {
        self.0 + BLOCK_HEADER_BYTES
    }

    pub fn cell(self, index: usize, sc: usize) -> Address {
        debug_assert!(index < cells_in_block(sc));
        self.first_cell() + index * size_classes::cell_size(sc)
    }

    /// Partition the block into cells of class `sc`, threading every
    /// cell into a single list. Returns the head (the first cell).
    pub fn make_free_list(self, sc: usize) -> Address {
        let cell_size = size_classes::cell_size(sc);
        let first = self.first_cell();
        let mut cell = first;
        for index in 1..cells_in_block(sc) {
            let next = first + index * cell_size;
            unsafe { cell.store::<Address>(next) };
            cell = next;
        }
        unsafe { cell.store::<Address>(Address::ZERO) };
        self.store_state(first, sc, 0);
        first
    }

    /// Return one cell to this block's list, dropping the in-use count.
    pub fn free_cell(self, cell: Address) {
        debug_assert!(cell > self.0);
        unsafe { cell.store::<Address>(self.free_list_head()) };
        let in_use = self.in_use();
        debug_assert!(in_use > 0);
        self.store_state(cell, self.size_class(), in_use - 1);
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A word-aligned stand-in for a block's memory.
    fn backing(pages: usize) -> Vec<usize> {
        vec![0usize; (pages << LOG_BYTES_IN_PAGE) / BYTES_IN_WORD]
    }

    #[test]
    fn header_round_trips() {
        let buf = backing(1);
        let block = Block::new(Address::from_ptr(buf.as_ptr()));
        let head = block.start() + 48usize;
        block.store_state(head, 9, 77);
        assert_eq!(block.free_list_head(), head);
        assert_eq!(block.size_class(), 9);
        assert_eq!(block.in_use(), 77);

        block.store_state(Address::ZERO, 39, 0);
        assert!(block.free_list_head().is_zero());
        assert_eq!(block.size_class(), 39);
        assert_eq!(block.in_use(), 0);
    }

    #[test]
    fn geometry_holds_min_cells() {
        for sc in 0..SIZE_CLASSES {
            let pages = block_pages(sc);
            assert!(pages == 1 || pages == 2 || pages == 4 || pages == 8);
            let cells = cells_in_block(sc);
            // The largest classes cannot reach MIN_CELLS even in the
            // biggest block.
            if pages < MAX_BLOCK_PAGES {
                assert!(cells >= MIN_CELLS);
            }
            assert!(cells >= 1);
            assert!(BLOCK_HEADER_BYTES + cells * size_classes::cell_size(sc) <= block_bytes(sc));
        }
    }

    #[test]
    fn forty_byte_blocks_hold_about_a_hundred_cells() {
        let sc = size_classes::size_class(40);
        assert_eq!(size_classes::cell_size(sc), 40);
        assert_eq!(block_pages(sc), 1);
        assert_eq!(cells_in_block(sc), 102);
    }

    #[test]
    fn free_list_threads_every_cell() {
        let sc = size_classes::size_class(40);
        let buf = backing(block_pages(sc));
        let block = Block::new(Address::from_ptr(buf.as_ptr()));
        let mut cell = block.make_free_list(sc);
        assert_eq!(cell, block.first_cell());
        let mut count = 0;
        while !cell.is_zero() {
            count += 1;
            cell = unsafe { cell.load::<Address>() };
        }
        assert_eq!(count, cells_in_block(sc));
        assert_eq!(block.in_use(), 0);
    }

    #[test]
    fn free_cell_pushes_and_decrements() {
        let sc = size_classes::size_class(8);
        let buf = backing(1);
        let block = Block::new(Address::from_ptr(buf.as_ptr()));
        block.store_state(Address::ZERO, sc, 2);
        let cell = block.cell(5, sc);
        block.free_cell(cell);
        assert_eq!(block.free_list_head(), cell);
        assert_eq!(block.in_use(), 1);
        let next: Address = unsafe { cell.load() };
        assert!(next.is_zero());
    }
}
