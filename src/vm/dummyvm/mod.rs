//! A minimal binding used by the crate's own tests. Objects are flat
//! arrays of reference fields behind a two word header: word 0 is the
//! header word whose available bits the engine borrows, word 1 the
//! field count.

mod active_plan;
mod collection;
mod object_model;
mod scanning;

#[cfg(test)]
mod tests;

use std::sync::Mutex;

use crate::gctk::GCTK;
use crate::memory_manager::{self, SelectedMutator};
use crate::plan::Allocator;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

pub use self::active_plan::DummyActivePlan;
pub use self::collection::DummyCollection;
pub use self::object_model::DummyObjectModel;
pub use self::scanning::DummyScanning;

#[derive(Default)]
pub struct DummyVM;

impl VMBinding for DummyVM {
    type VMObjectModel = DummyObjectModel;
    type VMScanning = DummyScanning;
    type VMCollection = DummyCollection;
    type VMActivePlan = DummyActivePlan;
}

lazy_static! {
    pub static ref SINGLETON: GCTK<DummyVM> = GCTK::new();

    /// Slots the scanning hooks report as thread roots.
    pub static ref ROOTS: Mutex<Vec<Address>> = Mutex::new(Vec::new());
}

pub const OBJECT_HEADER_WORDS: usize = 2;

pub fn object_size(fields: usize) -> usize {
    (OBJECT_HEADER_WORDS + fields) * BYTES_IN_WORD
}

/// Allocate one object with `fields` null reference fields.
pub fn alloc_object(mutator: &mut SelectedMutator<DummyVM>, fields: usize) -> ObjectReference {
    let size = object_size(fields);
    let addr = memory_manager::alloc(mutator, size, BYTES_IN_WORD, 0, Allocator::Default);
    assert!(!addr.is_zero());
    let object = unsafe { addr.to_object_reference() };
    unsafe { (addr + BYTES_IN_WORD).store::<usize>(fields) };
    memory_manager::post_alloc(mutator, object, ObjectReference::NULL, size, Allocator::Default);
    object
}

pub fn field_slot(object: ObjectReference, index: usize) -> Address {
    object.to_address() + (OBJECT_HEADER_WORDS + index) * BYTES_IN_WORD
}

pub fn store_field(object: ObjectReference, index: usize, value: ObjectReference) {
    unsafe { field_slot(object, index).store(value) };
}

pub fn load_field(object: ObjectReference, index: usize) -> ObjectReference {
    unsafe { field_slot(object, index).load() }
}

pub fn field_count(object: ObjectReference) -> usize {
    unsafe { (object.to_address() + BYTES_IN_WORD).load() }
}
