use std::sync::atomic::Ordering;

use crate::plan::Allocator;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::ObjectModel;

use super::{field_count, object_size, DummyVM};

pub struct DummyObjectModel;

impl ObjectModel<DummyVM> for DummyObjectModel {
    fn copy(_from: ObjectReference, _allocator: Allocator, _tls: OpaquePointer) -> ObjectReference {
        unimplemented!()
    }

    fn copy_to(_from: ObjectReference, _to: ObjectReference, _region: Address) -> Address {
        unimplemented!()
    }

    fn get_reference_when_copied_to(_from: ObjectReference, to: Address) -> ObjectReference {
        unsafe { to.to_object_reference() }
    }

    fn get_current_size(object: ObjectReference) -> usize {
        object_size(field_count(object))
    }

    fn get_size_when_copied(object: ObjectReference) -> usize {
        Self::get_current_size(object)
    }

    fn get_align_when_copied(_object: ObjectReference) -> usize {
        BYTES_IN_WORD
    }

    fn get_align_offset_when_copied(_object: ObjectReference) -> isize {
        0
    }

    fn get_type_descriptor(_reference: ObjectReference) -> &'static [i8] {
        unimplemented!()
    }

    fn get_object_from_start_address(start: Address) -> ObjectReference {
        unsafe { start.to_object_reference() }
    }

    fn get_object_end_address(object: ObjectReference) -> Address {
        object.to_address() + Self::get_current_size(object)
    }

    fn object_start_ref(object: ObjectReference) -> Address {
        object.to_address()
    }

    fn ref_to_address(object: ObjectReference) -> Address {
        object.to_address()
    }

    fn read_available_byte(object: ObjectReference) -> u8 {
        unsafe { object.to_address().atomic_load_u8(Ordering::SeqCst) }
    }

    fn write_available_byte(object: ObjectReference, val: u8) {
        unsafe { object.to_address().atomic_store_u8(val, Ordering::SeqCst) }
    }

    fn read_available_bits_word(object: ObjectReference) -> usize {
        unsafe { object.to_address().atomic_load_usize(Ordering::SeqCst) }
    }

    fn write_available_bits_word(object: ObjectReference, val: usize) {
        unsafe { object.to_address().atomic_store_usize(val, Ordering::SeqCst) }
    }

    fn prepare_available_bits(object: ObjectReference) -> usize {
        unsafe { object.to_address().atomic_load_usize(Ordering::SeqCst) }
    }

    fn attempt_available_bits(object: ObjectReference, old: usize, new: usize) -> bool {
        unsafe {
            object
                .to_address()
                .compare_exchange_usize(old, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        }
    }

    fn dump_object(object: ObjectReference) {
        println!(
            "{:?}: header {:#x}, {} fields",
            object,
            Self::read_available_bits_word(object),
            field_count(object)
        );
    }
}
