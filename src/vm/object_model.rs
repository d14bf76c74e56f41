use crate::plan::Allocator;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::VMBinding;

/// How the runtime lays objects out in memory, and how the engine may
/// borrow header bits from them.
///
/// The engine reserves one byte (or, for copying paths, one word) of
/// header state per object. The binding decides where that byte lives;
/// the engine only ever touches it through the accessors below.
pub trait ObjectModel<VM: VMBinding> {
    /// Copy `from` into space allocated through the active collector,
    /// returning the new object. The caller has already established that
    /// the object is eligible for copying.
    fn copy(from: ObjectReference, allocator: Allocator, tls: OpaquePointer) -> ObjectReference;

    /// Copy `from` to the region beginning at `to`, returning the new
    /// object reference. `region` is the end of the previously copied
    /// object, or zero when unknown.
    fn copy_to(from: ObjectReference, to: ObjectReference, region: Address) -> Address;

    /// The reference `from` will have once its data has been copied to `to`.
    fn get_reference_when_copied_to(from: ObjectReference, to: Address) -> ObjectReference;

    /// Current size of the object, in bytes, including the runtime's header.
    fn get_current_size(object: ObjectReference) -> usize;

    /// Size the object will occupy once copied.
    fn get_size_when_copied(object: ObjectReference) -> usize;

    /// Alignment the copy of this object requires.
    fn get_align_when_copied(object: ObjectReference) -> usize;

    /// Alignment offset the copy of this object requires.
    fn get_align_offset_when_copied(object: ObjectReference) -> isize;

    /// The runtime's type descriptor for the object.
    fn get_type_descriptor(reference: ObjectReference) -> &'static [i8];

    /// The reference of the object whose data begins at `start`.
    fn get_object_from_start_address(start: Address) -> ObjectReference;

    /// The first address after the object's data.
    fn get_object_end_address(object: ObjectReference) -> Address;

    /// The lowest address of any data associated with the object,
    /// including headers the runtime places below the reference.
    fn object_start_ref(object: ObjectReference) -> Address;

    /// An address within the object that can stand for it in range
    /// queries.
    fn ref_to_address(object: ObjectReference) -> Address;

    /// Read the header byte the engine owns.
    fn read_available_byte(object: ObjectReference) -> u8;

    /// Write the header byte the engine owns.
    fn write_available_byte(object: ObjectReference, val: u8);

    /// Read the full header word the engine may use on copying paths.
    fn read_available_bits_word(object: ObjectReference) -> usize;

    /// Write the full header word the engine may use on copying paths.
    fn write_available_bits_word(object: ObjectReference, val: usize);

    /// Prepare an atomic update of the available bits word, returning the
    /// value observed.
    fn prepare_available_bits(object: ObjectReference) -> usize;

    /// Attempt to swing the available bits word from `old` to `new`.
    fn attempt_available_bits(object: ObjectReference, old: usize, new: usize) -> bool;

    /// Dump debugging information for an object.
    fn dump_object(object: ObjectReference);
}
