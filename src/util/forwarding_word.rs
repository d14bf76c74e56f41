//! Forwarding state kept in the low bits of an object's status word while
//! a copying or compacting collection is in flight.

use crate::plan::Allocator;
use crate::util::{Address, ObjectReference, OpaquePointer};
use crate::vm::ObjectModel;
use crate::vm::VMBinding;

// ...00
const FORWARDING_NOT_TRIGGERED_YET: u8 = 0;
// ...10
const BEING_FORWARDED: u8 = 2;
// ...11
const FORWARDED: u8 = 3;
// ...11
const FORWARDING_MASK: u8 = 3;

/// Race to claim an object for forwarding. On success the returned status
/// word has no forwarding bits set and the object is marked
/// `BEING_FORWARDED`; a loser sees the winner's bits and must wait via
/// `spin_and_get_forwarded_object`.
pub fn attempt_to_forward<VM: VMBinding>(object: ObjectReference) -> usize {
    let mut old_value = VM::VMObjectModel::prepare_available_bits(object);
    if (old_value as u8) & FORWARDING_MASK != FORWARDING_NOT_TRIGGERED_YET {
        return old_value;
    }
    while !VM::VMObjectModel::attempt_available_bits(
        object,
        old_value,
        old_value | BEING_FORWARDED as usize,
    ) {
        old_value = VM::VMObjectModel::prepare_available_bits(object);
        if (old_value as u8) & FORWARDING_MASK != FORWARDING_NOT_TRIGGERED_YET {
            return old_value;
        }
    }
    old_value
}

pub fn spin_and_get_forwarded_object<VM: VMBinding>(
    object: ObjectReference,
    status_word: usize,
) -> ObjectReference {
    let mut status_word = status_word;
    while (status_word as u8) & FORWARDING_MASK == BEING_FORWARDED {
        status_word = VM::VMObjectModel::read_available_bits_word(object);
    }
    if (status_word as u8) & FORWARDING_MASK == FORWARDED {
        unsafe { Address::from_usize(status_word & !(FORWARDING_MASK as usize)).to_object_reference() }
    } else {
        // Copying failed mid-flight; the object stays where it is.
        object
    }
}

/// Copy the object and publish the forwarding pointer in one store. Only
/// the winner of `attempt_to_forward` may call this.
pub fn forward_object<VM: VMBinding>(
    object: ObjectReference,
    allocator: Allocator,
    tls: OpaquePointer,
) -> ObjectReference {
    let new_object = VM::VMObjectModel::copy(object, allocator, tls);
    VM::VMObjectModel::write_available_bits_word(
        object,
        new_object.to_address().as_usize() | FORWARDED as usize,
    );
    new_object
}

/// Publish a forwarding pointer without copying. Used when the new
/// location was computed separately, as in sliding compaction.
pub fn set_forwarding_pointer<VM: VMBinding>(object: ObjectReference, ptr: ObjectReference) {
    VM::VMObjectModel::write_available_bits_word(
        object,
        ptr.to_address().as_usize() | FORWARDED as usize,
    );
}

pub fn is_forwarded<VM: VMBinding>(object: ObjectReference) -> bool {
    VM::VMObjectModel::read_available_byte(object) & FORWARDING_MASK == FORWARDED
}

pub fn is_forwarded_or_being_forwarded<VM: VMBinding>(object: ObjectReference) -> bool {
    VM::VMObjectModel::read_available_byte(object) & FORWARDING_MASK != 0
}

pub fn state_is_forwarded_or_being_forwarded(header: usize) -> bool {
    header as u8 & FORWARDING_MASK != 0
}

pub fn state_is_being_forwarded(header: usize) -> bool {
    header as u8 & FORWARDING_MASK == BEING_FORWARDED
}

pub fn clear_forwarding_bits<VM: VMBinding>(object: ObjectReference) {
    let value = VM::VMObjectModel::read_available_byte(object);
    VM::VMObjectModel::write_available_byte(object, value & !FORWARDING_MASK);
}

pub fn extract_forwarding_pointer(forwarding_word: usize) -> ObjectReference {
    unsafe { Address::from_usize(forwarding_word & !(FORWARDING_MASK as usize)).to_object_reference() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_word_predicates() {
        assert!(!state_is_forwarded_or_being_forwarded(0x40));
        assert!(state_is_being_forwarded(0x42));
        assert!(state_is_forwarded_or_being_forwarded(0x43));
        assert!(!state_is_being_forwarded(0x43));
    }

    #[test]
    fn pointer_survives_the_tag() {
        let ptr = unsafe { Address::from_usize(0x1000_0000).to_object_reference() };
        let word = ptr.to_address().as_usize() | FORWARDED as usize;
        assert_eq!(extract_forwarding_pointer(word), ptr);
    }
}
