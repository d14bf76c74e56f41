pub mod address;
pub mod alloc;
pub mod constants;
pub mod conversions;
pub mod forwarding_word;
pub mod heap;
pub mod int_array_freelist;
pub mod logger;
pub mod memory;
pub mod opaque_pointer;
pub mod options;
pub mod queue;
#[cfg(feature = "sanity")]
pub mod sanity;
pub mod statistics;
#[cfg(test)]
pub mod test_util;
pub mod treadmill;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::opaque_pointer::OpaquePointer;
