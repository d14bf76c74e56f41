pub mod allocator;
pub use self::allocator::Allocator;

pub mod size_classes;

mod bumpallocator;
pub use self::bumpallocator::BumpAllocator;

mod free_list_allocator;
pub use self::free_list_allocator::FreeListAllocator;

mod large_object_allocator;
pub use self::large_object_allocator::LargeObjectAllocator;

mod markcompact_allocator;
pub use self::markcompact_allocator::MarkCompactAllocator;
