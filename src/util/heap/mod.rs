pub mod accounting;
pub mod freelistpageresource;
pub mod heap_meta;
pub mod layout;
pub mod monotonepageresource;
pub mod pageresource;
pub mod space_descriptor;
pub mod vmrequest;

pub use self::freelistpageresource::FreeListPageResource;
pub use self::heap_meta::HeapMeta;
pub use self::monotonepageresource::MonotonePageResource;
pub use self::pageresource::PageResource;
pub use self::vmrequest::VMRequest;
