mod active_plan;
mod collection;
mod object_model;
mod scanning;

pub use self::active_plan::ActivePlan;
pub use self::collection::Collection;
pub use self::object_model::ObjectModel;
pub use self::scanning::Scanning;

#[cfg(test)]
pub mod dummyvm;

/// The set of capabilities a runtime must supply before the engine can
/// manage its heap. Each associated type answers one question the engine
/// cannot answer on its own: what an object looks like, how to find roots,
/// how to stop and start the world, and where the engine's own global
/// state lives.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    type VMObjectModel: ObjectModel<Self>;
    type VMScanning: Scanning<Self>;
    type VMCollection: Collection<Self>;
    type VMActivePlan: ActivePlan<Self>;

    /// The smallest alignment any allocation request may carry.
    const MIN_ALIGNMENT: usize = 1 << crate::util::constants::LOG_BYTES_IN_WORD;
    /// The largest alignment any allocation request may carry. Requests
    /// outside [MIN_ALIGNMENT, MAX_ALIGNMENT] are binding bugs.
    const MAX_ALIGNMENT: usize = 1 << crate::util::constants::LOG_BYTES_IN_WORD;
    /// A value to fill in alignment gaps. This value can be used for debugging.
    const ALIGNMENT_VALUE: usize = 0xdead_beef;
}
