pub mod mc;
pub mod mccollector;
pub mod mcconstraints;
pub mod mcmutator;
pub mod mctracelocal;

pub use self::mc::MarkCompact;
pub use self::mccollector::MCCollector;
pub use self::mcmutator::MCMutator;
pub use self::mctracelocal::MCTraceLocal;

pub use self::mc::MarkCompact as SelectedPlan;
pub use self::mcconstraints as SelectedConstraints;
