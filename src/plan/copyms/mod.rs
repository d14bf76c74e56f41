pub mod copyms;
pub mod copymscollector;
pub mod copymsconstraints;
pub mod copymsmutator;
pub mod copymstracelocal;

pub use self::copyms::CopyMS;
pub use self::copymscollector::CopyMSCollector;
pub use self::copymsmutator::CopyMSMutator;
pub use self::copymstracelocal::CopyMSTraceLocal;

pub use self::copyms::CopyMS as SelectedPlan;
pub use self::copymsconstraints as SelectedConstraints;
