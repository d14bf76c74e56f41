pub mod ms;
pub mod mscollector;
pub mod msconstraints;
pub mod msmutator;
pub mod mstracelocal;

pub use self::ms::MarkSweep;
pub use self::mscollector::MSCollector;
pub use self::msmutator::MSMutator;
pub use self::mstracelocal::MSTraceLocal;

pub use self::ms::MarkSweep as SelectedPlan;
pub use self::msconstraints as SelectedConstraints;
