pub mod collector_context;
pub mod controller_collector_context;
pub mod mutator_context;
pub mod parallel_collector;
pub mod parallel_collector_group;
pub mod phase;
pub mod plan;
pub mod trace;
pub mod tracelocal;
pub mod transitive_closure;

pub use self::collector_context::CollectorContext;
pub use self::mutator_context::MutatorContext;
pub use self::parallel_collector::ParallelCollector;
pub use self::phase::Phase;
pub use self::plan::Allocator;
pub use self::plan::Plan;
pub use self::trace::Trace;
pub use self::tracelocal::TraceLocal;
pub use self::transitive_closure::TransitiveClosure;

// Exactly one plan is compiled in. The features are additive, so when
// several are enabled the precedence below decides which plan builds;
// the others are compiled out entirely because their thread contexts
// bind to the concrete selected plan type.
#[cfg(feature = "markcompact")]
pub mod markcompact;

#[cfg(all(feature = "copyms", not(feature = "markcompact")))]
pub mod copyms;

#[cfg(not(any(feature = "copyms", feature = "markcompact")))]
pub mod marksweep;

cfg_if! {
    if #[cfg(feature = "markcompact")] {
        pub use self::markcompact as selected_plan;
    } else if #[cfg(feature = "copyms")] {
        pub use self::copyms as selected_plan;
    } else {
        pub use self::marksweep as selected_plan;
    }
}

pub use self::selected_plan::SelectedConstraints;
pub use self::selected_plan::SelectedPlan;
