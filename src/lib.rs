//! gctk is a toolkit for the design and implementation of tracing garbage
//! collectors for managed runtimes.
//!
//! The crate provides a small family of stop-the-world collection plans
//! (mark-sweep, copying mark-sweep, mark-compact) built on one framework:
//! spaces own memory ranges and policy, per-thread allocators serve the
//! mutator fast paths, and per-collector trace-locals compute the
//! transitive closure over the object graph. A runtime adopts the toolkit
//! by implementing the capability traits in [`vm`] and driving the
//! functions in [`memory_manager`].
//!
//! Exactly one plan is compiled in, selected by cargo feature
//! (`marksweep` is the default; `copyms` and `markcompact` replace it).

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate cfg_if;
#[macro_use]
extern crate static_assertions;

pub mod gctk;
pub mod memory_manager;
pub mod plan;
pub mod policy;
pub mod util;
pub mod vm;

pub use crate::gctk::GCTK;
pub use crate::plan::selected_plan;
pub use crate::plan::Plan;
pub use crate::plan::TraceLocal;
pub use crate::plan::TransitiveClosure;
