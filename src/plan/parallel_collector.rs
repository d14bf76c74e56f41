use crate::plan::collector_context::CollectorContext;
use crate::plan::parallel_collector_group::ParallelCollectorGroup;
use crate::plan::tracelocal::TraceLocal;
use crate::vm::VMBinding;

/// A collector that runs as one worker in a gang. The group supplies
/// parking, triggering and rendezvous; the collector supplies the work.
pub trait ParallelCollector<VM: VMBinding>: CollectorContext<VM> + Sized {
    type T: TraceLocal;

    /// Block until the controller triggers the next cycle.
    fn park(&mut self);

    /// One full collection, executed in lockstep with the other workers.
    fn collect(&self);

    fn get_current_trace(&mut self) -> &mut Self::T {
        unreachable!()
    }

    fn parallel_worker_count(&self) -> usize {
        1
    }

    fn parallel_worker_ordinal(&self) -> usize {
        0
    }

    fn rendezvous(&self) -> usize {
        0
    }

    fn get_last_trigger_count(&self) -> usize;
    fn set_last_trigger_count(&mut self, val: usize);
    fn increment_last_trigger_count(&mut self);

    fn set_group(&mut self, group: *const ParallelCollectorGroup<VM, Self>);
    fn set_worker_ordinal(&mut self, ordinal: usize);
}
