use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::plan::collector_context::CollectorContext;
use crate::plan::mutator_context::MutatorContext;
use crate::plan::parallel_collector::ParallelCollector;
use crate::plan::plan::Plan;
use crate::util::OpaquePointer;
use crate::vm::{ActivePlan, VMBinding};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    Global,
    Collector,
    Mutator,
    Placeholder,
    Complex,
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    // Collection proper.
    SetCollectionKind,
    Initiate,
    Prepare,
    PrepareStacks,
    StackRoots,
    Roots,
    Closure,
    Release,
    Complete,
    // The forwarding pass compacting collectors insert.
    Forward,
    CalculateForwarding,
    Compact,
    // Heap integrity checking around the collection proper.
    PreSanityPlaceholder,
    PostSanityPlaceholder,
    SanitySetPreGC,
    SanitySetPostGC,
    SanityPrepare,
    SanityRoots,
    SanityBuildTable,
    SanityCheckTable,
    SanityRelease,
    Complex(Vec<(Schedule, Phase)>, usize),
    Empty,
}

lazy_static! {
    static ref EMPTY_PHASE: (Schedule, Phase) = (Schedule::Empty, Phase::Empty);

    pub static ref PREPARE_STACKS: Phase = Phase::Complex(
        vec![
            (Schedule::Mutator, Phase::PrepareStacks),
            (Schedule::Global, Phase::PrepareStacks),
        ],
        0
    );

    pub static ref INIT_PHASE: Phase = Phase::Complex(
        vec![
            (Schedule::Global, Phase::SetCollectionKind),
            (Schedule::Global, Phase::Initiate),
            (Schedule::Placeholder, Phase::PreSanityPlaceholder),
        ],
        0
    );

    pub static ref ROOT_CLOSURE_PHASE: Phase = Phase::Complex(
        vec![
            (Schedule::Mutator, Phase::Prepare),
            (Schedule::Global, Phase::Prepare),
            (Schedule::Collector, Phase::Prepare),
            (Schedule::Complex, PREPARE_STACKS.clone()),
            (Schedule::Collector, Phase::StackRoots),
            (Schedule::Global, Phase::StackRoots),
            (Schedule::Collector, Phase::Roots),
            (Schedule::Global, Phase::Roots),
            (Schedule::Collector, Phase::Closure),
        ],
        0
    );

    // Mutators restock their free lists from what the sweep rebuilt, so
    // their release runs last.
    pub static ref COMPLETE_CLOSURE_PHASE: Phase = Phase::Complex(
        vec![
            (Schedule::Collector, Phase::Release),
            (Schedule::Global, Phase::Release),
            (Schedule::Mutator, Phase::Release),
        ],
        0
    );

    pub static ref FINISH_PHASE: Phase = Phase::Complex(
        vec![
            (Schedule::Placeholder, Phase::PostSanityPlaceholder),
            (Schedule::Global, Phase::Complete),
        ],
        0
    );

    /// The standard tracing collection: one root closure, then release.
    pub static ref COLLECTION: Phase = Phase::Complex(
        vec![
            (Schedule::Complex, INIT_PHASE.clone()),
            (Schedule::Complex, ROOT_CLOSURE_PHASE.clone()),
            (Schedule::Complex, COMPLETE_CLOSURE_PHASE.clone()),
            (Schedule::Complex, FINISH_PHASE.clone()),
        ],
        0
    );
}

#[cfg(feature = "sanity")]
lazy_static! {
    pub static ref PRE_SANITY_PHASE: Phase = Phase::Complex(
        vec![
            (Schedule::Global, Phase::SanitySetPreGC),
            (Schedule::Global, Phase::SanityPrepare),
            (Schedule::Collector, Phase::SanityRoots),
            (Schedule::Collector, Phase::SanityBuildTable),
            (Schedule::Global, Phase::SanityCheckTable),
            (Schedule::Global, Phase::SanityRelease),
        ],
        0
    );
    pub static ref POST_SANITY_PHASE: Phase = Phase::Complex(
        vec![
            (Schedule::Global, Phase::SanitySetPostGC),
            (Schedule::Global, Phase::SanityPrepare),
            (Schedule::Collector, Phase::SanityRoots),
            (Schedule::Collector, Phase::SanityBuildTable),
            (Schedule::Global, Phase::SanityCheckTable),
            (Schedule::Global, Phase::SanityRelease),
        ],
        0
    );
}

/// Walks a gang of collectors through a stack of scheduled phases in
/// lockstep. The next phase is staged into whichever of two slots is
/// not currently being read, so workers never race the primary's
/// bookkeeping.
pub struct PhaseManager {
    even_mutator_reset_rendezvous: AtomicBool,
    odd_mutator_reset_rendezvous: AtomicBool,
    phase_stack: Mutex<Vec<(Schedule, Phase)>>,
    even_scheduled_phase: Mutex<(Schedule, Phase)>,
    odd_scheduled_phase: Mutex<(Schedule, Phase)>,
}

impl PhaseManager {
    pub fn new() -> Self {
        PhaseManager {
            even_mutator_reset_rendezvous: AtomicBool::new(false),
            odd_mutator_reset_rendezvous: AtomicBool::new(false),
            phase_stack: Mutex::new(Vec::new()),
            even_scheduled_phase: Mutex::new(EMPTY_PHASE.clone()),
            odd_scheduled_phase: Mutex::new(EMPTY_PHASE.clone()),
        }
    }

    /// Called by every worker at the start of a collection. The first
    /// to arrive seeds the stack; all then process it together.
    pub fn begin_new_phase_stack<VM: VMBinding>(
        &self,
        tls: OpaquePointer,
        scheduled_phase: (Schedule, Phase),
    ) {
        let order = unsafe { VM::VMActivePlan::collector(tls).rendezvous() };
        if order == 0 {
            self.push_scheduled_phase(scheduled_phase);
        }
        self.process_phase_stack::<VM>(tls);
    }

    pub fn push_scheduled_phase(&self, scheduled_phase: (Schedule, Phase)) {
        self.phase_stack.lock().unwrap().push(scheduled_phase);
    }

    fn process_phase_stack<VM: VMBinding>(&self, tls: OpaquePointer) {
        let plan = VM::VMActivePlan::global();
        let collector = unsafe { VM::VMActivePlan::collector(tls) };
        let order = collector.rendezvous();
        let primary = order == 0;
        let mut is_even_phase = true;
        if primary {
            self.set_next_phase(false, self.get_next_phase::<VM>(), false);
        }
        collector.rendezvous();

        loop {
            let (schedule, phase) = self.get_current_phase(is_even_phase);
            if schedule == Schedule::Empty {
                break;
            }
            match schedule {
                Schedule::Global => {
                    debug!("Global phase {:?}", phase);
                    if primary {
                        plan.collection_phase(tls, &phase)
                    }
                }
                Schedule::Collector => {
                    debug!("Collector phase {:?}", phase);
                    collector.collection_phase(tls, &phase, primary);
                }
                Schedule::Mutator => {
                    debug!("Mutator phase {:?}", phase);
                    while let Some(mutator) = VM::VMActivePlan::get_next_mutator() {
                        mutator.collection_phase(tls, &phase, primary);
                    }
                }
                _ => panic!("Invalid schedule {:?} in phase stack", schedule),
            }

            if primary {
                let next = self.get_next_phase::<VM>();
                let needs_reset_rendezvous = next.0 != Schedule::Empty
                    && schedule == Schedule::Mutator
                    && next.0 == Schedule::Mutator;
                self.set_next_phase(is_even_phase, next, needs_reset_rendezvous);
            }

            collector.rendezvous();

            if primary && schedule == Schedule::Mutator {
                VM::VMActivePlan::reset_mutator_iterator();
            }

            // Back-to-back mutator phases share the iterator, so its
            // reset has to be ordered before anyone starts the next one.
            if self.needs_mutator_reset_rendezvous(is_even_phase) {
                collector.rendezvous();
            }

            is_even_phase = !is_even_phase;
        }
    }

    fn get_current_phase(&self, is_even_phase: bool) -> (Schedule, Phase) {
        if is_even_phase {
            self.even_scheduled_phase.lock().unwrap().clone()
        } else {
            self.odd_scheduled_phase.lock().unwrap().clone()
        }
    }

    fn get_next_phase<VM: VMBinding>(&self) -> (Schedule, Phase) {
        let mut stack = self.phase_stack.lock().unwrap();
        loop {
            let top = match stack.pop() {
                Some(top) => top,
                None => return EMPTY_PHASE.clone(),
            };
            match top {
                (Schedule::Placeholder, placeholder) => {
                    if let Some(expansion) = Self::expand_placeholder::<VM>(&placeholder) {
                        stack.push((Schedule::Complex, expansion));
                    }
                }
                (Schedule::Complex, Phase::Complex(phases, cursor)) => {
                    if cursor < phases.len() {
                        let next = phases[cursor].clone();
                        stack.push((Schedule::Complex, Phase::Complex(phases, cursor + 1)));
                        stack.push(next);
                    }
                }
                (Schedule::Complex, phase) => {
                    panic!("Complex schedule with simple phase {:?}", phase)
                }
                simple => return simple,
            }
        }
    }

    #[cfg(feature = "sanity")]
    fn expand_placeholder<VM: VMBinding>(placeholder: &Phase) -> Option<Phase> {
        use crate::plan::selected_plan::SelectedPlan;
        let plan: &SelectedPlan<VM> = VM::VMActivePlan::global();
        if !plan.base().options.sanity {
            return None;
        }
        match placeholder {
            Phase::PreSanityPlaceholder => Some(PRE_SANITY_PHASE.clone()),
            Phase::PostSanityPlaceholder => Some(POST_SANITY_PHASE.clone()),
            _ => None,
        }
    }

    #[cfg(not(feature = "sanity"))]
    fn expand_placeholder<VM: VMBinding>(_placeholder: &Phase) -> Option<Phase> {
        None
    }

    fn set_next_phase(
        &self,
        is_even_phase: bool,
        scheduled_phase: (Schedule, Phase),
        needs_reset_rendezvous: bool,
    ) {
        if is_even_phase {
            *self.odd_scheduled_phase.lock().unwrap() = scheduled_phase;
            self.even_mutator_reset_rendezvous
                .store(needs_reset_rendezvous, Ordering::Relaxed);
        } else {
            *self.even_scheduled_phase.lock().unwrap() = scheduled_phase;
            self.odd_mutator_reset_rendezvous
                .store(needs_reset_rendezvous, Ordering::Relaxed);
        }
    }

    fn needs_mutator_reset_rendezvous(&self, is_even_phase: bool) -> bool {
        if is_even_phase {
            self.even_mutator_reset_rendezvous.load(Ordering::Relaxed)
        } else {
            self.odd_mutator_reset_rendezvous.load(Ordering::Relaxed)
        }
    }
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::dummyvm::DummyVM;

    fn flatten(stack: (Schedule, Phase)) -> Vec<(Schedule, Phase)> {
        let manager = PhaseManager::new();
        manager.push_scheduled_phase(stack);
        let mut flat = Vec::new();
        loop {
            let next = manager.get_next_phase::<DummyVM>();
            if next.0 == Schedule::Empty {
                return flat;
            }
            flat.push(next);
        }
    }

    #[test]
    fn collection_unfolds_in_barrier_order() {
        // Sanity placeholders vanish when the option is off, leaving the
        // bare collection.
        let expected = vec![
            (Schedule::Global, Phase::SetCollectionKind),
            (Schedule::Global, Phase::Initiate),
            (Schedule::Mutator, Phase::Prepare),
            (Schedule::Global, Phase::Prepare),
            (Schedule::Collector, Phase::Prepare),
            (Schedule::Mutator, Phase::PrepareStacks),
            (Schedule::Global, Phase::PrepareStacks),
            (Schedule::Collector, Phase::StackRoots),
            (Schedule::Global, Phase::StackRoots),
            (Schedule::Collector, Phase::Roots),
            (Schedule::Global, Phase::Roots),
            (Schedule::Collector, Phase::Closure),
            (Schedule::Collector, Phase::Release),
            (Schedule::Global, Phase::Release),
            (Schedule::Mutator, Phase::Release),
            (Schedule::Global, Phase::Complete),
        ];
        assert_eq!(flatten((Schedule::Complex, COLLECTION.clone())), expected);
    }

    #[test]
    fn nested_complex_phases_run_depth_first() {
        let inner = Phase::Complex(
            vec![
                (Schedule::Collector, Phase::StackRoots),
                (Schedule::Collector, Phase::Roots),
            ],
            0,
        );
        let outer = Phase::Complex(
            vec![
                (Schedule::Global, Phase::Prepare),
                (Schedule::Complex, inner),
                (Schedule::Global, Phase::Release),
            ],
            0,
        );
        assert_eq!(
            flatten((Schedule::Complex, outer)),
            vec![
                (Schedule::Global, Phase::Prepare),
                (Schedule::Collector, Phase::StackRoots),
                (Schedule::Collector, Phase::Roots),
                (Schedule::Global, Phase::Release),
            ]
        );
    }
}
