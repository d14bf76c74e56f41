use crate::util::{Address, ObjectReference};

/// The sink side of a heap traversal. `process_edge` receives a slot
/// holding a reference; `process_node` receives an object whose fields
/// still need scanning.
pub trait TransitiveClosure {
    fn process_edge(&mut self, slot: Address);
    fn process_node(&mut self, object: ObjectReference);
}
