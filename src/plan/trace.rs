use crate::util::queue::SharedQueue;
use crate::util::{Address, ObjectReference};

/// The global half of one transitive closure: a pool of grey objects and
/// a pool of undigested root locations, shared by every collector's
/// trace-local.
pub struct Trace {
    pub values: SharedQueue<ObjectReference>,
    pub root_locations: SharedQueue<Address>,
}

impl Trace {
    pub fn new() -> Self {
        Trace {
            values: SharedQueue::new(),
            root_locations: SharedQueue::new(),
        }
    }

    /// Discard anything left from the previous collection, including the
    /// consumer bookkeeping. Must not be called while a trace is running.
    pub fn prepare(&self) {
        self.values.reset();
        self.root_locations.reset();
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}
