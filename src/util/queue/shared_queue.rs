use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::LocalQueue;

type Block<T> = Vec<T>;

/// A pool of work buffers shared by every consumer of a trace. Producers
/// flush whole buffers in, consumers pop whole buffers out, and the
/// done-bitmap lets the consumers agree on global emptiness.
pub struct SharedQueue<T: Debug> {
    blocks: Mutex<Vec<Block<T>>>,
    count: AtomicUsize,
    bitmap: Mutex<HashMap<usize, bool>>,
}

impl<T: Debug> SharedQueue<T> {
    pub fn new() -> Self {
        SharedQueue {
            blocks: Mutex::new(vec![]),
            count: AtomicUsize::new(0),
            bitmap: Mutex::new(HashMap::new()),
        }
    }

    pub fn spawn_local(&self) -> LocalQueue<'_, T> {
        let mut bitmap = self.bitmap.lock().unwrap();
        let id = self.count.fetch_add(1, Ordering::Relaxed);
        bitmap.insert(id, false);
        LocalQueue::new(id, self)
    }

    pub fn push(&self, b: Block<T>) {
        debug_assert!(!b.is_empty());
        let mut blocks = self.blocks.lock().unwrap();
        blocks.push(b);
    }

    pub fn pop(&self) -> Option<Block<T>> {
        let mut blocks = self.blocks.lock().unwrap();
        blocks.pop()
    }

    /// Wait for a buffer to show up, or for every consumer to agree that
    /// the trace is exhausted. Returns `None` only once all consumers are
    /// parked here with nothing left in the pool.
    ///
    /// The consumer's done flag is cleared while the block lock is still
    /// held, so no peer can observe an empty pool and a stale done flag
    /// for a consumer that is off working on a buffer.
    pub fn spin(&self, id: usize) -> Option<Block<T>> {
        self.set_done(id, true);
        loop {
            let mut blocks = self.blocks.lock().unwrap();
            if let Some(block) = blocks.pop() {
                self.set_done(id, false);
                return Some(block);
            }
            let bitmap = self.bitmap.lock().unwrap();
            if bitmap.values().all(|&done| done) {
                return None;
            }
            drop(bitmap);
            drop(blocks);
            std::hint::spin_loop();
        }
    }

    pub fn is_empty(&self) -> bool {
        let blocks = self.blocks.lock().unwrap();
        blocks.is_empty()
    }

    /// Drop any leftover buffers and mark every consumer as busy again.
    /// Called between traces, when no consumer is inside `spin`.
    pub fn reset(&self) {
        let mut blocks = self.blocks.lock().unwrap();
        let mut bitmap = self.bitmap.lock().unwrap();
        blocks.clear();
        for done in bitmap.values_mut() {
            *done = false;
        }
    }

    fn set_done(&self, id: usize, value: bool) {
        let mut bitmap = self.bitmap.lock().unwrap();
        bitmap.insert(id, value);
    }
}

impl<T: Debug> Default for SharedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::queue::BUFFER_SIZE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn push_and_pop_blocks() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        queue.push(vec![1, 2, 3]);
        queue.push(vec![4]);
        assert!(!queue.is_empty());
        assert_eq!(queue.pop(), Some(vec![4]));
        assert_eq!(queue.pop(), Some(vec![1, 2, 3]));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn lone_consumer_terminates() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut local = queue.spawn_local();
        assert_eq!(local.dequeue(), None);
    }

    #[test]
    fn reset_discards_leftovers() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        queue.push(vec![7]);
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn consumers_drain_every_flushed_buffer() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut producer = queue.spawn_local();
        // Three full buffers land in the pool, one partial stays local.
        for v in 0..(BUFFER_SIZE * 3 + BUFFER_SIZE / 2 + 1) {
            producer.enqueue(v);
        }

        let drained = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..2 {
                let queue = &queue;
                let drained = &drained;
                scope.spawn(move || {
                    let mut local = queue.spawn_local();
                    while local.dequeue().is_some() {
                        drained.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
            // The producer drains its own remainder plus whatever the
            // workers leave behind.
            while producer.dequeue().is_some() {
                drained.fetch_add(1, Ordering::Relaxed);
            }
        });

        assert_eq!(drained.load(Ordering::Relaxed), BUFFER_SIZE * 3 + BUFFER_SIZE / 2 + 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn random_interleaving_conserves_every_value() {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut local = queue.spawn_local();
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);

        let mut next = 0usize;
        let mut enqueued_sum = 0usize;
        let mut dequeued_sum = 0usize;
        let mut outstanding = 0usize;
        for _ in 0..10_000 {
            // Bias toward enqueues so buffers regularly spill over.
            if rng.random_ratio(3, 5) {
                local.enqueue(next);
                enqueued_sum += next;
                next += 1;
                outstanding += 1;
            } else if let Some(v) = local.dequeue() {
                dequeued_sum += v;
                outstanding -= 1;
            }
        }
        while let Some(v) = local.dequeue() {
            dequeued_sum += v;
            outstanding -= 1;
        }

        assert_eq!(outstanding, 0);
        assert_eq!(dequeued_sum, enqueued_sum);
        assert!(queue.is_empty());
        assert!(local.is_empty());
    }
}
