use std::fmt::Debug;

use super::{SharedQueue, BUFFER_SIZE};

/// A consumer-private buffer in front of a `SharedQueue`. Enqueues go to
/// the local buffer and spill to the shared pool a full buffer at a time;
/// dequeues drain the local buffer before falling back to the pool.
pub struct LocalQueue<'a, T: Debug> {
    queue: &'a SharedQueue<T>,
    buffer: Vec<T>,
    id: usize,
}

impl<'a, T: Debug> LocalQueue<'a, T> {
    pub fn new(id: usize, queue: &'a SharedQueue<T>) -> Self {
        LocalQueue {
            queue,
            buffer: Vec::with_capacity(BUFFER_SIZE),
            id,
        }
    }

    pub fn enqueue(&mut self, v: T) {
        if self.buffer.len() >= BUFFER_SIZE {
            self.flush();
        }
        self.buffer.push(v);
    }

    /// Pop locally if possible, otherwise wait on the shared pool. `None`
    /// means every consumer of the pool has run dry.
    pub fn dequeue(&mut self) -> Option<T> {
        match self.buffer.pop() {
            Some(v) => Some(v),
            None => match self.queue.spin(self.id) {
                Some(block) => {
                    self.buffer = block;
                    self.buffer.pop()
                }
                None => None,
            },
        }
    }

    /// Hand the current buffer to the shared pool even if it is not full.
    pub fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let buffer = std::mem::replace(&mut self.buffer, Vec::with_capacity(BUFFER_SIZE));
            self.queue.push(buffer);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_values_come_back_in_reverse() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut local = queue.spawn_local();
        local.enqueue(1);
        local.enqueue(2);
        local.enqueue(3);
        assert_eq!(local.dequeue(), Some(3));
        assert_eq!(local.dequeue(), Some(2));
        assert_eq!(local.dequeue(), Some(1));
        assert_eq!(local.dequeue(), None);
    }

    #[test]
    fn full_buffers_spill_to_the_shared_pool() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut local = queue.spawn_local();
        for v in 0..=BUFFER_SIZE {
            local.enqueue(v);
        }
        assert!(!queue.is_empty());
        assert_eq!(local.buffer.len(), 1);
    }

    #[test]
    fn flush_hands_over_a_partial_buffer() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut local = queue.spawn_local();
        local.enqueue(42);
        local.flush();
        assert!(local.is_empty());
        assert_eq!(queue.pop(), Some(vec![42]));
    }

    #[test]
    fn dequeue_refills_from_the_shared_pool() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut producer = queue.spawn_local();
        producer.enqueue(10);
        producer.enqueue(11);
        producer.flush();

        let mut consumer = queue.spawn_local();
        assert_eq!(consumer.dequeue(), Some(11));
        assert_eq!(consumer.dequeue(), Some(10));
        assert!(queue.is_empty());
    }

    #[test]
    fn reset_clears_only_the_local_buffer() {
        let queue: SharedQueue<usize> = SharedQueue::new();
        let mut local = queue.spawn_local();
        for v in 0..=BUFFER_SIZE {
            local.enqueue(v);
        }
        local.reset();
        assert!(local.is_empty());
        assert!(!queue.is_empty());
    }
}
