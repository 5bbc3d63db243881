//! Work Queue - Ring Buffer Worklist for Tracing
//!
//! FIFO worklist shared by the reachability tracer and both edge-graph
//! builders. Storage is a ring buffer that doubles when the tail catches
//! up with the head.
//!
//! Growth:
//! ```text
//! before (full, tail == head == 2):
//!   [ c d | a b ]          head -> a
//!         ^tail/head
//! after (len 4 -> 8, head moves up by the old length):
//!   [ c d _ _ _ _ a b ]    head = 6, tail = 2
//! ```
//! The segment `[head..len)` moves to `[head + len..2 * len)` and `[0..tail)`
//! stays put, so wraparound order is preserved without a full rotate.

use crate::error::{Result, XgcError};

/// Default initial capacity (16K entries)
pub const QUEUE_SIZE: usize = 1024 * 16;

/// WorkQueue - growable FIFO ring buffer
#[derive(Debug, Clone)]
pub struct WorkQueue<T> {
    values: Vec<T>,
    head: usize,
    tail: usize,

    /// Counters for statistics
    enqueued_count: usize,
    processed_count: usize,
}

impl<T: Copy + Default> WorkQueue<T> {
    /// Create queue with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_SIZE)
    }

    /// Create queue with the given initial capacity (at least 2)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: vec![T::default(); capacity.max(2)],
            head: 0,
            tail: 0,
            enqueued_count: 0,
            processed_count: 0,
        }
    }

    /// Push item at the tail
    ///
    /// Fails only when doubling the buffer cannot allocate; the queue is
    /// unchanged in that case apart from the slot just written, which is
    /// rolled back.
    pub fn enqueue(&mut self, item: T) -> Result<()> {
        let len = self.values.len();
        let t = self.tail;
        self.values[t] = item;
        self.tail = (t + 1) % len;
        if self.tail == self.head {
            if let Err(err) = self.grow() {
                self.tail = t;
                return Err(err);
            }
        }
        self.enqueued_count += 1;
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        let old_len = self.values.len();
        let new_len = old_len
            .checked_mul(2)
            .ok_or_else(|| XgcError::exhausted("work queue length overflow"))?;

        let mut values: Vec<T> = Vec::new();
        values
            .try_reserve_exact(new_len)
            .map_err(|_| XgcError::exhausted(format!("work queue of {} entries", new_len)))?;
        values.resize(new_len, T::default());

        let new_head = self.head + old_len;
        values[new_head..].copy_from_slice(&self.values[self.head..]);
        values[..self.tail].copy_from_slice(&self.values[..self.tail]);

        log::trace!("work queue grew from {} to {} entries", old_len, new_len);
        self.head = new_head;
        self.values = values;
        Ok(())
    }

    /// Pop item from the head
    ///
    /// Returns None if the queue is empty.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        let h = self.head;
        self.head = (h + 1) % self.values.len();
        self.processed_count += 1;
        Some(self.values[h])
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn len(&self) -> usize {
        if self.tail >= self.head {
            self.tail - self.head
        } else {
            self.values.len() - self.head + self.tail
        }
    }

    /// Current buffer length
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    /// Get (enqueued, processed) counts
    pub fn stats(&self) -> (usize, usize) {
        (self.enqueued_count, self.processed_count)
    }
}

impl<T: Copy + Default> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
