//! Ready queue: circular buffer of due task bodies
//!
//! Written from the tick interrupt, drained from the main loop. One slot is
//! always left free so that equal cursors mean empty, which keeps the full
//! and empty conditions distinguishable without a separate counter.

use super::task::TaskRef;
use super::Error;

pub struct ReadyQueue<'a, const SLOTS: usize> {
    slots: [Option<TaskRef<'a>>; SLOTS],
    write_idx: usize,
    read_idx: usize,
}

impl<'a, const SLOTS: usize> ReadyQueue<'a, SLOTS> {
    const MIN_SLOTS: () = assert!(SLOTS >= 2, "ready queue needs at least two slots");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::MIN_SLOTS;
        Self {
            slots: [None; SLOTS],
            write_idx: 0,
            read_idx: 0,
        }
    }

    /// Appends a task body. On a full queue nothing changes and the caller
    /// gets `Error::QueueFull` back.
    pub fn enqueue(&mut self, task: TaskRef<'a>) -> Result<(), Error> {
        let next_write = (self.write_idx + 1) % SLOTS;
        if next_write == self.read_idx {
            return Err(Error::QueueFull);
        }
        self.slots[self.write_idx] = Some(task);
        self.write_idx = next_write;
        Ok(())
    }

    /// Removes the oldest entry, or returns `None` when empty.
    pub fn dequeue(&mut self) -> Option<TaskRef<'a>> {
        if self.read_idx == self.write_idx {
            return None;
        }
        let task = self.slots[self.read_idx].take();
        self.read_idx = (self.read_idx + 1) % SLOTS;
        task
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_idx == self.write_idx
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        (self.write_idx + 1) % SLOTS == self.read_idx
    }

    pub fn len(&self) -> usize {
        (self.write_idx + SLOTS - self.read_idx) % SLOTS
    }

    /// Usable capacity: one less than the number of physical slots.
    #[inline]
    pub const fn capacity(&self) -> usize {
        SLOTS - 1
    }
}

impl<'a, const SLOTS: usize> Default for ReadyQueue<'a, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::vec::Vec;

    #[test]
    fn dequeue_on_empty_returns_none() {
        let mut queue: ReadyQueue<'_, 4> = ReadyQueue::new();
        assert!(queue.is_empty());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn usable_capacity_is_one_less_than_slots() {
        let a = || {};
        let mut queue: ReadyQueue<'_, 4> = ReadyQueue::new();

        assert_eq!(queue.capacity(), 3);
        for _ in 0..3 {
            assert_eq!(queue.enqueue(&a), Ok(()));
        }
        assert!(queue.is_full());
        assert_eq!(queue.enqueue(&a), Err(Error::QueueFull));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn full_queue_rejects_and_keeps_fifo_order() {
        let ran = Mutex::new(Vec::new());
        let a = || ran.lock().unwrap().push('a');
        let b = || ran.lock().unwrap().push('b');
        let c = || ran.lock().unwrap().push('c');
        let mut queue: ReadyQueue<'_, 3> = ReadyQueue::new();

        queue.enqueue(&a).unwrap();
        queue.enqueue(&b).unwrap();
        assert_eq!(queue.enqueue(&c), Err(Error::QueueFull));

        while let Some(task) = queue.dequeue() {
            task.run();
        }
        assert_eq!(*ran.lock().unwrap(), ['a', 'b']);
    }

    #[test]
    fn cursors_wrap_around() {
        let ran = Mutex::new(Vec::new());
        let a = || ran.lock().unwrap().push(1u8);
        let b = || ran.lock().unwrap().push(2u8);
        let mut queue: ReadyQueue<'_, 3> = ReadyQueue::new();

        for _ in 0..10 {
            queue.enqueue(&a).unwrap();
            queue.enqueue(&b).unwrap();
            assert_eq!(queue.len(), 2);
            queue.dequeue().unwrap().run();
            queue.dequeue().unwrap().run();
            assert!(queue.is_empty());
        }
        assert_eq!(ran.lock().unwrap().len(), 20);
        assert!(ran.lock().unwrap().chunks(2).all(|pair| pair == [1, 2]));
    }
}
