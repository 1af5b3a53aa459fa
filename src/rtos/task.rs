//! Periodic task descriptors and the fixed-capacity task table

use heapless::Vec;
use ufmt::derive::uDebug;

use super::Error;

/// A unit of work the scheduler can run.
///
/// Bodies run to completion in the drain loop, one at a time, and must not
/// block. Long peripheral operations are split into a start task and a
/// later collect task.
pub trait Task: Sync {
    fn run(&self);
}

impl<F> Task for F
where
    F: Fn() + Sync,
{
    #[inline]
    fn run(&self) {
        self()
    }
}

/// Reference to a task body, as stored in the table and the ready queue.
pub type TaskRef<'a> = &'a dyn Task;

/// Stable handle returned at registration; it is the table index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub struct TaskHandle(u8);

impl TaskHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Timing state of one registered task.
pub struct TaskDescriptor<'a> {
    task: TaskRef<'a>,
    period_ms: i32,
    countdown_ms: i32,
    active: bool,
}

impl<'a> TaskDescriptor<'a> {
    pub fn new(task: TaskRef<'a>, period_ms: i32, countdown_ms: i32, active: bool) -> Self {
        Self {
            task,
            period_ms,
            countdown_ms,
            active,
        }
    }

    #[inline]
    pub fn task(&self) -> TaskRef<'a> {
        self.task
    }

    #[inline]
    pub fn period_ms(&self) -> i32 {
        self.period_ms
    }

    #[inline]
    pub fn countdown_ms(&self) -> i32 {
        self.countdown_ms
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The in-flight countdown is left alone; the new period applies from
    /// the next reset.
    pub(crate) fn set_period(&mut self, period_ms: i32) {
        self.period_ms = period_ms;
    }

    /// Reloads the countdown from the current period.
    pub(crate) fn restart(&mut self) {
        self.countdown_ms = self.period_ms;
    }

    /// Advances the countdown by one tick. Returns true when the task is due,
    /// in which case the countdown has already been reset to the period.
    pub(crate) fn advance(&mut self, elapsed_ms: i32) -> bool {
        if !self.active {
            return false;
        }

        self.countdown_ms = self.countdown_ms.saturating_sub(elapsed_ms);
        if self.countdown_ms <= 0 {
            self.countdown_ms = self.period_ms;
            true
        } else {
            false
        }
    }
}

/// Append-only table of periodic tasks. Removal only shrinks from the tail,
/// so handles stay valid for as long as their entry exists.
pub struct TaskTable<'a, const N: usize> {
    tasks: Vec<TaskDescriptor<'a>, N>,
}

impl<'a, const N: usize> TaskTable<'a, N> {
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn push(&mut self, descriptor: TaskDescriptor<'a>) -> Result<TaskHandle, Error> {
        let index = self.tasks.len();
        if index > u8::MAX as usize {
            return Err(Error::CapacityExhausted);
        }
        self.tasks
            .push(descriptor)
            .map_err(|_| Error::CapacityExhausted)?;
        Ok(TaskHandle(index as u8))
    }

    pub fn pop(&mut self) -> Option<TaskHandle> {
        self.tasks.pop()?;
        Some(TaskHandle(self.tasks.len() as u8))
    }

    pub fn get(&self, handle: TaskHandle) -> Result<&TaskDescriptor<'a>, Error> {
        self.tasks.get(handle.index()).ok_or(Error::InvalidHandle)
    }

    pub fn get_mut(&mut self, handle: TaskHandle) -> Result<&mut TaskDescriptor<'a>, Error> {
        self.tasks.get_mut(handle.index()).ok_or(Error::InvalidHandle)
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, TaskDescriptor<'a>> {
        self.tasks.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<'a, const N: usize> Default for TaskTable<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}
